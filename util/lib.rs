/*!
This crate holds small utilities shared by the other tally crates.
*/

pub mod finite;
pub mod progress_counter;
pub mod table;
