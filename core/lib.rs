/*!
This crate ties the other tally crates together into one batch analysis. It loads a csv of monthly sales, splits the rows into train and test partitions, computes stats, scales the features, trains a linear baseline and a random forest, tunes the forest with a cross validated grid search, and evaluates every model on the held out rows. The entrypoint is [`train`](train/fn.train.html).
*/

pub mod config;
pub mod grid;
pub mod model;
pub mod progress;
pub mod report;
pub mod search;
pub mod split;
pub mod stats;
pub mod test;
pub mod train;

pub use self::train::train;
