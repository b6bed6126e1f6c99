use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// An `f32` that is known to be neither infinite nor NaN, so it can implement `Eq` and `Ord` and be used as a key in ordered collections.
#[derive(Clone, Copy, Debug)]
pub struct Finite(f32);

#[derive(Debug, Error)]
#[error("not finite")]
pub struct NotFiniteError;

impl Finite {
	pub fn new(value: f32) -> Result<Self, NotFiniteError> {
		if value.is_finite() {
			Ok(Self(value))
		} else {
			Err(NotFiniteError)
		}
	}

	pub fn get(self) -> f32 {
		self.0
	}
}

impl std::fmt::Display for Finite {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl PartialEq for Finite {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl Eq for Finite {}

impl PartialOrd for Finite {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		self.0.partial_cmp(&other.0)
	}
}

impl Ord for Finite {
	fn cmp(&self, other: &Self) -> Ordering {
		// a finite f32 always compares
		self.partial_cmp(other).unwrap()
	}
}

impl Hash for Finite {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.to_bits().hash(state)
	}
}

#[test]
fn test_finite() {
	assert_eq!(Finite::new(1.5).unwrap().get(), 1.5);
	assert!(Finite::new(std::f32::NAN).is_err());
	assert!(Finite::new(std::f32::INFINITY).is_err());
	assert!(Finite::new(1.0).unwrap() < Finite::new(2.0).unwrap());
}

#[test]
fn test_finite_as_map_key() {
	let mut histogram = std::collections::BTreeMap::new();
	for value in &[3.0f32, 1.0, 2.0, 1.0] {
		*histogram.entry(Finite::new(*value).unwrap()).or_insert(0usize) += 1;
	}
	let keys: Vec<f32> = histogram.keys().map(|key| key.get()).collect();
	assert_eq!(keys, vec![1.0, 2.0, 3.0]);
	assert_eq!(histogram[&Finite::new(1.0).unwrap()], 2);
}
