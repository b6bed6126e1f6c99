use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use thiserror::Error;

/// The row indexes assigned to each partition.
#[derive(Debug)]
pub struct Split {
	pub train_indices: Vec<usize>,
	pub test_indices: Vec<usize>,
}

#[derive(Debug, Error)]
#[error("cannot split {n_rows} rows with test fraction {test_fraction}: the test fraction must be strictly between 0 and 1 and both partitions must receive at least one row")]
pub struct InvalidSplitError {
	pub n_rows: usize,
	pub test_fraction: f32,
}

/// Shuffle the row indexes with a generator seeded by `seed`, then assign the first `(1 - test_fraction) * n_rows` of them to the train partition and the rest to the test partition.
pub fn train_test_split(
	n_rows: usize,
	test_fraction: f32,
	seed: u64,
) -> Result<Split, InvalidSplitError> {
	if !(test_fraction > 0.0 && test_fraction < 1.0) || n_rows < 2 {
		return Err(InvalidSplitError {
			n_rows,
			test_fraction,
		});
	}
	let n_rows_train = ((1.0 - test_fraction) * n_rows.to_f32().unwrap())
		.to_usize()
		.unwrap();
	if n_rows_train == 0 || n_rows_train == n_rows {
		return Err(InvalidSplitError {
			n_rows,
			test_fraction,
		});
	}
	let mut train_indices: Vec<usize> = (0..n_rows).collect();
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	train_indices.shuffle(&mut rng);
	let test_indices = train_indices.split_off(n_rows_train);
	Ok(Split {
		train_indices,
		test_indices,
	})
}

#[test]
fn test_train_test_split() {
	let split = train_test_split(100, 0.2, 42).unwrap();
	assert_eq!(split.train_indices.len(), 80);
	assert_eq!(split.test_indices.len(), 20);
	let mut all: Vec<usize> = split
		.train_indices
		.iter()
		.chain(split.test_indices.iter())
		.cloned()
		.collect();
	all.sort_unstable();
	let expected: Vec<usize> = (0..100).collect();
	assert_eq!(all, expected);
}

#[test]
fn test_train_test_split_is_deterministic() {
	let a = train_test_split(50, 0.3, 42).unwrap();
	let b = train_test_split(50, 0.3, 42).unwrap();
	assert_eq!(a.train_indices, b.train_indices);
	assert_eq!(a.test_indices, b.test_indices);
	let c = train_test_split(50, 0.3, 43).unwrap();
	assert_ne!(a.train_indices, c.train_indices);
}

#[test]
fn test_train_test_split_rejects_bad_fractions() {
	assert!(train_test_split(100, 0.0, 42).is_err());
	assert!(train_test_split(100, 1.0, 42).is_err());
	assert!(train_test_split(100, -0.5, 42).is_err());
	assert!(train_test_split(100, std::f32::NAN, 42).is_err());
	assert!(train_test_split(1, 0.5, 42).is_err());
	// 2 rows with a tiny test fraction would leave the test partition empty
	assert!(train_test_split(2, 0.99, 42).is_err());
	assert!(train_test_split(2, 0.5, 42).is_ok());
}
