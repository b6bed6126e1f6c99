//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use super::StreamingMetric;
use num_traits::ToPrimitive;

/// The mean and variance of a sequence of `f32`s, computed in a streaming fashion.
#[derive(Clone, Debug)]
pub struct MeanVariance {
	pub n: u64,
	pub mean: f64,
	pub m2: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeanVarianceOutput {
	pub n: u64,
	pub mean: f32,
	pub variance: f32,
}

impl Default for MeanVariance {
	fn default() -> Self {
		Self {
			n: 0,
			mean: 0.0,
			m2: 0.0,
		}
	}
}

impl StreamingMetric<'_> for MeanVariance {
	type Input = f32;
	type Output = Option<MeanVarianceOutput>;

	fn update(&mut self, input: Self::Input) {
		let (mean, m2) = merge_mean_m2(
			self.n,
			self.mean,
			self.m2,
			1,
			input.to_f64().unwrap(),
			0.0,
		);
		self.n += 1;
		self.mean = mean;
		self.m2 = m2;
	}

	fn merge(&mut self, other: Self) {
		if other.n == 0 {
			return;
		}
		if self.n == 0 {
			*self = other;
			return;
		}
		let (mean, m2) = merge_mean_m2(self.n, self.mean, self.m2, other.n, other.mean, other.m2);
		self.mean = mean;
		self.m2 = m2;
		self.n += other.n;
	}

	fn finalize(self) -> Self::Output {
		if self.n == 0 {
			None
		} else {
			Some(MeanVarianceOutput {
				n: self.n,
				mean: self.mean as f32,
				variance: m2_to_variance(self.m2, self.n),
			})
		}
	}
}

/// combine two separate means and variances into a single mean and variance
/// useful in parallel algorithms
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a.to_f64().unwrap();
	let n_b = n_b.to_f64().unwrap();
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

pub fn m2_to_variance(m2: f64, n: u64) -> f32 {
	(m2 / n.to_f64().unwrap()) as f32
}

#[test]
fn test_mean_variance() {
	let mut mean_variance = MeanVariance::default();
	for value in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
		mean_variance.update(*value);
	}
	let output = mean_variance.finalize().unwrap();
	assert_eq!(output.n, 8);
	assert!((output.mean - 5.0).abs() < 1e-6);
	assert!((output.variance - 4.0).abs() < 1e-6);
}

#[test]
fn test_mean_variance_merge() {
	let values = [1.5, 2.5, 3.5, 10.0, 20.0, 30.0];
	let mut whole = MeanVariance::default();
	for value in values.iter() {
		whole.update(*value);
	}
	let mut left = MeanVariance::default();
	let mut right = MeanVariance::default();
	for value in values[0..3].iter() {
		left.update(*value);
	}
	for value in values[3..].iter() {
		right.update(*value);
	}
	left.merge(right);
	let whole = whole.finalize().unwrap();
	let merged = left.finalize().unwrap();
	assert_eq!(whole.n, merged.n);
	assert!((whole.mean - merged.mean).abs() < 1e-6);
	assert!((whole.variance - merged.variance).abs() < 1e-4);
}
