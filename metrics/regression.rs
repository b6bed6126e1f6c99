use super::{MeanVariance, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use thiserror::Error;

pub struct RegressionMetrics {
	mean_variance: MeanVariance,
	absolute_error: f64,
	squared_error: f64,
}

pub struct RegressionMetricsInput<'a> {
	pub predictions: ArrayView1<'a, f32>,
	pub labels: ArrayView1<'a, f32>,
}

#[derive(Clone, Debug)]
pub struct RegressionMetricsOutput {
	pub mse: f32,
	pub rmse: f32,
	pub mae: f32,
	pub r2: f32,
	pub baseline_mse: f32,
	pub baseline_rmse: f32,
}

/// The predictions and the labels must have the same length.
#[derive(Debug, Error)]
#[error("predictions have length {found} but labels have length {expected}")]
pub struct LengthMismatchError {
	pub expected: usize,
	pub found: usize,
}

/// r2 compares the squared error against the variance of the labels, so it is undefined when that variance is zero.
#[derive(Debug, Error)]
#[error("r2 is undefined when the labels are empty or have zero variance")]
pub struct UndefinedMetricError;

#[derive(Debug, Error)]
pub enum EvaluateError {
	#[error("{0}")]
	LengthMismatch(#[from] LengthMismatchError),
	#[error("{0}")]
	UndefinedMetric(#[from] UndefinedMetricError),
}

impl Default for RegressionMetrics {
	fn default() -> Self {
		Self {
			mean_variance: MeanVariance::default(),
			absolute_error: 0.0,
			squared_error: 0.0,
		}
	}
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = Result<RegressionMetricsOutput, UndefinedMetricError>;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			self.mean_variance.update(*label);
			let error = prediction - label;
			self.absolute_error += error.abs() as f64;
			self.squared_error += (error * error) as f64;
		}
	}

	fn merge(&mut self, other: Self) {
		self.mean_variance.merge(other.mean_variance);
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let mean_variance = match self.mean_variance.finalize() {
			Some(mean_variance) => mean_variance,
			None => return Err(UndefinedMetricError),
		};
		let variance = mean_variance.variance.to_f64().unwrap();
		if variance == 0.0 {
			return Err(UndefinedMetricError);
		}
		let n = mean_variance.n.to_f64().unwrap();
		let mae = self.absolute_error / n;
		let mse = self.squared_error / n;
		let rmse = mse.sqrt();
		let r2 = 1.0 - self.squared_error / (variance * n);
		let baseline_mse = variance;
		let baseline_rmse = baseline_mse.sqrt();
		Ok(RegressionMetricsOutput {
			mae: mae as f32,
			mse: mse as f32,
			r2: r2 as f32,
			rmse: rmse as f32,
			baseline_mse: baseline_mse as f32,
			baseline_rmse: baseline_rmse as f32,
		})
	}
}

/// Compute regression metrics for a complete set of predictions at once.
pub fn evaluate(
	predictions: ArrayView1<f32>,
	labels: ArrayView1<f32>,
) -> Result<RegressionMetricsOutput, EvaluateError> {
	if predictions.len() != labels.len() {
		return Err(LengthMismatchError {
			expected: labels.len(),
			found: predictions.len(),
		}
		.into());
	}
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let output = metrics.finalize()?;
	Ok(output)
}

#[test]
fn test_evaluate() {
	let predictions = arr1(&[3.0, -0.5, 2.0, 7.0]);
	let labels = arr1(&[2.5, 0.0, 2.0, 8.0]);
	let output = evaluate(predictions.view(), labels.view()).unwrap();
	assert_eq!(output.mse, 0.375);
	assert_eq!(output.mae, 0.5);
	assert!((output.rmse - 0.61237246).abs() < 1e-6);
	assert!((output.r2 - 0.9573712).abs() < 1e-6);
	assert!((output.baseline_mse - 8.796875).abs() < 1e-4);
}

#[test]
fn test_evaluate_length_mismatch() {
	let predictions = arr1(&[1.0, 2.0]);
	let labels = arr1(&[1.0, 2.0, 3.0]);
	let error = evaluate(predictions.view(), labels.view()).unwrap_err();
	assert!(matches!(error, EvaluateError::LengthMismatch(_)));
}

#[test]
fn test_evaluate_constant_labels() {
	let predictions = arr1(&[1.0, 2.0, 3.0]);
	let labels = arr1(&[5.0, 5.0, 5.0]);
	let error = evaluate(predictions.view(), labels.view()).unwrap_err();
	assert!(matches!(error, EvaluateError::UndefinedMetric(_)));
}

#[test]
fn test_merge() {
	let predictions = arr1(&[1.0, 4.0, 3.0, 8.0]);
	let labels = arr1(&[2.0, 3.0, 5.0, 7.0]);
	let mut whole = RegressionMetrics::default();
	whole.update(RegressionMetricsInput {
		predictions: predictions.view(),
		labels: labels.view(),
	});
	let mut left = RegressionMetrics::default();
	left.update(RegressionMetricsInput {
		predictions: predictions.slice(s![0..2]),
		labels: labels.slice(s![0..2]),
	});
	let mut right = RegressionMetrics::default();
	right.update(RegressionMetricsInput {
		predictions: predictions.slice(s![2..4]),
		labels: labels.slice(s![2..4]),
	});
	left.merge(right);
	let whole = whole.finalize().unwrap();
	let merged = left.finalize().unwrap();
	assert!((whole.mse - merged.mse).abs() < 1e-6);
	assert!((whole.r2 - merged.r2).abs() < 1e-6);
}
