/*!
This crate implements the feature scaling Tally applies before training. Scaling parameters are always learned from the training rows alone and then reused verbatim for every other partition, so the test rows never influence them.
*/

#![allow(clippy::tabs_in_doc_comments)]

use itertools::izip;
use ndarray::prelude::*;
use tally_metrics::{MeanVariance, StreamingMetric};
use thiserror::Error;

/**
A `Standardizer` transforms each feature column to zero mean and unit variance. [Learn more](https://en.wikipedia.org/wiki/Feature_scaling#Standardization_(Z-score_Normalization).

A standardizer starts out unfitted. Calling `fit` with the training features computes the per-column scaling parameters, after which `transform` maps features into scaled space and `inverse` maps them back out of it.

# Example

Fitting on the column `[0.0, 5.2, 1.3, 10.0]` gives:

Mean: 4.125

Standard Deviation: 3.90224

`feature_value = (value - mean) / std`

| column value | feature value                        |
|--------------|--------------------------------------|
| 0.0          | (0.0 - 4.125) / 3.90224  = -1.05708  |
| 5.2          | (5.2 - 4.125) / 3.90224  = 0.27548   |
| 1.3          | (1.3 - 4.125) / 3.90224  = -0.72394  |
| 10.0         | (10.0 - 4.125) / 3.90224 = 1.50554   |
*/
#[derive(Debug, Default)]
pub struct Standardizer {
	pub columns: Option<Vec<NormalizedFeatureGroup>>,
}

/// The scaling parameters learned for a single feature column.
#[derive(Debug, Clone)]
pub struct NormalizedFeatureGroup {
	pub source_column_name: String,
	pub mean: f32,
	pub variance: f32,
}

/// A column whose training values are all identical carries no signal and cannot be scaled to unit variance.
#[derive(Debug, Error)]
#[error("column \"{column_name}\" has zero variance in the training rows")]
pub struct DegenerateFeatureError {
	pub column_name: String,
}

/// `transform` and `inverse` require `fit` to have succeeded first.
#[derive(Debug, Error)]
#[error("the standardizer has not been fit")]
pub struct NotFittedError;

impl Standardizer {
	pub fn new() -> Self {
		Self { columns: None }
	}

	/// Learn the scaling parameters from the training features. A column with zero variance fails the fit and leaves the standardizer unfitted.
	pub fn fit(
		&mut self,
		features: ArrayView2<f32>,
		column_names: &[String],
	) -> Result<(), DegenerateFeatureError> {
		let mut columns = Vec::with_capacity(column_names.len());
		for (column, column_name) in izip!(features.gencolumns(), column_names.iter()) {
			let mut mean_variance = MeanVariance::default();
			for value in column.iter() {
				mean_variance.update(*value);
			}
			let (mean, variance) = match mean_variance.finalize() {
				Some(output) if output.variance > 0.0 => (output.mean, output.variance),
				_ => {
					return Err(DegenerateFeatureError {
						column_name: column_name.clone(),
					})
				}
			};
			columns.push(NormalizedFeatureGroup {
				source_column_name: column_name.clone(),
				mean,
				variance,
			});
		}
		self.columns = Some(columns);
		Ok(())
	}

	/// Map features into scaled space using the parameters learned by `fit`.
	pub fn transform(&self, features: ArrayView2<f32>) -> Result<Array2<f32>, NotFittedError> {
		let columns = self.columns.as_ref().ok_or(NotFittedError)?;
		let mut transformed = unsafe { Array::uninitialized(features.raw_dim()) };
		for (values, features, group) in izip!(
			features.gencolumns(),
			transformed.gencolumns_mut(),
			columns.iter()
		) {
			group.compute_array_f32(values, features);
		}
		Ok(transformed)
	}

	/// Map scaled features back to the original units.
	pub fn inverse(&self, features: ArrayView2<f32>) -> Result<Array2<f32>, NotFittedError> {
		let columns = self.columns.as_ref().ok_or(NotFittedError)?;
		let mut inverted = unsafe { Array::uninitialized(features.raw_dim()) };
		for (values, features, group) in izip!(
			features.gencolumns(),
			inverted.gencolumns_mut(),
			columns.iter()
		) {
			group.invert_array_f32(values, features);
		}
		Ok(inverted)
	}
}

impl NormalizedFeatureGroup {
	pub fn compute_array_f32(&self, values: ArrayView1<f32>, mut features: ArrayViewMut1<f32>) {
		// Set the feature values to the normalized source column values.
		for (feature, value) in izip!(features.iter_mut(), values.iter()) {
			*feature = (*value - self.mean) / f32::sqrt(self.variance);
		}
	}

	pub fn invert_array_f32(&self, values: ArrayView1<f32>, mut features: ArrayViewMut1<f32>) {
		for (feature, value) in izip!(features.iter_mut(), values.iter()) {
			*feature = *value * f32::sqrt(self.variance) + self.mean;
		}
	}
}

#[cfg(test)]
fn test_column_names(names: &[&str]) -> Vec<String> {
	names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_fit_transform() {
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let mut standardizer = Standardizer::new();
	standardizer
		.fit(features.view(), &test_column_names(&["units"]))
		.unwrap();
	let transformed = standardizer.transform(features.view()).unwrap();
	let expected = [-1.3416408, -0.4472136, 0.4472136, 1.3416408];
	for (value, expected) in izip!(transformed.column(0).iter(), expected.iter()) {
		assert!((value - expected).abs() < 1e-5);
	}
}

#[test]
fn test_transform_does_not_refit() {
	let train = arr2(&[[0.0], [2.0]]);
	let test = arr2(&[[4.0]]);
	let mut standardizer = Standardizer::new();
	standardizer
		.fit(train.view(), &test_column_names(&["units"]))
		.unwrap();
	// train has mean 1 and std 1, so 4.0 maps to 3.0 rather than being rescaled.
	let transformed = standardizer.transform(test.view()).unwrap();
	assert!((transformed[[0, 0]] - 3.0).abs() < 1e-6);
}

#[test]
fn test_round_trip() {
	let train = arr2(&[[1.0, 100.0], [2.0, 250.0], [3.0, 475.0]]);
	let mut standardizer = Standardizer::new();
	standardizer
		.fit(train.view(), &test_column_names(&["units", "revenue"]))
		.unwrap();
	let transformed = standardizer.transform(train.view()).unwrap();
	let round_tripped = standardizer.inverse(transformed.view()).unwrap();
	for (value, original) in izip!(round_tripped.iter(), train.iter()) {
		assert!((value - original).abs() < 1e-3);
	}
}

#[test]
fn test_transform_before_fit() {
	let features = arr2(&[[1.0], [2.0]]);
	let standardizer = Standardizer::new();
	assert!(standardizer.transform(features.view()).is_err());
}

#[test]
fn test_constant_column() {
	let features = arr2(&[[7.0, 1.0], [7.0, 2.0], [7.0, 3.0]]);
	let mut standardizer = Standardizer::new();
	let error = standardizer
		.fit(features.view(), &test_column_names(&["discount", "units"]))
		.unwrap_err();
	assert_eq!(error.column_name, "discount");
	// a failed fit leaves the standardizer unfitted
	assert!(standardizer.columns.is_none());
}
