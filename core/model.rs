use ndarray::prelude::*;
use thiserror::Error;

/// A trained model of either family. Prediction goes through this one seam so the evaluation code does not care which family it is looking at.
#[derive(Debug)]
pub enum Model {
	Linear(tally_linear::Regressor),
	Forest(tally_tree::Regressor),
}

#[derive(Debug, Error)]
#[error("the model was trained on {expected} features but was asked to predict on {found}")]
pub struct DimensionMismatchError {
	pub expected: usize,
	pub found: usize,
}

impl Model {
	pub fn n_features(&self) -> usize {
		match self {
			Model::Linear(model) => model.weights.len(),
			Model::Forest(model) => model.n_features,
		}
	}

	/// Predict every row of `features`. The feature count must match the count the model was trained with.
	pub fn predict(&self, features: ArrayView2<f32>) -> Result<Array1<f32>, DimensionMismatchError> {
		if features.ncols() != self.n_features() {
			return Err(DimensionMismatchError {
				expected: self.n_features(),
				found: features.ncols(),
			});
		}
		let mut predictions = Array::zeros(features.nrows());
		match self {
			Model::Linear(model) => model.predict(features, predictions.view_mut()),
			Model::Forest(model) => model.predict(features, predictions.view_mut()),
		}
		Ok(predictions)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn linear_model() -> Model {
		Model::Linear(tally_linear::Regressor {
			bias: 1.0,
			weights: arr1(&[2.0, -1.0]),
			losses: vec![],
		})
	}

	#[test]
	fn test_predict_through_the_model_seam() {
		let model = linear_model();
		let features = arr2(&[[1.0, 0.0], [0.0, 1.0], [2.0, 2.0]]);
		let predictions = model.predict(features.view()).unwrap();
		assert_eq!(predictions, arr1(&[3.0, 0.0, 3.0]));
	}

	#[test]
	fn test_predict_rejects_mismatched_features() {
		let model = linear_model();
		let features = arr2(&[[1.0, 2.0, 3.0]]);
		let error = model.predict(features.view()).unwrap_err();
		assert_eq!(error.expected, 2);
		assert_eq!(error.found, 3);
	}
}
