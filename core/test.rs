use crate::model::{DimensionMismatchError, Model};
use ndarray::prelude::*;
use thiserror::Error;

/// The evaluation of one model on both partitions.
#[derive(Debug)]
pub struct ModelEvaluation {
	pub model_name: String,
	pub train: tally_metrics::RegressionMetricsOutput,
	pub test: tally_metrics::RegressionMetricsOutput,
	/// One `(actual, predicted)` pair per test row.
	pub pairs: Vec<(f32, f32)>,
}

#[derive(Debug, Error)]
pub enum TestError {
	#[error("{0}")]
	DimensionMismatch(#[from] DimensionMismatchError),
	#[error("{0}")]
	Evaluate(#[from] tally_metrics::EvaluateError),
}

/// Evaluate `model` on the train partition and on the held out test partition.
pub fn test_model(
	model: &Model,
	model_name: &str,
	features_train: ArrayView2<f32>,
	labels_train: ArrayView1<f32>,
	features_test: ArrayView2<f32>,
	labels_test: ArrayView1<f32>,
) -> Result<ModelEvaluation, TestError> {
	let predictions_train = model.predict(features_train)?;
	let train = tally_metrics::evaluate(predictions_train.view(), labels_train)?;
	let predictions_test = model.predict(features_test)?;
	let test = tally_metrics::evaluate(predictions_test.view(), labels_test)?;
	let pairs = labels_test
		.iter()
		.zip(predictions_test.iter())
		.map(|(label, prediction)| (*label, *prediction))
		.collect();
	Ok(ModelEvaluation {
		model_name: model_name.to_owned(),
		train,
		test,
		pairs,
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_test_model() {
		let model = Model::Linear(tally_linear::Regressor {
			bias: 1.0,
			weights: arr1(&[2.0]),
			losses: vec![],
		});
		let features_train = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
		let labels_train = arr1(&[1.0, 3.0, 5.0, 7.0]);
		let features_test = arr2(&[[4.0], [5.0]]);
		let labels_test = arr1(&[9.0, 12.0]);
		let evaluation = test_model(
			&model,
			"baseline",
			features_train.view(),
			labels_train.view(),
			features_test.view(),
			labels_test.view(),
		)
		.unwrap();
		assert_eq!(evaluation.model_name, "baseline");
		// the model reproduces the train labels exactly
		assert_eq!(evaluation.train.mse, 0.0);
		assert!((evaluation.train.r2 - 1.0).abs() < 1e-6);
		// on the test rows it predicts 9 and 11
		assert_eq!(evaluation.pairs, vec![(9.0, 9.0), (12.0, 11.0)]);
		assert!((evaluation.test.mse - 0.5).abs() < 1e-6);
	}

	#[test]
	fn test_test_model_rejects_mismatched_features() {
		let model = Model::Linear(tally_linear::Regressor {
			bias: 0.0,
			weights: arr1(&[1.0, 1.0]),
			losses: vec![],
		});
		let features = arr2(&[[1.0], [2.0]]);
		let labels = arr1(&[1.0, 2.0]);
		let error = test_model(
			&model,
			"baseline",
			features.view(),
			labels.view(),
			features.view(),
			labels.view(),
		)
		.unwrap_err();
		assert!(matches!(error, TestError::DimensionMismatch(_)));
	}
}
