use super::{train_early_stopping_split, EarlyStoppingMonitor, TrainOptions};
use itertools::izip;
use ndarray::prelude::*;
use tally_metrics::{MeanSquaredError, StreamingMetric};

/// This struct describes a linear regressor model. You can train one by calling `Regressor::train`.
#[derive(Debug, Clone)]
pub struct Regressor {
	pub bias: f32,
	pub weights: Array1<f32>,
	/// These are the mean squared errors on the training set for each epoch.
	pub losses: Vec<f32>,
}

impl Regressor {
	/// Train a linear regressor.
	pub fn train(features: ArrayView2<f32>, labels: ArrayView1<f32>, options: &TrainOptions) -> Self {
		let n_features = features.ncols();
		let (features_train, labels_train, features_early_stopping, labels_early_stopping) =
			train_early_stopping_split(
				features,
				labels,
				options
					.early_stopping_options
					.as_ref()
					.map(|o| o.early_stopping_fraction)
					.unwrap_or(0.0),
			);
		let mut model = Self {
			bias: 0.0,
			weights: Array1::<f32>::zeros(n_features),
			losses: vec![],
		};
		let mut early_stopping_monitor =
			options
				.early_stopping_options
				.as_ref()
				.map(|early_stopping_options| {
					EarlyStoppingMonitor::new(
						early_stopping_options.min_decrease_in_loss_for_significant_change,
						early_stopping_options.n_epochs_without_improvement_to_stop,
					)
				});
		for _ in 0..options.max_epochs {
			izip!(
				features_train.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
				labels_train.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
			)
			.for_each(|(features, labels)| {
				model.train_batch(features, labels, options);
			});
			let loss = model.compute_mse(features_train, labels_train, options);
			model.losses.push(loss);
			if let Some(early_stopping_monitor) = early_stopping_monitor.as_mut() {
				let early_stopping_metric_value =
					model.compute_mse(features_early_stopping, labels_early_stopping, options);
				let should_stop = early_stopping_monitor.update(early_stopping_metric_value);
				if should_stop {
					break;
				}
			}
		}
		model
	}

	fn train_batch(&mut self, features: ArrayView2<f32>, labels: ArrayView1<f32>, options: &TrainOptions) {
		let learning_rate = options.learning_rate;
		let predictions = features.dot(&self.weights) + self.bias;
		let py = (predictions - labels).insert_axis(Axis(1));
		let mut weight_gradients = (&features * &py).mean_axis(Axis(0)).unwrap();
		if options.l2_regularization > 0.0 {
			weight_gradients += &(&self.weights * options.l2_regularization);
		}
		let bias_gradient: f32 = py.mean_axis(Axis(0)).unwrap()[0];
		for (weight, weight_gradient) in izip!(self.weights.iter_mut(), weight_gradients.iter()) {
			*weight += -learning_rate * weight_gradient;
		}
		self.bias += -learning_rate * bias_gradient;
	}

	fn compute_mse(
		&self,
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &TrainOptions,
	) -> f32 {
		izip!(
			features.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
			labels.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
		)
		.fold(
			{
				let predictions =
					unsafe { <Array1<f32>>::uninitialized(options.n_examples_per_batch) };
				let metric = MeanSquaredError::default();
				(predictions, metric)
			},
			|mut state, (features, labels)| {
				let (predictions, metric) = &mut state;
				let slice = s![0..features.nrows()];
				let mut predictions = predictions.slice_mut(slice);
				self.predict(features, predictions.view_mut());
				for (prediction, label) in predictions.iter().zip(labels.iter()) {
					metric.update((*prediction, *label));
				}
				state
			},
		)
		.1
		.finalize()
		.unwrap_or(0.0)
	}

	/// Write predictions into `predictions` for the input `features`.
	pub fn predict(&self, features: ArrayView2<f32>, mut predictions: ArrayViewMut1<f32>) {
		predictions.fill(self.bias);
		ndarray::linalg::general_mat_vec_mul(1.0, &features, &self.weights, 1.0, &mut predictions);
	}
}

#[test]
fn test_train_recovers_line() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let labels = arr1(&[1.0, 3.0, 5.0, 7.0]);
	let options = TrainOptions {
		max_epochs: 1000,
		..Default::default()
	};
	let model = Regressor::train(features.view(), labels.view(), &options);
	assert!((model.weights[0] - 2.0).abs() < 1e-2);
	assert!((model.bias - 1.0).abs() < 1e-2);
	let mut predictions = Array1::<f32>::zeros(4);
	model.predict(features.view(), predictions.view_mut());
	for (prediction, label) in predictions.iter().zip(labels.iter()) {
		assert!((prediction - label).abs() < 5e-2);
	}
}

#[test]
fn test_train_is_deterministic() {
	let features = arr2(&[[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0], [5.0, 5.0]]);
	let labels = arr1(&[3.0, 4.0, 8.0, 9.0, 12.0]);
	let options = TrainOptions::default();
	let a = Regressor::train(features.view(), labels.view(), &options);
	let b = Regressor::train(features.view(), labels.view(), &options);
	assert_eq!(a.bias, b.bias);
	assert_eq!(a.weights, b.weights);
	assert_eq!(a.losses, b.losses);
}

#[test]
fn test_losses_decrease() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let labels = arr1(&[1.0, 3.0, 5.0, 7.0]);
	let options = TrainOptions {
		max_epochs: 50,
		..Default::default()
	};
	let model = Regressor::train(features.view(), labels.view(), &options);
	assert_eq!(model.losses.len(), 50);
	assert!(model.losses.first().unwrap() > model.losses.last().unwrap());
}
