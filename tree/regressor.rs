use crate::train::train_tree;
use crate::{TrainError, TrainOptions, Tree};
use itertools::izip;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// A bagged ensemble of regression trees.
#[derive(Debug)]
pub struct Regressor {
	/// This is the number of features the ensemble was trained on.
	pub n_features: usize,
	pub trees: Vec<Tree>,
}

impl Regressor {
	/// Train a regressor on `features` and `labels`. The tree at index `i` is seeded with `options.seed + i`, so the trees can be trained in parallel while the ensemble stays the same from run to run.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &TrainOptions,
	) -> Result<Regressor, TrainError> {
		validate(features, labels, options)?;
		let n_examples = features.nrows();
		let trees: Vec<Tree> = (0..options.n_trees)
			.into_par_iter()
			.map(|tree_index| {
				let mut rng = Xoshiro256Plus::seed_from_u64(
					options.seed.wrapping_add(tree_index.to_u64().unwrap()),
				);
				let examples: Vec<usize> = (0..n_examples)
					.map(|_| rng.gen_range(0, n_examples))
					.collect();
				train_tree(features, labels, examples, options, &mut rng)
			})
			.collect();
		Ok(Regressor {
			n_features: features.ncols(),
			trees,
		})
	}

	/// Write the mean of the trees' predictions for each row of `features` into `predictions`.
	pub fn predict(&self, features: ArrayView2<f32>, mut predictions: ArrayViewMut1<f32>) {
		let n_trees = self.trees.len().to_f32().unwrap();
		predictions.fill(0.0);
		for (example, prediction) in izip!(features.axis_iter(Axis(0)), predictions.iter_mut()) {
			let example = example.as_slice().unwrap();
			for tree in self.trees.iter() {
				*prediction += tree.predict(example);
			}
			*prediction /= n_trees;
		}
	}
}

fn validate(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	options: &TrainOptions,
) -> Result<(), TrainError> {
	if features.nrows() == 0 {
		return Err(TrainError::EmptyTrainingSet);
	}
	if labels.len() != features.nrows() {
		return Err(TrainError::LabelCountMismatch {
			n_examples: features.nrows(),
			n_labels: labels.len(),
		});
	}
	if options.n_trees == 0 {
		return Err(TrainError::ZeroTrees);
	}
	if options.max_depth == 0 {
		return Err(TrainError::ZeroDepth);
	}
	if options.min_examples_per_split < 2 {
		return Err(TrainError::MinExamplesPerSplitTooSmall);
	}
	if options.min_examples_per_leaf == 0 {
		return Err(TrainError::MinExamplesPerLeafTooSmall);
	}
	if let Some(max_features) = options.max_features {
		if max_features == 0 || max_features > features.ncols() {
			return Err(TrainError::InvalidMaxFeatures {
				n_features: features.ncols(),
			});
		}
	}
	Ok(())
}

#[test]
fn test_train_is_deterministic() {
	let features = Array::from_shape_fn((50, 2), |(i, j)| (i * (j + 1)).to_f32().unwrap());
	let labels = Array::from_shape_fn(50, |i| (i % 7).to_f32().unwrap());
	let options = TrainOptions {
		n_trees: 10,
		max_features: Some(1),
		..Default::default()
	};
	let model_a = Regressor::train(features.view(), labels.view(), &options).unwrap();
	let model_b = Regressor::train(features.view(), labels.view(), &options).unwrap();
	let mut predictions_a = Array::zeros(50);
	let mut predictions_b = Array::zeros(50);
	model_a.predict(features.view(), predictions_a.view_mut());
	model_b.predict(features.view(), predictions_b.view_mut());
	assert_eq!(predictions_a, predictions_b);
}

#[test]
fn test_train_fits_a_line() {
	let features = Array::from_shape_fn((100, 1), |(i, _)| i.to_f32().unwrap());
	let labels = Array::from_shape_fn(100, |i| i.to_f32().unwrap());
	let options = TrainOptions {
		n_trees: 50,
		max_depth: 8,
		..Default::default()
	};
	let model = Regressor::train(features.view(), labels.view(), &options).unwrap();
	assert_eq!(model.n_features, 1);
	let mut predictions = Array::zeros(100);
	model.predict(features.view(), predictions.view_mut());
	let mse: f32 = izip!(predictions.iter(), labels.iter())
		.map(|(prediction, label)| (prediction - label) * (prediction - label))
		.sum::<f32>()
		/ 100.0;
	assert!(mse < 100.0);
	assert!(predictions[10] < predictions[90]);
}

#[test]
fn test_train_rejects_bad_options() {
	let features = arr2(&[[1.0], [2.0]]);
	let labels = arr1(&[1.0, 2.0]);
	let options = TrainOptions {
		n_trees: 0,
		..Default::default()
	};
	assert!(matches!(
		Regressor::train(features.view(), labels.view(), &options),
		Err(TrainError::ZeroTrees)
	));
	let options = TrainOptions {
		max_features: Some(2),
		..Default::default()
	};
	assert!(matches!(
		Regressor::train(features.view(), labels.view(), &options),
		Err(TrainError::InvalidMaxFeatures { n_features: 1 })
	));
	let options = TrainOptions {
		min_examples_per_split: 1,
		..Default::default()
	};
	assert!(matches!(
		Regressor::train(features.view(), labels.view(), &options),
		Err(TrainError::MinExamplesPerSplitTooSmall)
	));
	let empty = Array::zeros((0, 1));
	assert!(matches!(
		Regressor::train(empty.view(), arr1::<f32>(&[]).view(), &TrainOptions::default()),
		Err(TrainError::EmptyTrainingSet)
	));
}
