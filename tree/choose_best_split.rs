use crate::TrainOptions;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

pub struct ChooseBestSplitOutput {
	pub feature_index: usize,
	pub split_value: f32,
	/// This is the reduction in the sum of squared label errors the split achieves.
	pub gain: f64,
}

/// Find the split of `examples` that most reduces the sum of squared label errors, considering only the features in `feature_indexes`. This returns `None` if no split with positive gain satisfies `min_examples_per_leaf`, in which case the node becomes a leaf.
pub fn choose_best_split(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	examples: &[usize],
	feature_indexes: &[usize],
	options: &TrainOptions,
) -> Option<ChooseBestSplitOutput> {
	let n_examples = examples.len();
	let sum: f64 = examples
		.iter()
		.map(|&example| labels[example].to_f64().unwrap())
		.sum();
	let parent_score = sum * sum / n_examples.to_f64().unwrap();
	let mut best: Option<ChooseBestSplitOutput> = None;
	let mut sorted: Vec<(f32, f32)> = Vec::with_capacity(n_examples);
	for &feature_index in feature_indexes {
		sorted.clear();
		sorted.extend(
			examples
				.iter()
				.map(|&example| (features[[example, feature_index]], labels[example])),
		);
		sorted.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
		let mut left_sum = 0.0f64;
		for (index, (value, label)) in sorted.iter().enumerate().take(n_examples - 1) {
			left_sum += label.to_f64().unwrap();
			// splits are only valid at boundaries between distinct values, because examples with equal values cannot be separated
			if *value == sorted[index + 1].0 {
				continue;
			}
			let n_left = index + 1;
			let n_right = n_examples - n_left;
			if n_left < options.min_examples_per_leaf || n_right < options.min_examples_per_leaf {
				continue;
			}
			let right_sum = sum - left_sum;
			let gain = left_sum * left_sum / n_left.to_f64().unwrap()
				+ right_sum * right_sum / n_right.to_f64().unwrap()
				- parent_score;
			if gain <= 0.0 {
				continue;
			}
			if best.as_ref().map_or(true, |best| gain > best.gain) {
				best = Some(ChooseBestSplitOutput {
					feature_index,
					// threshold at the left value so that both children are guaranteed to be nonempty
					split_value: *value,
					gain,
				});
			}
		}
	}
	best
}

#[test]
fn test_choose_best_split() {
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let labels = arr1(&[0.0, 0.0, 10.0, 10.0]);
	let options = TrainOptions::default();
	let best = choose_best_split(
		features.view(),
		labels.view(),
		&[0, 1, 2, 3],
		&[0],
		&options,
	)
	.unwrap();
	assert_eq!(best.feature_index, 0);
	assert_eq!(best.split_value, 2.0);
	assert!((best.gain - 100.0).abs() < 1e-9);
}

#[test]
fn test_choose_best_split_min_examples_per_leaf() {
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let labels = arr1(&[0.0, 10.0, 10.0, 10.0]);
	let mut options = TrainOptions::default();
	let best = choose_best_split(
		features.view(),
		labels.view(),
		&[0, 1, 2, 3],
		&[0],
		&options,
	)
	.unwrap();
	assert_eq!(best.split_value, 1.0);
	options.min_examples_per_leaf = 2;
	let best = choose_best_split(
		features.view(),
		labels.view(),
		&[0, 1, 2, 3],
		&[0],
		&options,
	)
	.unwrap();
	assert_eq!(best.split_value, 2.0);
}

#[test]
fn test_choose_best_split_no_gain() {
	let constant_labels = arr1(&[5.0, 5.0, 5.0, 5.0]);
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let options = TrainOptions::default();
	assert!(choose_best_split(
		features.view(),
		constant_labels.view(),
		&[0, 1, 2, 3],
		&[0],
		&options,
	)
	.is_none());
	let constant_features = arr2(&[[1.0], [1.0], [1.0], [1.0]]);
	let labels = arr1(&[0.0, 0.0, 10.0, 10.0]);
	assert!(choose_best_split(
		constant_features.view(),
		labels.view(),
		&[0, 1, 2, 3],
		&[0],
		&options,
	)
	.is_none());
}
