use crate::choose_best_split::choose_best_split;
use crate::{BranchNode, LeafNode, Node, TrainOptions, Tree};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::seq::index::sample;
use rand_xoshiro::Xoshiro256Plus;

/// Train a single tree on the examples in `examples`, which contains duplicates when it was drawn as a bootstrap resample.
pub fn train_tree(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	examples: Vec<usize>,
	options: &TrainOptions,
	rng: &mut Xoshiro256Plus,
) -> Tree {
	let mut nodes = Vec::new();
	build_node(&mut nodes, features, labels, examples, 0, options, rng);
	Tree { nodes }
}

fn build_node(
	nodes: &mut Vec<Node>,
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	examples: Vec<usize>,
	depth: usize,
	options: &TrainOptions,
	rng: &mut Xoshiro256Plus,
) -> usize {
	let node_index = nodes.len();
	if depth >= options.max_depth || examples.len() < options.min_examples_per_split {
		nodes.push(Node::Leaf(LeafNode {
			value: mean_label(labels, &examples),
		}));
		return node_index;
	}
	let feature_indexes = choose_feature_indexes(features.ncols(), options, rng);
	let split = match choose_best_split(features, labels, &examples, &feature_indexes, options) {
		Some(split) => split,
		None => {
			nodes.push(Node::Leaf(LeafNode {
				value: mean_label(labels, &examples),
			}));
			return node_index;
		}
	};
	// push the branch now to reserve its index, then fill in the child indexes after the recursion
	nodes.push(Node::Branch(BranchNode {
		left_child_index: 0,
		right_child_index: 0,
		feature_index: split.feature_index,
		split_value: split.split_value,
	}));
	let (left_examples, right_examples): (Vec<usize>, Vec<usize>) = examples
		.into_iter()
		.partition(|&example| features[[example, split.feature_index]] <= split.split_value);
	let left_child_index = build_node(
		nodes,
		features,
		labels,
		left_examples,
		depth + 1,
		options,
		rng,
	);
	let right_child_index = build_node(
		nodes,
		features,
		labels,
		right_examples,
		depth + 1,
		options,
		rng,
	);
	match &mut nodes[node_index] {
		Node::Branch(branch) => {
			branch.left_child_index = left_child_index;
			branch.right_child_index = right_child_index;
		}
		Node::Leaf(_) => unreachable!(),
	}
	node_index
}

/// Draw the feature indexes that are candidates for a single split.
fn choose_feature_indexes(
	n_features: usize,
	options: &TrainOptions,
	rng: &mut Xoshiro256Plus,
) -> Vec<usize> {
	match options.max_features {
		Some(max_features) if max_features < n_features => {
			let mut feature_indexes = sample(rng, n_features, max_features).into_vec();
			// sort so that a tie between equal gains resolves to the lowest feature index
			feature_indexes.sort_unstable();
			feature_indexes
		}
		_ => (0..n_features).collect(),
	}
}

fn mean_label(labels: ArrayView1<f32>, examples: &[usize]) -> f32 {
	let sum: f64 = examples
		.iter()
		.map(|&example| labels[example].to_f64().unwrap())
		.sum();
	(sum / examples.len().to_f64().unwrap())
		.to_f32()
		.unwrap()
}

#[test]
fn test_train_tree_fits_a_step() {
	use rand::SeedableRng;
	let mut rng = Xoshiro256Plus::seed_from_u64(42);
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let labels = arr1(&[0.0, 0.0, 10.0, 10.0]);
	let options = TrainOptions::default();
	let tree = train_tree(
		features.view(),
		labels.view(),
		vec![0, 1, 2, 3],
		&options,
		&mut rng,
	);
	assert_eq!(tree.nodes.len(), 3);
	assert_eq!(tree.predict(&[1.5]), 0.0);
	assert_eq!(tree.predict(&[3.5]), 10.0);
}

#[test]
fn test_train_tree_respects_max_depth() {
	use rand::SeedableRng;
	let mut rng = Xoshiro256Plus::seed_from_u64(42);
	let features = arr2(&[
		[1.0],
		[2.0],
		[3.0],
		[4.0],
		[5.0],
		[6.0],
		[7.0],
		[8.0],
	]);
	let labels = arr1(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
	let options = TrainOptions {
		max_depth: 2,
		..Default::default()
	};
	let tree = train_tree(
		features.view(),
		labels.view(),
		(0..8).collect(),
		&options,
		&mut rng,
	);
	assert_eq!(tree.depth(), 2);
}

#[test]
fn test_train_tree_respects_min_examples_per_split() {
	use rand::SeedableRng;
	let mut rng = Xoshiro256Plus::seed_from_u64(42);
	let features = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
	let labels = arr1(&[1.0, 2.0, 3.0, 4.0]);
	let options = TrainOptions {
		min_examples_per_split: 5,
		..Default::default()
	};
	let tree = train_tree(
		features.view(),
		labels.view(),
		vec![0, 1, 2, 3],
		&options,
		&mut rng,
	);
	assert_eq!(tree.nodes.len(), 1);
	assert_eq!(tree.predict(&[2.0]), 2.5);
}
