/*!
This crate implements a random forest regressor. Each tree in the ensemble is trained on a bootstrap resample of the training examples, splits are chosen by variance reduction over the raw feature values, and the ensemble's prediction is the mean of the trees' predictions. Training is seeded, so two runs with the same options produce the same ensemble.
*/

mod choose_best_split;
mod regressor;
mod train;

pub use self::regressor::Regressor;

use thiserror::Error;

/// These are the options passed to [`Regressor::train`](Regressor::train).
#[derive(Clone, Debug)]
pub struct TrainOptions {
	/// This is the number of trees to train.
	pub n_trees: usize,
	/// The depth of a single tree will never exceed this value.
	pub max_depth: usize,
	/// A node will only be considered for splitting if it has at least this many training examples.
	pub min_examples_per_split: usize,
	/// A split will only be accepted if each of the resulting children receives at least this many training examples.
	pub min_examples_per_leaf: usize,
	/// This is the number of features drawn at random as candidates for each split. `None` means every feature is a candidate at every split.
	pub max_features: Option<usize>,
	/// This is the seed used to draw the bootstrap resamples and the feature subsets.
	pub seed: u64,
}

impl Default for TrainOptions {
	fn default() -> TrainOptions {
		TrainOptions {
			n_trees: 100,
			max_depth: 6,
			min_examples_per_split: 2,
			min_examples_per_leaf: 1,
			max_features: None,
			seed: 42,
		}
	}
}

/// These are the ways [`Regressor::train`](Regressor::train) can reject its input.
#[derive(Debug, Error)]
pub enum TrainError {
	#[error("the training set is empty")]
	EmptyTrainingSet,
	#[error("the number of labels {n_labels} does not match the number of examples {n_examples}")]
	LabelCountMismatch { n_examples: usize, n_labels: usize },
	#[error("n_trees must be at least 1")]
	ZeroTrees,
	#[error("max_depth must be at least 1")]
	ZeroDepth,
	#[error("min_examples_per_split must be at least 2")]
	MinExamplesPerSplitTooSmall,
	#[error("min_examples_per_leaf must be at least 1")]
	MinExamplesPerLeafTooSmall,
	#[error("max_features must be between 1 and the number of features {n_features}")]
	InvalidMaxFeatures { n_features: usize },
}

/// A tree is stored as a `Vec` of nodes, where the children of a branch are identified by their indexes in the `Vec`. The root is the node at index zero.
#[derive(Debug)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

#[derive(Debug)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

#[derive(Debug)]
pub struct BranchNode {
	pub left_child_index: usize,
	pub right_child_index: usize,
	/// This is the index of the feature the branch splits on.
	pub feature_index: usize,
	/// Examples whose feature value is less than or equal to this value are sent to the left child, and the rest are sent to the right child.
	pub split_value: f32,
}

#[derive(Debug)]
pub struct LeafNode {
	/// This is the mean of the labels of the training examples that reached this leaf.
	pub value: f32,
}

impl Tree {
	/// Make a prediction for a single example.
	pub fn predict(&self, features: &[f32]) -> f32 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					feature_index,
					split_value,
				}) => {
					node_index = if features[*feature_index] <= *split_value {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				Node::Leaf(LeafNode { value }) => return *value,
			}
		}
	}

	/// Compute the number of edges between the root and the deepest leaf.
	pub fn depth(&self) -> usize {
		fn depth_at(nodes: &[Node], node_index: usize) -> usize {
			match &nodes[node_index] {
				Node::Branch(branch) => {
					1 + depth_at(nodes, branch.left_child_index)
						.max(depth_at(nodes, branch.right_child_index))
				}
				Node::Leaf(_) => 0,
			}
		}
		depth_at(&self.nodes, 0)
	}
}

#[test]
fn test_tree_predict() {
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				left_child_index: 1,
				right_child_index: 2,
				feature_index: 1,
				split_value: 0.5,
			}),
			Node::Leaf(LeafNode { value: -1.0 }),
			Node::Leaf(LeafNode { value: 1.0 }),
		],
	};
	assert_eq!(tree.predict(&[100.0, 0.5]), -1.0);
	assert_eq!(tree.predict(&[100.0, 0.6]), 1.0);
	assert_eq!(tree.depth(), 1);
}
