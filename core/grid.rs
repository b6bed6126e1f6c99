use crate::config::GridConfig;
use itertools::iproduct;

/// One candidate forest configuration produced by the hyperparameter grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridItem {
	pub n_trees: usize,
	pub max_depth: usize,
	pub min_examples_per_split: usize,
	pub min_examples_per_leaf: usize,
	pub max_features: Option<usize>,
}

pub const DEFAULT_N_TREES_VALUES: [usize; 3] = [100, 200, 300];
pub const DEFAULT_MAX_DEPTH_VALUES: [usize; 4] = [4, 6, 8, 10];
pub const DEFAULT_MIN_EXAMPLES_PER_SPLIT_VALUES: [usize; 3] = [2, 5, 10];
pub const DEFAULT_MIN_EXAMPLES_PER_LEAF_VALUES: [usize; 4] = [1, 2, 4, 5];

/// Compute the full cross product of the candidate values for each option, in row major order with `n_trees` as the outermost axis.
pub fn compute_hyperparameter_grid(
	config: Option<&GridConfig>,
	max_features: Option<usize>,
) -> Vec<GridItem> {
	let n_trees_values = config
		.and_then(|config| config.n_trees.clone())
		.unwrap_or_else(|| DEFAULT_N_TREES_VALUES.to_vec());
	let max_depth_values = config
		.and_then(|config| config.max_depth.clone())
		.unwrap_or_else(|| DEFAULT_MAX_DEPTH_VALUES.to_vec());
	let min_examples_per_split_values = config
		.and_then(|config| config.min_examples_per_split.clone())
		.unwrap_or_else(|| DEFAULT_MIN_EXAMPLES_PER_SPLIT_VALUES.to_vec());
	let min_examples_per_leaf_values = config
		.and_then(|config| config.min_examples_per_leaf.clone())
		.unwrap_or_else(|| DEFAULT_MIN_EXAMPLES_PER_LEAF_VALUES.to_vec());
	let mut grid = Vec::new();
	for (&n_trees, &max_depth, &min_examples_per_split, &min_examples_per_leaf) in iproduct!(
		n_trees_values.iter(),
		max_depth_values.iter(),
		min_examples_per_split_values.iter(),
		min_examples_per_leaf_values.iter()
	) {
		grid.push(GridItem {
			n_trees,
			max_depth,
			min_examples_per_split,
			min_examples_per_leaf,
			max_features,
		});
	}
	grid
}

impl GridItem {
	pub fn train_options(&self, seed: u64) -> tally_tree::TrainOptions {
		tally_tree::TrainOptions {
			n_trees: self.n_trees,
			max_depth: self.max_depth,
			min_examples_per_split: self.min_examples_per_split,
			min_examples_per_leaf: self.min_examples_per_leaf,
			max_features: self.max_features,
			seed,
		}
	}
}

impl std::fmt::Display for GridItem {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"n_trees {}, max_depth {}, min_examples_per_split {}, min_examples_per_leaf {}",
			self.n_trees, self.max_depth, self.min_examples_per_split, self.min_examples_per_leaf,
		)?;
		if let Some(max_features) = self.max_features {
			write!(f, ", max_features {}", max_features)?;
		}
		Ok(())
	}
}

#[test]
fn test_default_grid() {
	let grid = compute_hyperparameter_grid(None, None);
	assert_eq!(grid.len(), 144);
	// the innermost axis varies first
	assert_eq!(
		grid[0],
		GridItem {
			n_trees: 100,
			max_depth: 4,
			min_examples_per_split: 2,
			min_examples_per_leaf: 1,
			max_features: None,
		}
	);
	assert_eq!(grid[1].min_examples_per_leaf, 2);
	assert_eq!(grid[4].min_examples_per_split, 5);
	assert_eq!(grid[143].n_trees, 300);
	assert_eq!(grid[143].max_depth, 10);
}

#[test]
fn test_grid_from_config() {
	let config = GridConfig {
		n_trees: Some(vec![10]),
		max_depth: Some(vec![3]),
		min_examples_per_split: None,
		min_examples_per_leaf: Some(vec![1]),
	};
	let grid = compute_hyperparameter_grid(Some(&config), Some(2));
	assert_eq!(grid.len(), 3);
	assert!(grid
		.iter()
		.all(|item| item.n_trees == 10 && item.max_depth == 3 && item.max_features == Some(2)));
	let min_examples_per_split_values: Vec<usize> =
		grid.iter().map(|item| item.min_examples_per_split).collect();
	assert_eq!(min_examples_per_split_values, vec![2, 5, 10]);
}
