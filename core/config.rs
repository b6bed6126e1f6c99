use anyhow::{Context, Result};
use std::path::Path;

/// Options for an analysis run. Every field is optional, so a config file only needs to list the options it wants to change.
#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
	/// The fraction of rows to hold out for testing.
	pub test_fraction: Option<f32>,
	/// The seed for every random operation in the run.
	pub seed: Option<u64>,
	/// The number of cross validation folds used by the hyperparameter search.
	pub folds: Option<usize>,
	/// The number of features each forest split considers. The default considers all of them.
	pub max_features: Option<usize>,
	pub grid: Option<GridConfig>,
}

/// Candidate values for each forest option. Options that are not listed fall back to the default candidates.
#[derive(Debug, Default, serde::Deserialize)]
pub struct GridConfig {
	pub n_trees: Option<Vec<usize>>,
	pub max_depth: Option<Vec<usize>>,
	pub min_examples_per_split: Option<Vec<usize>>,
	pub min_examples_per_leaf: Option<Vec<usize>>,
}

impl Config {
	/// Read a config from a yaml file.
	pub fn load(config_path: &Path) -> Result<Config> {
		let config = std::fs::read_to_string(config_path)
			.with_context(|| format!("failed to read config file {}", config_path.display()))?;
		let config = serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?;
		Ok(config)
	}
}

#[test]
fn test_config_from_yaml() {
	let yaml = r#"
test_fraction: 0.25
seed: 7
folds: 5
grid:
  n_trees: [50, 100]
  max_depth: [4, 8]
"#;
	let config: Config = serde_yaml::from_str(yaml).unwrap();
	assert_eq!(config.test_fraction, Some(0.25));
	assert_eq!(config.seed, Some(7));
	assert_eq!(config.folds, Some(5));
	assert_eq!(config.max_features, None);
	let grid = config.grid.unwrap();
	assert_eq!(grid.n_trees, Some(vec![50, 100]));
	assert_eq!(grid.max_depth, Some(vec![4, 8]));
	assert_eq!(grid.min_examples_per_split, None);
}

#[test]
fn test_config_from_empty_yaml() {
	let config: Config = serde_yaml::from_str("{}").unwrap();
	assert!(config.test_fraction.is_none());
	assert!(config.grid.is_none());
}
