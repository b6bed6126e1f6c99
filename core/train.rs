use crate::config::Config;
use crate::grid;
use crate::model::Model;
use crate::progress::Progress;
use crate::report::{
	DatasetSection, EvaluationSection, Report, ScalingSection, SplitSection, StatsSection,
	TuningSection, FOREST_MODEL_NAME, LINEAR_MODEL_NAME, TUNED_FOREST_MODEL_NAME,
};
use crate::search;
use crate::split;
use crate::stats;
use crate::test::test_model;
use anyhow::Result;
use itertools::Itertools;
use ndarray::prelude::*;
use std::path::Path;
use tally_dataframe::{DataFrame, DataFrameView};
use tally_features::Standardizer;
use tally_util::progress_counter::ProgressCounter;
use thiserror::Error;

pub const DEFAULT_TEST_FRACTION: f32 = 0.2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_FOLDS: usize = 3;

/// The stages of a run, in the order they complete.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
	Loaded,
	Split,
	Scaled,
	BaselineTrained,
	EnsembleTrained,
	Tuned,
	Evaluated,
	Reported,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let name = match self {
			Stage::Loaded => "load",
			Stage::Split => "split",
			Stage::Scaled => "scale",
			Stage::BaselineTrained => "baseline training",
			Stage::EnsembleTrained => "ensemble training",
			Stage::Tuned => "tuning",
			Stage::Evaluated => "evaluation",
			Stage::Reported => "reporting",
		};
		write!(f, "{}", name)
	}
}

/// A failure in one stage, carrying the report of every stage that completed before it.
#[derive(Debug, Error)]
#[error("the {stage} stage failed")]
pub struct StageFailure {
	pub stage: Stage,
	#[source]
	pub cause: Box<dyn std::error::Error + Send + Sync>,
	pub report: Report,
}

#[derive(Debug, Error)]
#[error("did not find target column \"{target_column_name}\" among the columns \"{column_names}\"")]
pub struct TargetColumnNotFoundError {
	pub target_column_name: String,
	pub column_names: String,
}

#[derive(Debug, Error)]
#[error("column \"{column_name}\" does not hold numbers")]
pub struct NonNumericColumnError {
	pub column_name: String,
}

#[derive(Debug, Error)]
#[error("the dataset has no feature columns besides the target")]
pub struct NoFeatureColumnsError;

#[derive(Debug, Error)]
#[error("the dataset has missing or invalid values: {}", .columns.iter().map(|(column_name, count)| format!("{} in column \"{}\"", count, column_name)).join(", "))]
pub struct MissingValuesError {
	pub columns: Vec<(String, usize)>,
}

/// Run the whole analysis: load the csv, split it, compute stats, scale the features, train the baseline and the forests, tune, and evaluate.
///
/// The run moves through its stages in a fixed order and every source of randomness is seeded from `config.seed`, so two runs over the same file with the same config produce the same report. If a stage fails, the returned [`StageFailure`](struct.StageFailure.html) carries the report of every stage that completed before it.
pub fn train(
	file_path: &Path,
	target_column_name: &str,
	config: Config,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<Report, StageFailure> {
	let test_fraction = config.test_fraction.unwrap_or(DEFAULT_TEST_FRACTION);
	let seed = config.seed.unwrap_or(DEFAULT_SEED);
	let folds = config.folds.unwrap_or(DEFAULT_FOLDS);
	let mut report = Report::default();

	// Load the csv and require every column to be numeric and complete.
	let dataset = match load_dataset(file_path, target_column_name, update_progress) {
		Ok(dataset) => dataset,
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Loaded,
				cause: cause.into(),
				report,
			})
		}
	};
	report.dataset = Some(DatasetSection {
		path: file_path.display().to_string(),
		n_rows: dataset.dataframe.nrows(),
		n_columns: dataset.dataframe.ncols(),
		target_column_name: target_column_name.to_owned(),
	});

	// Split the rows, then describe the train partition.
	update_progress(Progress::Splitting);
	let split = match split::train_test_split(dataset.dataframe.nrows(), test_fraction, seed) {
		Ok(split) => split,
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Split,
				cause: cause.into(),
				report,
			})
		}
	};
	let dataframe_train = dataset.dataframe.select_rows(&split.train_indices);
	let dataframe_test = dataset.dataframe.select_rows(&split.test_indices);
	report.split = Some(SplitSection {
		test_fraction,
		seed,
		n_rows_train: dataframe_train.nrows(),
		n_rows_test: dataframe_test.nrows(),
	});
	update_progress(Progress::ComputingStats);
	let stats_settings = stats::StatsSettings::default();
	let column_stats =
		stats::Stats::compute(&dataframe_train.view(), &stats_settings).finalize(&stats_settings);
	let target_correlations =
		stats::compute_target_correlations(&dataframe_train.view(), dataset.target_column_index);
	report.stats = Some(StatsSection {
		target_column_name: target_column_name.to_owned(),
		column_stats,
		target_correlations,
	});

	// Fit the standardizer on the raw train features alone, then transform both partitions.
	update_progress(Progress::Scaling);
	let (features_train_raw, labels_train, feature_names) =
		extract_features_and_labels(&dataframe_train, dataset.target_column_index);
	let (features_test_raw, labels_test, _) =
		extract_features_and_labels(&dataframe_test, dataset.target_column_index);
	let mut standardizer = Standardizer::new();
	if let Err(cause) = standardizer.fit(features_train_raw.view(), &feature_names) {
		return Err(StageFailure {
			stage: Stage::Scaled,
			cause: cause.into(),
			report,
		});
	}
	let features_train = match standardizer.transform(features_train_raw.view()) {
		Ok(features) => features,
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Scaled,
				cause: cause.into(),
				report,
			})
		}
	};
	let features_test = match standardizer.transform(features_test_raw.view()) {
		Ok(features) => features,
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Scaled,
				cause: cause.into(),
				report,
			})
		}
	};
	report.scaling = Some(ScalingSection {
		columns: standardizer.columns.clone().unwrap_or_default(),
	});

	// The linear model is the yardstick the forests have to beat.
	update_progress(Progress::TrainingBaseline);
	let linear_options = tally_linear::TrainOptions::default();
	let baseline = Model::Linear(tally_linear::Regressor::train(
		features_train.view(),
		labels_train.view(),
		&linear_options,
	));

	// A forest with default options, before any tuning.
	update_progress(Progress::TrainingEnsemble);
	let forest_options = tally_tree::TrainOptions {
		max_features: config.max_features,
		seed,
		..Default::default()
	};
	let forest = match tally_tree::Regressor::train(
		features_train.view(),
		labels_train.view(),
		&forest_options,
	) {
		Ok(model) => Model::Forest(model),
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::EnsembleTrained,
				cause: cause.into(),
				report,
			})
		}
	};

	// Tune with a cross validated grid search, then train one final forest with the winning options on the whole train partition.
	let grid = grid::compute_hyperparameter_grid(config.grid.as_ref(), config.max_features);
	let n_candidates = grid.len();
	let search_options = search::SearchOptions { folds, seed };
	let search_output = match search::search(
		features_train.view(),
		labels_train.view(),
		grid,
		&search_options,
		update_progress,
	) {
		Ok(output) => output,
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Tuned,
				cause: cause.into(),
				report,
			})
		}
	};
	let tuned_options = search_output.best_grid_item.train_options(seed);
	let tuned = match tally_tree::Regressor::train(
		features_train.view(),
		labels_train.view(),
		&tuned_options,
	) {
		Ok(model) => Model::Forest(model),
		Err(cause) => {
			return Err(StageFailure {
				stage: Stage::Tuned,
				cause: cause.into(),
				report,
			})
		}
	};
	report.tuning = Some(TuningSection {
		n_candidates,
		folds,
		n_jobs: search_output.n_jobs,
		best_grid_item: search_output.best_grid_item,
		best_score: search_output.best_score,
		skipped: search_output.skipped,
	});

	// Evaluate every model that finished training, on both partitions.
	update_progress(Progress::Evaluating);
	let models = vec![
		(baseline, LINEAR_MODEL_NAME),
		(forest, FOREST_MODEL_NAME),
		(tuned, TUNED_FOREST_MODEL_NAME),
	];
	let mut evaluations = Vec::new();
	for (model, model_name) in models.iter() {
		match test_model(
			model,
			model_name,
			features_train.view(),
			labels_train.view(),
			features_test.view(),
			labels_test.view(),
		) {
			Ok(evaluation) => evaluations.push(evaluation),
			Err(cause) => {
				return Err(StageFailure {
					stage: Stage::Evaluated,
					cause: cause.into(),
					report,
				})
			}
		}
	}
	report.evaluation = Some(EvaluationSection {
		models: evaluations,
	});

	report.narrative = Some(crate::report::compute_narrative(&report));
	Ok(report)
}

struct LoadedDataset {
	dataframe: DataFrame,
	target_column_index: usize,
}

fn load_dataset(
	file_path: &Path,
	target_column_name: &str,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<LoadedDataset> {
	let file_len = std::fs::metadata(file_path)?.len();
	let progress_counter = ProgressCounter::new(file_len);
	update_progress(Progress::Loading(progress_counter.clone()));
	let dataframe = DataFrame::from_path(file_path, Default::default(), |byte| {
		progress_counter.set(byte)
	})?;
	let target_column_index = dataframe
		.columns
		.iter()
		.position(|column| column.name() == target_column_name)
		.ok_or_else(|| TargetColumnNotFoundError {
			target_column_name: target_column_name.to_owned(),
			column_names: dataframe
				.columns
				.iter()
				.map(|column| column.name())
				.join(", "),
		})?;
	if dataframe.ncols() < 2 {
		return Err(NoFeatureColumnsError.into());
	}
	for column in dataframe.columns.iter() {
		if column.as_number().is_none() {
			return Err(NonNumericColumnError {
				column_name: column.name().to_owned(),
			}
			.into());
		}
	}
	let missing: Vec<(String, usize)> = dataframe
		.columns
		.iter()
		.filter_map(|column| {
			let column = column.as_number()?;
			let count = column
				.data
				.iter()
				.filter(|value| !value.is_finite())
				.count();
			if count > 0 {
				Some((column.name.clone(), count))
			} else {
				None
			}
		})
		.collect();
	if !missing.is_empty() {
		return Err(MissingValuesError { columns: missing }.into());
	}
	Ok(LoadedDataset {
		dataframe,
		target_column_index,
	})
}

fn extract_features_and_labels(
	dataframe: &DataFrame,
	target_column_index: usize,
) -> (Array2<f32>, Array1<f32>, Vec<String>) {
	let view = dataframe.view();
	let feature_columns: Vec<_> = view
		.columns
		.iter()
		.enumerate()
		.filter(|(column_index, _)| *column_index != target_column_index)
		.map(|(_, column)| column.view())
		.collect();
	let feature_names: Vec<String> = feature_columns
		.iter()
		.map(|column| column.name().to_owned())
		.collect();
	// load requires every column to be numeric
	let features = DataFrameView {
		columns: feature_columns,
	}
	.to_rows_f32()
	.unwrap();
	let labels = Array::from(
		view.columns[target_column_index]
			.as_number()
			.unwrap()
			.data
			.to_vec(),
	);
	(features, labels, feature_names)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::GridConfig;

	fn write_sales_csv(file_name: &str, n_rows: usize) -> std::path::PathBuf {
		let path = std::env::temp_dir().join(file_name);
		let mut csv = String::from("Advertising_Spend,Store_Count,Price_Index,Monthly_Sales\n");
		for row in 0..n_rows {
			let advertising = 100.0 + (row * 17 % 40) as f32;
			let stores = 5.0 + (row % 7) as f32;
			let price = 90.0 + (row * 3 % 10) as f32;
			let sales =
				3.0 * advertising + 20.0 * stores - 2.0 * price + (row * 13 % 9) as f32;
			csv.push_str(&format!(
				"{:.1},{:.1},{:.1},{:.1}\n",
				advertising, stores, price, sales,
			));
		}
		std::fs::write(&path, csv).unwrap();
		path
	}

	fn small_grid() -> GridConfig {
		GridConfig {
			n_trees: Some(vec![5]),
			max_depth: Some(vec![3, 4]),
			min_examples_per_split: Some(vec![2]),
			min_examples_per_leaf: Some(vec![1]),
		}
	}

	#[test]
	fn test_train_end_to_end() {
		let path = write_sales_csv("tally_core_end_to_end.csv", 60);
		let config = Config {
			grid: Some(small_grid()),
			..Default::default()
		};
		let mut events = Vec::new();
		let report = train(&path, "Monthly_Sales", config, &mut |progress| {
			events.push(match progress {
				Progress::Loading(_) => "loading",
				Progress::Splitting => "splitting",
				Progress::ComputingStats => "stats",
				Progress::Scaling => "scaling",
				Progress::TrainingBaseline => "baseline",
				Progress::TrainingEnsemble => "ensemble",
				Progress::Searching(_) => "searching",
				Progress::Evaluating => "evaluating",
			});
		})
		.unwrap();
		std::fs::remove_file(&path).ok();
		assert_eq!(
			events,
			vec![
				"loading",
				"splitting",
				"stats",
				"scaling",
				"baseline",
				"ensemble",
				"searching",
				"evaluating",
			],
		);
		let split = report.split.as_ref().unwrap();
		assert_eq!(split.n_rows_train, 48);
		assert_eq!(split.n_rows_test, 12);
		assert!(report.stats.is_some());
		assert!(report.scaling.is_some());
		let tuning = report.tuning.as_ref().unwrap();
		assert_eq!(tuning.n_candidates, 2);
		assert_eq!(tuning.n_jobs, 6);
		let evaluation = report.evaluation.as_ref().unwrap();
		assert_eq!(evaluation.models.len(), 3);
		assert_eq!(evaluation.models[0].model_name, LINEAR_MODEL_NAME);
		assert_eq!(evaluation.models[1].model_name, FOREST_MODEL_NAME);
		assert_eq!(evaluation.models[2].model_name, TUNED_FOREST_MODEL_NAME);
		assert!(!report.narrative.as_ref().unwrap().paragraphs.is_empty());
		let display = report.to_string();
		assert!(display.contains("Model comparison"));
		assert!(display.contains("Monthly_Sales"));
	}

	#[test]
	fn test_train_is_deterministic() {
		let path = write_sales_csv("tally_core_deterministic.csv", 60);
		let config_a = Config {
			grid: Some(small_grid()),
			..Default::default()
		};
		let config_b = Config {
			grid: Some(small_grid()),
			..Default::default()
		};
		let report_a = train(&path, "Monthly_Sales", config_a, &mut |_| {}).unwrap();
		let report_b = train(&path, "Monthly_Sales", config_b, &mut |_| {}).unwrap();
		std::fs::remove_file(&path).ok();
		assert_eq!(
			report_a.tuning.as_ref().unwrap().best_grid_item,
			report_b.tuning.as_ref().unwrap().best_grid_item,
		);
		let models_a = &report_a.evaluation.as_ref().unwrap().models;
		let models_b = &report_b.evaluation.as_ref().unwrap().models;
		for (a, b) in models_a.iter().zip(models_b.iter()) {
			assert_eq!(a.test.mse, b.test.mse);
			assert_eq!(a.test.r2, b.test.r2);
		}
	}

	#[test]
	fn test_train_aborts_on_missing_values() {
		let path = std::env::temp_dir().join("tally_core_missing.csv");
		std::fs::write(
			&path,
			"Advertising_Spend,Monthly_Sales\n100.0,500.0\n,510.0\n120.0,520.0\n",
		)
		.unwrap();
		let failure = train(&path, "Monthly_Sales", Config::default(), &mut |_| {}).unwrap_err();
		std::fs::remove_file(&path).ok();
		assert_eq!(failure.stage, Stage::Loaded);
		assert!(failure
			.cause
			.to_string()
			.contains("missing or invalid values"));
		assert!(failure.report.dataset.is_none());
	}

	#[test]
	fn test_train_aborts_on_unknown_target() {
		let path = write_sales_csv("tally_core_unknown_target.csv", 10);
		let failure = train(&path, "Weekly_Sales", Config::default(), &mut |_| {}).unwrap_err();
		std::fs::remove_file(&path).ok();
		assert_eq!(failure.stage, Stage::Loaded);
		assert!(failure
			.cause
			.to_string()
			.contains("did not find target column"));
	}

	#[test]
	fn test_train_aborts_on_text_column() {
		let path = std::env::temp_dir().join("tally_core_text_column.csv");
		std::fs::write(&path, "Region,Monthly_Sales\nnorth,500.0\nsouth,510.0\n").unwrap();
		let failure = train(&path, "Monthly_Sales", Config::default(), &mut |_| {}).unwrap_err();
		std::fs::remove_file(&path).ok();
		assert_eq!(failure.stage, Stage::Loaded);
		assert!(failure.cause.to_string().contains("does not hold numbers"));
	}

	#[test]
	fn test_failed_stage_keeps_earlier_sections() {
		// a constant feature passes loading but cannot be scaled
		let path = std::env::temp_dir().join("tally_core_constant_feature.csv");
		let mut csv = String::from("Promo,Advertising_Spend,Monthly_Sales\n");
		for row in 0..30 {
			csv.push_str(&format!(
				"7.0,{:.1},{:.1}\n",
				100.0 + row as f32,
				500.0 + 3.0 * row as f32,
			));
		}
		std::fs::write(&path, csv).unwrap();
		let failure = train(&path, "Monthly_Sales", Config::default(), &mut |_| {}).unwrap_err();
		std::fs::remove_file(&path).ok();
		assert_eq!(failure.stage, Stage::Scaled);
		assert!(failure.cause.to_string().contains("zero variance"));
		assert!(failure.report.dataset.is_some());
		assert!(failure.report.split.is_some());
		assert!(failure.report.stats.is_some());
		assert!(failure.report.scaling.is_none());
		assert!(failure.report.evaluation.is_none());
	}
}
