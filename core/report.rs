use crate::grid::GridItem;
use crate::search::SkippedJob;
use crate::stats::{ColumnStatsOutput, StatsOutput, TargetCorrelation};
use crate::test::ModelEvaluation;
use tally_util::table::Table;

pub const LINEAR_MODEL_NAME: &str = "linear baseline";
pub const FOREST_MODEL_NAME: &str = "random forest";
pub const TUNED_FOREST_MODEL_NAME: &str = "tuned random forest";

/// The report is assembled stage by stage. A run that fails partway leaves the later sections `None`, so everything that completed before the failure can still be printed.
#[derive(Debug, Default)]
pub struct Report {
	pub dataset: Option<DatasetSection>,
	pub split: Option<SplitSection>,
	pub stats: Option<StatsSection>,
	pub scaling: Option<ScalingSection>,
	pub tuning: Option<TuningSection>,
	pub evaluation: Option<EvaluationSection>,
	pub narrative: Option<NarrativeSection>,
}

#[derive(Debug)]
pub struct DatasetSection {
	pub path: String,
	pub n_rows: usize,
	pub n_columns: usize,
	pub target_column_name: String,
}

#[derive(Debug)]
pub struct SplitSection {
	pub test_fraction: f32,
	pub seed: u64,
	pub n_rows_train: usize,
	pub n_rows_test: usize,
}

#[derive(Debug)]
pub struct StatsSection {
	pub target_column_name: String,
	pub column_stats: StatsOutput,
	pub target_correlations: Vec<TargetCorrelation>,
}

#[derive(Debug)]
pub struct ScalingSection {
	pub columns: Vec<tally_features::NormalizedFeatureGroup>,
}

#[derive(Debug)]
pub struct TuningSection {
	pub n_candidates: usize,
	pub folds: usize,
	pub n_jobs: usize,
	pub best_grid_item: GridItem,
	pub best_score: f32,
	pub skipped: Vec<SkippedJob>,
}

#[derive(Debug)]
pub struct EvaluationSection {
	pub models: Vec<ModelEvaluation>,
}

#[derive(Debug)]
pub struct NarrativeSection {
	pub paragraphs: Vec<String>,
}

impl std::fmt::Display for Report {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		if let Some(section) = &self.dataset {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.split {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.stats {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.scaling {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.tuning {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.evaluation {
			writeln!(f, "{}", section)?;
		}
		if let Some(section) = &self.narrative {
			writeln!(f, "{}", section)?;
		}
		Ok(())
	}
}

impl std::fmt::Display for DatasetSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Dataset")?;
		writeln!(
			f,
			"{}: {} rows, {} columns. The target column is \"{}\".",
			self.path, self.n_rows, self.n_columns, self.target_column_name,
		)
	}
}

impl std::fmt::Display for SplitSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Split")?;
		writeln!(
			f,
			"{} train rows and {} test rows (test fraction {}, seed {}).",
			self.n_rows_train, self.n_rows_test, self.test_fraction, self.seed,
		)
	}
}

impl std::fmt::Display for StatsSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Train column stats")?;
		let mut table = Table::new(
			["column", "min", "max", "mean", "std", "p25", "p50", "p75"]
				.iter()
				.map(|value| value.to_string())
				.collect(),
		);
		for column in self.column_stats.0.iter() {
			if let ColumnStatsOutput::Number(stats) = column {
				table.add_row(vec![
					stats.column_name.clone(),
					format!("{:.3}", stats.min),
					format!("{:.3}", stats.max),
					format!("{:.3}", stats.mean),
					format!("{:.3}", stats.std),
					format!("{:.3}", stats.p25),
					format!("{:.3}", stats.p50),
					format!("{:.3}", stats.p75),
				]);
			}
		}
		write!(f, "{}", table)?;
		writeln!(f)?;
		writeln!(f, "Correlations with \"{}\"", self.target_column_name)?;
		let mut table = Table::new(
			["column", "correlation"]
				.iter()
				.map(|value| value.to_string())
				.collect(),
		);
		for correlation in self.target_correlations.iter() {
			table.add_row(vec![
				correlation.column_name.clone(),
				correlation
					.correlation
					.map(|value| format!("{:.3}", value))
					.unwrap_or_else(|| "-".to_owned()),
			]);
		}
		write!(f, "{}", table)
	}
}

impl std::fmt::Display for ScalingSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Scaling")?;
		writeln!(
			f,
			"Features were standardized with statistics from the train rows alone.",
		)?;
		let mut table = Table::new(
			["column", "mean", "std"]
				.iter()
				.map(|value| value.to_string())
				.collect(),
		);
		for column in self.columns.iter() {
			table.add_row(vec![
				column.source_column_name.clone(),
				format!("{:.3}", column.mean),
				format!("{:.3}", column.variance.sqrt()),
			]);
		}
		write!(f, "{}", table)
	}
}

impl std::fmt::Display for TuningSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Tuning")?;
		writeln!(
			f,
			"Searched {} candidate configurations with {} fold cross validation ({} jobs).",
			self.n_candidates, self.folds, self.n_jobs,
		)?;
		writeln!(
			f,
			"Best configuration: {} (mean validation r2 {:.3}).",
			self.best_grid_item, self.best_score,
		)?;
		for job in self.skipped.iter() {
			writeln!(
				f,
				"warning: skipped candidate {} on fold {}: {}",
				job.candidate_index, job.fold_index, job.error,
			)?;
		}
		Ok(())
	}
}

impl std::fmt::Display for EvaluationSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Model comparison")?;
		let mut table = Table::new(
			["model", "train r2", "test mse", "test rmse", "test mae", "test r2"]
				.iter()
				.map(|value| value.to_string())
				.collect(),
		);
		for model in self.models.iter() {
			table.add_row(vec![
				model.model_name.clone(),
				format!("{:.3}", model.train.r2),
				format!("{:.3}", model.test.mse),
				format!("{:.3}", model.test.rmse),
				format!("{:.3}", model.test.mae),
				format!("{:.3}", model.test.r2),
			]);
		}
		write!(f, "{}", table)?;
		writeln!(f)?;
		writeln!(f, "Residuals on the test rows")?;
		let mut table = Table::new(
			["model", "min", "max", "mean"]
				.iter()
				.map(|value| value.to_string())
				.collect(),
		);
		for model in self.models.iter() {
			let residuals: Vec<f32> = model
				.pairs
				.iter()
				.map(|(actual, predicted)| predicted - actual)
				.collect();
			let min = residuals.iter().cloned().fold(std::f32::INFINITY, f32::min);
			let max = residuals
				.iter()
				.cloned()
				.fold(std::f32::NEG_INFINITY, f32::max);
			let mean = residuals.iter().sum::<f32>() / residuals.len() as f32;
			table.add_row(vec![
				model.model_name.clone(),
				format!("{:.3}", min),
				format!("{:.3}", max),
				format!("{:.3}", mean),
			]);
		}
		write!(f, "{}", table)
	}
}

impl std::fmt::Display for NarrativeSection {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		writeln!(f, "Summary")?;
		for (index, paragraph) in self.paragraphs.iter().enumerate() {
			if index > 0 {
				writeln!(f)?;
			}
			writeln!(f, "{}", paragraph)?;
		}
		Ok(())
	}
}

/// Turn the computed artifacts into a few plain sentences about what the run found.
pub fn compute_narrative(report: &Report) -> NarrativeSection {
	let mut paragraphs = Vec::new();
	if let Some(stats) = &report.stats {
		let strongest = stats
			.target_correlations
			.iter()
			.filter_map(|correlation| {
				correlation
					.correlation
					.map(|value| (correlation.column_name.as_str(), value))
			})
			.max_by(|(_, a), (_, b)| a.abs().partial_cmp(&b.abs()).unwrap());
		if let Some((column_name, correlation)) = strongest {
			paragraphs.push(format!(
				"Among the feature columns, \"{}\" moves most closely with \"{}\", with a correlation of {:.2}.",
				column_name, stats.target_column_name, correlation,
			));
		}
	}
	if let Some(evaluation) = &report.evaluation {
		let find = |name: &str| {
			evaluation
				.models
				.iter()
				.find(|model| model.model_name == name)
		};
		if let (Some(baseline), Some(tuned)) =
			(find(LINEAR_MODEL_NAME), find(TUNED_FOREST_MODEL_NAME))
		{
			if tuned.test.mse < baseline.test.mse {
				paragraphs.push(format!(
					"The tuned random forest beat the linear baseline on the held out rows, cutting the mean squared error from {:.3} to {:.3}.",
					baseline.test.mse, tuned.test.mse,
				));
			} else {
				paragraphs.push(format!(
					"The tuned random forest did not beat the linear baseline on the held out rows: its mean squared error was {:.3} against {:.3}.",
					tuned.test.mse, baseline.test.mse,
				));
			}
		}
		if let (Some(forest), Some(tuned)) =
			(find(FOREST_MODEL_NAME), find(TUNED_FOREST_MODEL_NAME))
		{
			paragraphs.push(format!(
				"Tuning moved the forest's held out r2 from {:.3} to {:.3}.",
				forest.test.r2, tuned.test.r2,
			));
		}
		if let Some(tuned) = find(TUNED_FOREST_MODEL_NAME) {
			let gap = tuned.train.r2 - tuned.test.r2;
			if gap > 0.1 {
				paragraphs.push(format!(
					"The gap between its train r2 ({:.3}) and held out r2 ({:.3}) suggests it is overfitting the train rows.",
					tuned.train.r2, tuned.test.r2,
				));
			} else {
				paragraphs.push(format!(
					"Its train r2 ({:.3}) and held out r2 ({:.3}) are close, so it generalizes to rows it has not seen.",
					tuned.train.r2, tuned.test.r2,
				));
			}
		}
	}
	NarrativeSection { paragraphs }
}

#[cfg(test)]
mod test {
	use super::*;
	use tally_metrics::RegressionMetricsOutput;

	fn metrics(mse: f32, r2: f32) -> RegressionMetricsOutput {
		RegressionMetricsOutput {
			mse,
			rmse: mse.sqrt(),
			mae: mse.sqrt(),
			r2,
			baseline_mse: 10.0,
			baseline_rmse: 10.0f32.sqrt(),
		}
	}

	fn evaluation(model_name: &str, test_mse: f32, train_r2: f32, test_r2: f32) -> ModelEvaluation {
		ModelEvaluation {
			model_name: model_name.to_owned(),
			train: metrics(0.5, train_r2),
			test: metrics(test_mse, test_r2),
			pairs: vec![(10.0, 11.0), (20.0, 18.5)],
		}
	}

	#[test]
	fn test_partial_report_shows_only_completed_stages() {
		let mut report = Report::default();
		report.dataset = Some(DatasetSection {
			path: "sales.csv".to_owned(),
			n_rows: 120,
			n_columns: 6,
			target_column_name: "Monthly_Sales".to_owned(),
		});
		let display = report.to_string();
		assert!(display.contains("Dataset"));
		assert!(display.contains("120 rows"));
		assert!(!display.contains("Tuning"));
		assert!(!display.contains("Model comparison"));
	}

	#[test]
	fn test_evaluation_section_display() {
		let section = EvaluationSection {
			models: vec![
				evaluation(LINEAR_MODEL_NAME, 4.0, 0.8, 0.7),
				evaluation(TUNED_FOREST_MODEL_NAME, 2.0, 0.95, 0.85),
			],
		};
		let display = section.to_string();
		assert!(display.contains("Model comparison"));
		assert!(display.contains(LINEAR_MODEL_NAME));
		assert!(display.contains("4.000"));
		assert!(display.contains("Residuals on the test rows"));
		assert!(display.contains("-1.500"));
		assert!(display.contains("1.000"));
	}

	#[test]
	fn test_narrative_when_tuning_wins() {
		let mut report = Report::default();
		report.stats = Some(StatsSection {
			target_column_name: "Monthly_Sales".to_owned(),
			column_stats: StatsOutput(vec![]),
			target_correlations: vec![
				TargetCorrelation {
					column_name: "Advertising_Spend".to_owned(),
					correlation: Some(0.9),
				},
				TargetCorrelation {
					column_name: "Price_Index".to_owned(),
					correlation: Some(-0.4),
				},
			],
		});
		report.evaluation = Some(EvaluationSection {
			models: vec![
				evaluation(LINEAR_MODEL_NAME, 4.0, 0.8, 0.7),
				evaluation(FOREST_MODEL_NAME, 3.0, 0.9, 0.75),
				evaluation(TUNED_FOREST_MODEL_NAME, 2.0, 0.9, 0.85),
			],
		});
		let narrative = compute_narrative(&report);
		assert_eq!(narrative.paragraphs.len(), 4);
		assert!(narrative.paragraphs[0].contains("Advertising_Spend"));
		assert!(narrative.paragraphs[1].contains("beat the linear baseline"));
		assert!(narrative.paragraphs[2].contains("0.750"));
		assert!(narrative.paragraphs[3].contains("close"));
	}

	#[test]
	fn test_narrative_when_tuning_does_not_win() {
		let mut report = Report::default();
		report.evaluation = Some(EvaluationSection {
			models: vec![
				evaluation(LINEAR_MODEL_NAME, 2.0, 0.8, 0.7),
				evaluation(TUNED_FOREST_MODEL_NAME, 4.0, 0.95, 0.5),
			],
		});
		let narrative = compute_narrative(&report);
		assert!(narrative.paragraphs[0].contains("did not beat"));
		assert!(narrative
			.paragraphs
			.last()
			.unwrap()
			.contains("overfitting"));
	}
}
