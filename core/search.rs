use crate::grid::GridItem;
use crate::progress::Progress;
use itertools::iproduct;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;
use tally_util::progress_counter::ProgressCounter;
use thiserror::Error;

/// These are the options that control the cross validated hyperparameter search.
#[derive(Clone, Debug)]
pub struct SearchOptions {
	pub folds: usize,
	pub seed: u64,
}

impl Default for SearchOptions {
	fn default() -> Self {
		Self { folds: 3, seed: 42 }
	}
}

#[derive(Debug)]
pub struct SearchOutput {
	pub best_index: usize,
	pub best_grid_item: GridItem,
	/// The mean validation r2 of the winning candidate.
	pub best_score: f32,
	/// The mean validation r2 of every candidate, `None` for candidates whose every fold failed.
	pub candidate_scores: Vec<Option<f32>>,
	pub skipped: Vec<SkippedJob>,
	pub n_jobs: usize,
}

/// One (candidate, fold) job that failed to produce a score, kept so the caller can surface a warning.
#[derive(Debug)]
pub struct SkippedJob {
	pub candidate_index: usize,
	pub fold_index: usize,
	pub error: JobError,
}

#[derive(Debug, Error)]
pub enum JobError {
	#[error("{0}")]
	Train(#[from] tally_tree::TrainError),
	#[error("{0}")]
	Evaluate(#[from] tally_metrics::EvaluateError),
}

#[derive(Debug, Error)]
pub enum SearchError {
	#[error("{0}")]
	InvalidFolds(#[from] InvalidFoldsError),
	#[error("{0}")]
	Exhausted(#[from] SearchExhaustedError),
}

#[derive(Debug, Error)]
#[error("cannot assign {n_rows} rows to {folds} folds: there must be at least 2 folds and at least one row per fold")]
pub struct InvalidFoldsError {
	pub n_rows: usize,
	pub folds: usize,
}

#[derive(Debug, Error)]
#[error("no candidate configuration produced a valid score on any fold")]
pub struct SearchExhaustedError;

/// Assign each of `n_rows` rows to one of `folds` folds. The assignment is a seeded shuffle and fold sizes differ by at most one.
pub fn assign_folds(
	n_rows: usize,
	folds: usize,
	seed: u64,
) -> Result<Vec<usize>, InvalidFoldsError> {
	if folds < 2 || n_rows < folds {
		return Err(InvalidFoldsError { n_rows, folds });
	}
	let mut assignments: Vec<usize> = (0..n_rows).map(|row| row % folds).collect();
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	assignments.shuffle(&mut rng);
	Ok(assignments)
}

/// Score every candidate in `grid` with k fold cross validation and pick the one with the highest mean validation r2.
///
/// Each `(candidate, fold)` pair is one job and the jobs run in parallel. The fold assignment is computed once and shared by every candidate, and the forest for fold `i` is seeded with `seed + i`, so candidates are compared on identical partitions with identical randomness. A job that fails is recorded as a [`SkippedJob`](struct.SkippedJob.html) and excluded from its candidate's mean. A tie between two means keeps the candidate that appears first in the grid.
pub fn search(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	grid: Vec<GridItem>,
	options: &SearchOptions,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<SearchOutput, SearchError> {
	let fold_assignments = assign_folds(features.nrows(), options.folds, options.seed)?;
	// materialize the per fold partitions once, they are shared by every candidate
	let folds: Vec<Fold> = (0..options.folds)
		.map(|fold_index| Fold::new(features, labels, &fold_assignments, fold_index))
		.collect();
	let n_jobs = grid.len() * options.folds;
	let progress_counter = ProgressCounter::new(n_jobs.to_u64().unwrap());
	update_progress(Progress::Searching(progress_counter.clone()));
	let jobs: Vec<(usize, usize)> = iproduct!(0..grid.len(), 0..options.folds).collect();
	let results: Vec<Result<f32, JobError>> = jobs
		.par_iter()
		.map(|&(candidate_index, fold_index)| {
			let result = run_job(
				&grid[candidate_index],
				&folds[fold_index],
				options.seed.wrapping_add(fold_index.to_u64().unwrap()),
			);
			progress_counter.inc(1);
			result
		})
		.collect();
	let mut sums = vec![0.0f64; grid.len()];
	let mut counts = vec![0usize; grid.len()];
	let mut skipped = Vec::new();
	for (&(candidate_index, fold_index), result) in jobs.iter().zip(results.into_iter()) {
		match result {
			Ok(score) => {
				sums[candidate_index] += score.to_f64().unwrap();
				counts[candidate_index] += 1;
			}
			Err(error) => skipped.push(SkippedJob {
				candidate_index,
				fold_index,
				error,
			}),
		}
	}
	let candidate_scores: Vec<Option<f32>> = sums
		.iter()
		.zip(counts.iter())
		.map(|(sum, count)| {
			if *count == 0 {
				None
			} else {
				Some((sum / count.to_f64().unwrap()) as f32)
			}
		})
		.collect();
	let mut best: Option<(usize, f32)> = None;
	for (candidate_index, score) in candidate_scores.iter().enumerate() {
		if let Some(score) = score {
			if best.map_or(true, |(_, best_score)| *score > best_score) {
				best = Some((candidate_index, *score));
			}
		}
	}
	let (best_index, best_score) = best.ok_or(SearchExhaustedError)?;
	Ok(SearchOutput {
		best_index,
		best_grid_item: grid[best_index].clone(),
		best_score,
		candidate_scores,
		skipped,
		n_jobs,
	})
}

struct Fold {
	features_train: Array2<f32>,
	labels_train: Array1<f32>,
	features_valid: Array2<f32>,
	labels_valid: Array1<f32>,
}

impl Fold {
	fn new(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		assignments: &[usize],
		fold_index: usize,
	) -> Self {
		let train_rows: Vec<usize> = assignments
			.iter()
			.enumerate()
			.filter(|(_, assignment)| **assignment != fold_index)
			.map(|(row, _)| row)
			.collect();
		let valid_rows: Vec<usize> = assignments
			.iter()
			.enumerate()
			.filter(|(_, assignment)| **assignment == fold_index)
			.map(|(row, _)| row)
			.collect();
		Self {
			features_train: features.select(Axis(0), &train_rows),
			labels_train: labels.select(Axis(0), &train_rows),
			features_valid: features.select(Axis(0), &valid_rows),
			labels_valid: labels.select(Axis(0), &valid_rows),
		}
	}
}

fn run_job(grid_item: &GridItem, fold: &Fold, seed: u64) -> Result<f32, JobError> {
	let options = grid_item.train_options(seed);
	let model = tally_tree::Regressor::train(
		fold.features_train.view(),
		fold.labels_train.view(),
		&options,
	)?;
	let mut predictions = Array::zeros(fold.labels_valid.len());
	model.predict(fold.features_valid.view(), predictions.view_mut());
	let metrics = tally_metrics::evaluate(predictions.view(), fold.labels_valid.view())?;
	Ok(metrics.r2)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::GridConfig;
	use crate::grid::compute_hyperparameter_grid;

	fn small_dataset() -> (Array2<f32>, Array1<f32>) {
		let features = Array::from_shape_fn((21, 2), |(row, column)| {
			(row * (column + 2)) as f32 * 0.5
		});
		let labels = Array::from_shape_fn(21, |row| {
			2.0 * features[[row, 0]] - features[[row, 1]] + (row * 7 % 5) as f32 * 0.1
		});
		(features, labels)
	}

	#[test]
	fn test_assign_folds() {
		let assignments = assign_folds(10, 3, 42).unwrap();
		assert_eq!(assignments.len(), 10);
		let mut counts = vec![0usize; 3];
		for assignment in assignments.iter() {
			counts[*assignment] += 1;
		}
		counts.sort_unstable();
		assert_eq!(counts, vec![3, 3, 4]);
		assert_eq!(assignments, assign_folds(10, 3, 42).unwrap());
		assert!(assign_folds(10, 1, 42).is_err());
		assert!(assign_folds(2, 3, 42).is_err());
	}

	#[test]
	fn test_search_runs_every_job_once() {
		let (features, labels) = small_dataset();
		let config = GridConfig {
			n_trees: Some(vec![1, 2, 3]),
			max_depth: Some(vec![1, 2, 3, 4]),
			min_examples_per_split: Some(vec![2, 5, 10]),
			min_examples_per_leaf: Some(vec![1, 2, 4, 5]),
		};
		let grid = compute_hyperparameter_grid(Some(&config), None);
		assert_eq!(grid.len(), 144);
		let options = SearchOptions { folds: 3, seed: 42 };
		let output = search(
			features.view(),
			labels.view(),
			grid,
			&options,
			&mut |_| {},
		)
		.unwrap();
		assert_eq!(output.n_jobs, 432);
		assert_eq!(output.candidate_scores.len(), 144);
		assert!(output.skipped.is_empty());
		assert!(output.candidate_scores.iter().all(|score| score.is_some()));
		// the winner scores at least as well as every other candidate
		for score in output.candidate_scores.iter() {
			assert!(output.best_score >= score.unwrap());
		}
		assert_eq!(
			output.candidate_scores[output.best_index].unwrap(),
			output.best_score
		);
	}

	#[test]
	fn test_search_is_deterministic() {
		let (features, labels) = small_dataset();
		let config = GridConfig {
			n_trees: Some(vec![2]),
			max_depth: Some(vec![2, 3]),
			min_examples_per_split: Some(vec![2]),
			min_examples_per_leaf: Some(vec![1]),
		};
		let grid = compute_hyperparameter_grid(Some(&config), None);
		let options = SearchOptions { folds: 3, seed: 42 };
		let a = search(
			features.view(),
			labels.view(),
			grid.clone(),
			&options,
			&mut |_| {},
		)
		.unwrap();
		let b = search(
			features.view(),
			labels.view(),
			grid,
			&options,
			&mut |_| {},
		)
		.unwrap();
		assert_eq!(a.best_index, b.best_index);
		assert_eq!(a.candidate_scores, b.candidate_scores);
	}

	#[test]
	fn test_search_skips_failing_candidates() {
		let (features, labels) = small_dataset();
		let grid = vec![
			GridItem {
				n_trees: 2,
				max_depth: 3,
				// too small to be a valid split threshold, so every fold fails
				min_examples_per_split: 1,
				min_examples_per_leaf: 1,
				max_features: None,
			},
			GridItem {
				n_trees: 2,
				max_depth: 3,
				min_examples_per_split: 2,
				min_examples_per_leaf: 1,
				max_features: None,
			},
		];
		let options = SearchOptions { folds: 3, seed: 42 };
		let output = search(
			features.view(),
			labels.view(),
			grid,
			&options,
			&mut |_| {},
		)
		.unwrap();
		assert_eq!(output.best_index, 1);
		assert_eq!(output.candidate_scores[0], None);
		assert_eq!(output.skipped.len(), 3);
		assert!(output
			.skipped
			.iter()
			.all(|job| job.candidate_index == 0 && matches!(job.error, JobError::Train(_))));
	}

	#[test]
	fn test_search_exhausted_when_every_candidate_fails() {
		let (features, labels) = small_dataset();
		let grid = vec![GridItem {
			n_trees: 0,
			max_depth: 3,
			min_examples_per_split: 2,
			min_examples_per_leaf: 1,
			max_features: None,
		}];
		let options = SearchOptions { folds: 3, seed: 42 };
		let error = search(
			features.view(),
			labels.view(),
			grid,
			&options,
			&mut |_| {},
		)
		.unwrap_err();
		assert!(matches!(error, SearchError::Exhausted(_)));
	}

	#[test]
	fn test_search_exhausted_on_constant_labels() {
		// a constant target makes r2 undefined on every validation fold
		let features = Array::from_shape_fn((12, 1), |(row, _)| row as f32);
		let labels = Array::from_elem(12, 3.0f32);
		let grid = vec![GridItem {
			n_trees: 1,
			max_depth: 2,
			min_examples_per_split: 2,
			min_examples_per_leaf: 1,
			max_features: None,
		}];
		let options = SearchOptions { folds: 3, seed: 42 };
		let error = search(
			features.view(),
			labels.view(),
			grid,
			&options,
			&mut |_| {},
		)
		.unwrap_err();
		assert!(matches!(error, SearchError::Exhausted(_)));
	}
}
