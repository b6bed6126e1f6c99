use tally_util::progress_counter::ProgressCounter;

/// [`train`](../train/fn.train.html) reports one of these at each stage boundary so callers can render a progress view.
#[derive(Clone, Debug)]
pub enum Progress {
	Loading(ProgressCounter),
	Splitting,
	ComputingStats,
	Scaling,
	TrainingBaseline,
	TrainingEnsemble,
	Searching(ProgressCounter),
	Evaluating,
}
