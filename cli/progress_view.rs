use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;
use tally_core::progress::Progress;

/// Renders training progress on stderr. Updates stream in on a channel and a background thread redraws the current line a few times a second.
pub struct ProgressView {
	sender: Option<Sender<Option<Progress>>>,
	thread: Option<JoinHandle<()>>,
}

impl ProgressView {
	pub fn new() -> Self {
		let (sender, receiver) = channel::<Option<Progress>>();
		let thread = std::thread::spawn(move || {
			let mut progress = None;
			let mut last_line = String::new();
			loop {
				match receiver.try_recv() {
					Err(TryRecvError::Empty) => {}
					Err(TryRecvError::Disconnected) => unreachable!(),
					Ok(None) => break,
					Ok(Some(new_progress)) => progress = Some(new_progress),
				}
				if let Some(progress) = progress.as_ref() {
					let line = render(progress);
					if line != last_line {
						eprint!("\r{:<60}", line);
						last_line = line;
					}
				}
				std::thread::sleep(Duration::from_millis(15));
			}
			if !last_line.is_empty() {
				eprint!("\r{:<60}\r", "");
			}
		});
		Self {
			sender: Some(sender),
			thread: Some(thread),
		}
	}

	pub fn update(&mut self, progress: Progress) {
		self.sender.as_ref().unwrap().send(Some(progress)).unwrap();
	}
}

impl Drop for ProgressView {
	fn drop(&mut self) {
		self.sender.take().unwrap().send(None).unwrap();
		self.thread.take().unwrap().join().unwrap();
	}
}

fn render(progress: &Progress) -> String {
	match progress {
		Progress::Loading(counter) => {
			format!("loading {} / {} bytes", counter.get(), counter.total())
		}
		Progress::Splitting => "splitting".to_owned(),
		Progress::ComputingStats => "computing stats".to_owned(),
		Progress::Scaling => "scaling features".to_owned(),
		Progress::TrainingBaseline => "training the linear baseline".to_owned(),
		Progress::TrainingEnsemble => "training the random forest".to_owned(),
		Progress::Searching(counter) => {
			format!("tuning {} / {} jobs", counter.get(), counter.total())
		}
		Progress::Evaluating => "evaluating".to_owned(),
	}
}
