use anyhow::Result;
use clap::Clap;
use colored::Colorize;
use std::path::PathBuf;
use tally_core::config::Config;

mod progress_view;

use self::progress_view::ProgressView;

#[derive(Clap)]
#[clap(about = "Analyze a csv of monthly sales and compare regression models.")]
struct Options {
	#[clap(short, long, about = "the path to your .csv file")]
	file: PathBuf,
	#[clap(
		short,
		long,
		about = "the name of the column to predict",
		default_value = "Monthly_Sales"
	)]
	target: String,
	#[clap(short, long, about = "the path to a yaml config file")]
	config: Option<PathBuf>,
	#[clap(long, about = "the seed for every random operation")]
	seed: Option<u64>,
	#[clap(long, about = "the fraction of rows to hold out for testing")]
	test_fraction: Option<f32>,
	#[clap(long, about = "the number of cross validation folds")]
	folds: Option<usize>,
	#[clap(long, about = "disable the progress view")]
	quiet: bool,
}

fn main() {
	let options = Options::parse();
	if let Err(error) = run(options) {
		eprintln!("{}: {}", "error".red().bold(), error);
		error
			.chain()
			.skip(1)
			.for_each(|cause| eprintln!("  {} {}", "->".red().bold(), cause));
		std::process::exit(1);
	}
}

fn run(options: Options) -> Result<()> {
	let mut config = match &options.config {
		Some(config_path) => Config::load(config_path)?,
		None => Config::default(),
	};
	// flags override the config file
	if let Some(seed) = options.seed {
		config.seed = Some(seed);
	}
	if let Some(test_fraction) = options.test_fraction {
		config.test_fraction = Some(test_fraction);
	}
	if let Some(folds) = options.folds {
		config.folds = Some(folds);
	}
	let mut progress_view = if options.quiet {
		None
	} else {
		Some(ProgressView::new())
	};
	let result = tally_core::train(&options.file, &options.target, config, &mut |progress| {
		if let Some(progress_view) = progress_view.as_mut() {
			progress_view.update(progress);
		}
	});
	drop(progress_view);
	match result {
		Ok(report) => {
			print!("{}", report);
			Ok(())
		}
		Err(failure) => {
			// print everything that completed before the failure
			print!("{}", failure.report);
			Err(failure.into())
		}
	}
}
