use num_traits::ToPrimitive;
use std::collections::BTreeMap;
use tally_dataframe::{ColumnView, DataFrameView};
use tally_metrics::{m2_to_variance, merge_mean_m2};
use tally_util::finite::Finite;

/// This struct holds column stats, computed on the train partition so the report describes the rows the models actually saw.
#[derive(Clone, Debug)]
pub struct Stats(pub Vec<ColumnStats>);

#[derive(Clone, Debug)]
pub enum ColumnStats {
	Unknown(UnknownColumnStats),
	Number(NumberColumnStats),
}

#[derive(Clone, Debug)]
pub struct UnknownColumnStats {
	pub column_name: String,
	pub count: usize,
}

#[derive(Clone, Debug)]
pub struct NumberColumnStats {
	pub column_name: String,
	pub count: usize,
	/// The number of values that were finite.
	pub valid_count: usize,
	/// The number of values that were NaN or infinite.
	pub invalid_count: usize,
	/// A histogram from value to the number of times it appears.
	pub histogram: BTreeMap<Finite, usize>,
}

#[derive(Clone, Debug)]
pub struct StatsSettings {
	/// The stats will not report a histogram for columns with more than this many unique values.
	pub number_histogram_max_size: usize,
}

impl Default for StatsSettings {
	fn default() -> Self {
		Self {
			number_histogram_max_size: 100,
		}
	}
}

#[derive(Debug)]
pub struct StatsOutput(pub Vec<ColumnStatsOutput>);

#[derive(Debug)]
pub enum ColumnStatsOutput {
	Unknown(UnknownColumnStatsOutput),
	Number(NumberColumnStatsOutput),
}

#[derive(Debug)]
pub struct UnknownColumnStatsOutput {
	pub column_name: String,
	pub count: u64,
}

#[derive(Debug)]
pub struct NumberColumnStatsOutput {
	pub column_name: String,
	pub count: u64,
	pub invalid_count: u64,
	pub unique_count: u64,
	/// `None` when the column has more unique values than `number_histogram_max_size`.
	pub histogram: Option<Vec<(f32, u64)>>,
	pub min: f32,
	pub max: f32,
	pub mean: f32,
	pub variance: f32,
	pub std: f32,
	pub p25: f32,
	pub p50: f32,
	pub p75: f32,
}

impl Stats {
	pub fn compute(dataframe: &DataFrameView, settings: &StatsSettings) -> Self {
		let columns = dataframe
			.columns
			.iter()
			.map(|column| ColumnStats::compute(column, settings))
			.collect();
		Self(columns)
	}

	pub fn merge(self, other: Self) -> Self {
		let columns = self
			.0
			.into_iter()
			.zip(other.0.into_iter())
			.map(|(a, b)| a.merge(b))
			.collect();
		Self(columns)
	}

	pub fn finalize(self, settings: &StatsSettings) -> StatsOutput {
		let columns = self
			.0
			.into_iter()
			.map(|column| column.finalize(settings))
			.collect();
		StatsOutput(columns)
	}
}

impl ColumnStats {
	fn compute(column: &ColumnView, _settings: &StatsSettings) -> Self {
		match column {
			ColumnView::Unknown(column) => ColumnStats::Unknown(UnknownColumnStats {
				column_name: column.name.to_owned(),
				count: column.len,
			}),
			ColumnView::Number(column) => {
				let mut histogram = BTreeMap::new();
				let mut invalid_count = 0;
				for value in column.data.iter() {
					match Finite::new(*value) {
						Ok(value) => *histogram.entry(value).or_insert(0) += 1,
						Err(_) => invalid_count += 1,
					}
				}
				ColumnStats::Number(NumberColumnStats {
					column_name: column.name.to_owned(),
					count: column.data.len(),
					valid_count: column.data.len() - invalid_count,
					invalid_count,
					histogram,
				})
			}
		}
	}

	fn merge(self, other: Self) -> Self {
		match (self, other) {
			(ColumnStats::Unknown(mut a), ColumnStats::Unknown(b)) => {
				a.count += b.count;
				ColumnStats::Unknown(a)
			}
			(ColumnStats::Number(mut a), ColumnStats::Number(b)) => {
				a.count += b.count;
				a.valid_count += b.valid_count;
				a.invalid_count += b.invalid_count;
				for (value, count) in b.histogram {
					*a.histogram.entry(value).or_insert(0) += count;
				}
				ColumnStats::Number(a)
			}
			_ => unreachable!(),
		}
	}

	fn finalize(self, settings: &StatsSettings) -> ColumnStatsOutput {
		match self {
			ColumnStats::Unknown(stats) => ColumnStatsOutput::Unknown(UnknownColumnStatsOutput {
				column_name: stats.column_name,
				count: stats.count.to_u64().unwrap(),
			}),
			ColumnStats::Number(stats) => ColumnStatsOutput::Number(stats.finalize(settings)),
		}
	}
}

impl NumberColumnStats {
	fn finalize(self, settings: &StatsSettings) -> NumberColumnStatsOutput {
		// callers never finalize a column with no finite values
		let min = self.histogram.iter().next().unwrap().0.get();
		let max = self.histogram.iter().next_back().unwrap().0.get();
		let unique_count = self.histogram.len().to_u64().unwrap();
		let mut n = 0u64;
		let mut mean = 0.0f64;
		let mut m2 = 0.0f64;
		for (value, count) in self.histogram.iter() {
			let count = count.to_u64().unwrap();
			let (merged_mean, merged_m2) =
				merge_mean_m2(n, mean, m2, count, value.get().to_f64().unwrap(), 0.0);
			mean = merged_mean;
			m2 = merged_m2;
			n += count;
		}
		let variance = m2_to_variance(m2, n);
		let (p25, p50, p75) = compute_quartiles(&self.histogram, self.valid_count);
		let histogram = if self.histogram.len() <= settings.number_histogram_max_size {
			Some(
				self.histogram
					.into_iter()
					.map(|(value, count)| (value.get(), count.to_u64().unwrap()))
					.collect(),
			)
		} else {
			None
		};
		NumberColumnStatsOutput {
			column_name: self.column_name,
			count: self.count.to_u64().unwrap(),
			invalid_count: self.invalid_count.to_u64().unwrap(),
			unique_count,
			histogram,
			min,
			max,
			mean: mean as f32,
			variance,
			std: variance.sqrt(),
			p25,
			p50,
			p75,
		}
	}
}

/// Compute the p25, p50, and p75 values by walking the histogram in value order. A quartile index that falls between two distinct values is linearly interpolated.
fn compute_quartiles(histogram: &BTreeMap<Finite, usize>, valid_count: usize) -> (f32, f32, f32) {
	let max_index = (valid_count - 1).to_f32().unwrap();
	let indexes = [0.25 * max_index, 0.5 * max_index, 0.75 * max_index];
	let mut quartiles = [None, None, None];
	let mut seen = 0;
	let mut iter = histogram.iter().peekable();
	while let Some((value, count)) = iter.next() {
		let value = value.get();
		seen += count;
		for (quartile, index) in quartiles.iter_mut().zip(indexes.iter()) {
			if quartile.is_some() {
				continue;
			}
			let position = index.trunc().to_usize().unwrap();
			let fract = index.fract();
			// the last occurrence of this value sits at sorted position seen - 1
			if seen - 1 > position {
				*quartile = Some(value);
			} else if seen - 1 == position {
				if fract > 0.0 {
					let next_value = iter.peek().map(|(value, _)| value.get()).unwrap_or(value);
					*quartile = Some(value * (1.0 - fract) + next_value * fract);
				} else {
					*quartile = Some(value);
				}
			}
		}
	}
	(
		quartiles[0].unwrap(),
		quartiles[1].unwrap(),
		quartiles[2].unwrap(),
	)
}

/// The Pearson correlation of one feature column with the target column.
#[derive(Debug)]
pub struct TargetCorrelation {
	pub column_name: String,
	/// `None` for non number columns and for pairs where either column has zero variance.
	pub correlation: Option<f32>,
}

/// Compute the correlation of every feature column with the target column, pairing only the rows where both values are finite.
pub fn compute_target_correlations(
	dataframe: &DataFrameView,
	target_column_index: usize,
) -> Vec<TargetCorrelation> {
	let target = match &dataframe.columns[target_column_index] {
		ColumnView::Number(column) => column,
		ColumnView::Unknown(_) => return Vec::new(),
	};
	dataframe
		.columns
		.iter()
		.enumerate()
		.filter(|(column_index, _)| *column_index != target_column_index)
		.map(|(_, column)| match column {
			ColumnView::Unknown(column) => TargetCorrelation {
				column_name: column.name.to_owned(),
				correlation: None,
			},
			ColumnView::Number(column) => TargetCorrelation {
				column_name: column.name.to_owned(),
				correlation: pearson_correlation(column.data, target.data),
			},
		})
		.collect()
}

fn pearson_correlation(a: &[f32], b: &[f32]) -> Option<f32> {
	let mut n = 0.0f64;
	let mut sum_a = 0.0f64;
	let mut sum_b = 0.0f64;
	let mut sum_aa = 0.0f64;
	let mut sum_bb = 0.0f64;
	let mut sum_ab = 0.0f64;
	for (a, b) in a.iter().zip(b.iter()) {
		if !a.is_finite() || !b.is_finite() {
			continue;
		}
		let a = a.to_f64().unwrap();
		let b = b.to_f64().unwrap();
		n += 1.0;
		sum_a += a;
		sum_b += b;
		sum_aa += a * a;
		sum_bb += b * b;
		sum_ab += a * b;
	}
	if n == 0.0 {
		return None;
	}
	let covariance = sum_ab - sum_a * sum_b / n;
	let variance_a = sum_aa - sum_a * sum_a / n;
	let variance_b = sum_bb - sum_b * sum_b / n;
	if variance_a <= 0.0 || variance_b <= 0.0 {
		return None;
	}
	Some((covariance / (variance_a.sqrt() * variance_b.sqrt())) as f32)
}

#[cfg(test)]
mod test {
	use super::*;
	use tally_dataframe::{Column, DataFrame, NumberColumn};

	fn dataframe_of(columns: Vec<(&str, Vec<f32>)>) -> DataFrame {
		DataFrame {
			columns: columns
				.into_iter()
				.map(|(name, data)| {
					Column::Number(NumberColumn {
						name: name.to_owned(),
						data,
					})
				})
				.collect(),
		}
	}

	#[test]
	fn test_number_column_stats() {
		let dataframe = dataframe_of(vec![(
			"units",
			vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0],
		)]);
		let settings = StatsSettings::default();
		let output = Stats::compute(&dataframe.view(), &settings).finalize(&settings);
		let stats = match &output.0[0] {
			ColumnStatsOutput::Number(stats) => stats,
			_ => panic!(),
		};
		assert_eq!(stats.count, 8);
		assert_eq!(stats.invalid_count, 0);
		assert_eq!(stats.unique_count, 5);
		assert_eq!(stats.min, 2.0);
		assert_eq!(stats.max, 9.0);
		assert!((stats.mean - 5.0).abs() < 1e-6);
		assert!((stats.variance - 4.0).abs() < 1e-6);
		assert!((stats.std - 2.0).abs() < 1e-6);
		assert_eq!(stats.p25, 4.0);
		assert_eq!(stats.p50, 4.5);
		assert_eq!(stats.p75, 5.5);
		assert_eq!(stats.histogram.as_ref().unwrap().len(), 5);
	}

	#[test]
	fn test_stats_count_invalid_values() {
		let dataframe = dataframe_of(vec![("price", vec![1.0, std::f32::NAN, 3.0])]);
		let settings = StatsSettings::default();
		let output = Stats::compute(&dataframe.view(), &settings).finalize(&settings);
		let stats = match &output.0[0] {
			ColumnStatsOutput::Number(stats) => stats,
			_ => panic!(),
		};
		assert_eq!(stats.count, 3);
		assert_eq!(stats.invalid_count, 1);
		assert_eq!(stats.min, 1.0);
		assert_eq!(stats.max, 3.0);
		assert!((stats.mean - 2.0).abs() < 1e-6);
	}

	#[test]
	fn test_stats_merge_matches_whole() {
		let whole = dataframe_of(vec![("units", vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0])]);
		let left = dataframe_of(vec![("units", vec![1.0, 2.0, 3.0])]);
		let right = dataframe_of(vec![("units", vec![10.0, 20.0, 30.0])]);
		let settings = StatsSettings::default();
		let whole = Stats::compute(&whole.view(), &settings).finalize(&settings);
		let merged = Stats::compute(&left.view(), &settings)
			.merge(Stats::compute(&right.view(), &settings))
			.finalize(&settings);
		let whole = match &whole.0[0] {
			ColumnStatsOutput::Number(stats) => stats,
			_ => panic!(),
		};
		let merged = match &merged.0[0] {
			ColumnStatsOutput::Number(stats) => stats,
			_ => panic!(),
		};
		assert_eq!(whole.count, merged.count);
		assert_eq!(whole.unique_count, merged.unique_count);
		assert!((whole.mean - merged.mean).abs() < 1e-6);
		assert!((whole.variance - merged.variance).abs() < 1e-4);
		assert_eq!(whole.p50, merged.p50);
	}

	#[test]
	fn test_target_correlations() {
		let dataframe = dataframe_of(vec![
			("rising", vec![1.0, 2.0, 3.0, 4.0]),
			("falling", vec![8.0, 6.0, 4.0, 2.0]),
			("constant", vec![5.0, 5.0, 5.0, 5.0]),
			("target", vec![2.0, 4.0, 6.0, 8.0]),
		]);
		let correlations = compute_target_correlations(&dataframe.view(), 3);
		assert_eq!(correlations.len(), 3);
		assert_eq!(correlations[0].column_name, "rising");
		assert!((correlations[0].correlation.unwrap() - 1.0).abs() < 1e-6);
		assert!((correlations[1].correlation.unwrap() + 1.0).abs() < 1e-6);
		assert_eq!(correlations[2].correlation, None);
	}
}
