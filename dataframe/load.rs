use super::*;
use anyhow::Result;
use std::path::Path;

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			invalid_values: DEFAULT_INVALID_VALUES,
		}
	}
}

/// These values are the default values that are considered invalid.
const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions, progress: impl Fn(u64)) -> Result<Self> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options, progress)
	}

	pub fn from_csv<R>(
		reader: &mut csv::Reader<R>,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.to_owned())
			.collect();
		let n_columns = column_names.len();
		let start_position = reader.position().clone();

		// Pass over the csv once to decide which columns hold numbers.
		let mut infer_stats = vec![InferStats::new(&options); n_columns];
		let mut record = csv::StringRecord::new();
		let mut n_rows = 0;
		while reader.read_record(&mut record)? {
			n_rows += 1;
			for (infer_stats, value) in izip!(infer_stats.iter_mut(), record.iter()) {
				infer_stats.update(value);
			}
		}
		let column_types: Vec<ColumnType> = infer_stats
			.into_iter()
			.map(|infer_stats| infer_stats.finalize())
			.collect();

		// After inference, return back to the beginning of the csv to load the values.
		reader.seek(start_position)?;
		let mut dataframe = Self::new(column_names, column_types);
		for column in dataframe.columns.iter_mut() {
			if let Column::Number(column) = column {
				column.data.reserve_exact(n_rows);
			}
		}

		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			progress(record.position().unwrap().byte());
			for (column, value) in dataframe.columns.iter_mut().zip(record.iter()) {
				match column {
					Column::Unknown(column) => {
						column.len += 1;
					}
					Column::Number(column) => {
						let value = match lexical::parse::<f32, &[u8]>(value) {
							Ok(value) if value.is_finite() => value,
							_ => std::f32::NAN,
						};
						column.data.push(value);
					}
				}
			}
		}
		Ok(dataframe)
	}
}

#[derive(Clone, Debug)]
struct InferStats<'a> {
	invalid_values: &'a [&'a str],
	column_type: InferColumnType,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum InferColumnType {
	Unknown,
	Number,
	Other,
}

impl<'a> InferStats<'a> {
	fn new(options: &FromCsvOptions<'a>) -> Self {
		Self {
			invalid_values: options.invalid_values,
			column_type: InferColumnType::Unknown,
		}
	}

	fn update(&mut self, value: &str) {
		if self.invalid_values.contains(&value) {
			return;
		}
		match self.column_type {
			InferColumnType::Unknown | InferColumnType::Number => {
				if lexical::parse::<f32, &str>(value)
					.map(|value| value.is_finite())
					.unwrap_or(false)
				{
					self.column_type = InferColumnType::Number;
				} else {
					self.column_type = InferColumnType::Other;
				}
			}
			InferColumnType::Other => {}
		}
	}

	fn finalize(self) -> ColumnType {
		match self.column_type {
			InferColumnType::Number => ColumnType::Number,
			_ => ColumnType::Unknown,
		}
	}
}

#[test]
fn test_infer() {
	let csv = r#"store,units,revenue
downtown,10,300.5
uptown,20,600.25
"#;
	let dataframe = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	assert_eq!(
		dataframe.columns,
		vec![
			Column::Unknown(UnknownColumn {
				name: "store".to_owned(),
				len: 2,
			}),
			Column::Number(NumberColumn {
				name: "units".to_owned(),
				data: vec![10.0, 20.0],
			}),
			Column::Number(NumberColumn {
				name: "revenue".to_owned(),
				data: vec![300.5, 600.25],
			}),
		],
	);
}

#[test]
fn test_invalid_values() {
	let csv = r#"price,units
1.5,3
?,4
NaN,5
"#;
	let dataframe = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	let price = dataframe.columns[0].as_number().unwrap();
	assert_eq!(price.data[0], 1.5);
	assert!(price.data[1].is_nan());
	assert!(price.data[2].is_nan());
	let units = dataframe.columns[1].as_number().unwrap();
	assert_eq!(units.data, vec![3.0, 4.0, 5.0]);
}
