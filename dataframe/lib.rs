/*!
This crate provides a basic implementation of dataframes, which are two dimensional arrays of data where each column can have a different data type, like a spreadsheet. It is far more limited than Python's Pandas library, because it only implements the features needed to load the sales tables Tally trains on: a column either holds numbers or it holds values Tally does not understand.
*/

use itertools::izip;
use ndarray::prelude::*;

pub mod load;

pub use self::load::*;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrameView<'a> {
	pub columns: Vec<ColumnView<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Unknown(UnknownColumn),
	Number(NumberColumn),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumn {
	pub name: String,
	pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnView<'a> {
	Unknown(UnknownColumnView<'a>),
	Number(NumberColumnView<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumnView<'a> {
	pub name: &'a str,
	pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumnView<'a> {
	pub name: &'a str,
	pub data: &'a [f32],
}

#[derive(Debug, Clone)]
pub enum ColumnType {
	Unknown,
	Number,
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(column_name, column_type)| match column_type {
				ColumnType::Unknown => Column::Unknown(UnknownColumn::new(column_name)),
				ColumnType::Number => Column::Number(NumberColumn::new(column_name)),
			})
			.collect();
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn view(&self) -> DataFrameView {
		let columns = self.columns.iter().map(|column| column.view()).collect();
		DataFrameView { columns }
	}

	/// Materialize a new dataframe holding the rows whose indexes appear in `indices`, in `indices` order.
	pub fn select_rows(&self, indices: &[usize]) -> Self {
		let columns = self
			.columns
			.iter()
			.map(|column| match column {
				Column::Unknown(column) => Column::Unknown(UnknownColumn {
					name: column.name.clone(),
					len: indices.len(),
				}),
				Column::Number(column) => Column::Number(NumberColumn {
					name: column.name.clone(),
					data: indices.iter().map(|index| column.data[*index]).collect(),
				}),
			})
			.collect();
		Self { columns }
	}

	/// Drop every row that has a non-finite value in any number column. Returns the number of rows that were dropped.
	pub fn drop_incomplete_rows(&mut self) -> usize {
		let nrows = self.nrows();
		let mut keep = vec![true; nrows];
		for column in self.columns.iter() {
			if let Column::Number(column) = column {
				for (keep, value) in izip!(keep.iter_mut(), column.data.iter()) {
					if !value.is_finite() {
						*keep = false;
					}
				}
			}
		}
		let nrows_kept = keep.iter().filter(|keep| **keep).count();
		for column in self.columns.iter_mut() {
			match column {
				Column::Unknown(column) => {
					column.len = nrows_kept;
				}
				Column::Number(column) => {
					let mut keep = keep.iter();
					column.data.retain(|_| *keep.next().unwrap());
				}
			}
		}
		nrows - nrows_kept
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::Unknown(s) => s.len == 0,
			Self::Number(s) => s.data.is_empty(),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Unknown(s) => s.name.as_str(),
			Self::Number(s) => s.name.as_str(),
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn view(&self) -> ColumnView {
		match self {
			Self::Unknown(column) => ColumnView::Unknown(column.view()),
			Self::Number(column) => ColumnView::Number(column.view()),
		}
	}
}

impl UnknownColumn {
	pub fn new(name: String) -> Self {
		Self { name, len: 0 }
	}

	pub fn view(&self) -> UnknownColumnView {
		UnknownColumnView {
			name: &self.name,
			len: self.len,
		}
	}
}

impl NumberColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}

	pub fn view(&self) -> NumberColumnView {
		NumberColumnView {
			name: &self.name,
			data: &self.data,
		}
	}
}

impl<'a> DataFrameView<'a> {
	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn view(&self) -> Self {
		self.clone()
	}

	pub fn to_rows_f32(&self) -> Option<Array2<f32>> {
		let mut rows = unsafe { Array::uninitialized((self.nrows(), self.ncols())) };
		for (mut ndarray_column, dataframe_column) in
			izip!(rows.gencolumns_mut(), self.columns.iter())
		{
			match dataframe_column {
				ColumnView::Number(column) => {
					for (a, b) in izip!(ndarray_column.iter_mut(), column.data) {
						*a = *b;
					}
				}
				_ => return None,
			}
		}
		Some(rows)
	}
}

impl<'a> ColumnView<'a> {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::Unknown(s) => s.len == 0,
			Self::Number(s) => s.data.is_empty(),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Unknown(s) => s.name,
			Self::Number(s) => s.name,
		}
	}

	pub fn as_number(&self) -> Option<NumberColumnView> {
		match self {
			Self::Number(s) => Some(s.clone()),
			_ => None,
		}
	}

	pub fn view(&self) -> Self {
		match self {
			ColumnView::Unknown(s) => ColumnView::Unknown(s.view()),
			ColumnView::Number(s) => ColumnView::Number(s.view()),
		}
	}
}

impl<'a> UnknownColumnView<'a> {
	pub fn view(&self) -> Self {
		self.clone()
	}
}

impl<'a> NumberColumnView<'a> {
	pub fn view(&self) -> Self {
		self.clone()
	}
}

#[test]
fn test_select_rows() {
	let dataframe = DataFrame {
		columns: vec![Column::Number(NumberColumn {
			name: "units".to_owned(),
			data: vec![1.0, 2.0, 3.0, 4.0],
		})],
	};
	let selected = dataframe.select_rows(&[3, 1]);
	assert_eq!(
		selected.columns[0].as_number().unwrap().data,
		vec![4.0, 2.0]
	);
}

#[test]
fn test_drop_incomplete_rows() {
	let mut dataframe = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "price".to_owned(),
				data: vec![1.0, std::f32::NAN, 3.0],
			}),
			Column::Number(NumberColumn {
				name: "units".to_owned(),
				data: vec![4.0, 5.0, 6.0],
			}),
		],
	};
	let n_dropped = dataframe.drop_incomplete_rows();
	assert_eq!(n_dropped, 1);
	assert_eq!(dataframe.nrows(), 2);
	assert_eq!(dataframe.columns[0].as_number().unwrap().data, vec![1.0, 3.0]);
	assert_eq!(dataframe.columns[1].as_number().unwrap().data, vec![4.0, 6.0]);
}

#[test]
fn test_to_rows_f32() {
	let dataframe = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "price".to_owned(),
				data: vec![1.0, 2.0],
			}),
			Column::Number(NumberColumn {
				name: "units".to_owned(),
				data: vec![3.0, 4.0],
			}),
		],
	};
	let rows = dataframe.view().to_rows_f32().unwrap();
	assert_eq!(rows, arr2(&[[1.0, 3.0], [2.0, 4.0]]));
}
