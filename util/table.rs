/// A plain text table with a header row. Column widths are computed when the table is displayed.
#[derive(Debug)]
pub struct Table {
	header: Vec<String>,
	rows: Vec<Vec<String>>,
	padding: usize,
}

impl Table {
	pub fn new(header: Vec<String>) -> Self {
		Self {
			header,
			rows: Vec::new(),
			padding: 1,
		}
	}

	pub fn add_row(&mut self, row: Vec<String>) {
		self.rows.push(row);
	}
}

impl std::fmt::Display for Table {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let mut column_widths: Vec<usize> = self.header.iter().map(|value| value.len()).collect();
		for row in self.rows.iter() {
			for (column_width, value) in column_widths.iter_mut().zip(row.iter()) {
				*column_width = usize::max(*column_width, value.len());
			}
		}
		write_row(f, &self.header, &column_widths, self.padding)?;
		write!(f, "|")?;
		for column_width in column_widths.iter() {
			for _ in 0..column_width + 2 * self.padding {
				write!(f, "-")?;
			}
			write!(f, "|")?;
		}
		writeln!(f)?;
		for row in self.rows.iter() {
			write_row(f, row, &column_widths, self.padding)?;
		}
		Ok(())
	}
}

fn write_row(
	f: &mut std::fmt::Formatter,
	values: &[String],
	column_widths: &[usize],
	padding: usize,
) -> std::fmt::Result {
	write!(f, "|")?;
	for (column_width, value) in column_widths.iter().zip(values.iter()) {
		for _ in 0..padding {
			write!(f, " ")?;
		}
		write!(f, "{}", value)?;
		for _ in 0..column_width - value.len() + padding {
			write!(f, " ")?;
		}
		write!(f, "|")?;
	}
	writeln!(f)
}

#[test]
fn test_table() {
	let mut table = Table::new(vec!["model".to_owned(), "mse".to_owned()]);
	table.add_row(vec!["baseline".to_owned(), "4.0".to_owned()]);
	table.add_row(vec!["forest".to_owned(), "2.25".to_owned()]);
	let expected = "\
| model    | mse  |\n\
|----------|------|\n\
| baseline | 4.0  |\n\
| forest   | 2.25 |\n";
	assert_eq!(table.to_string(), expected);
}
