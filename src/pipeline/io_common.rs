use std::path::Path;

use log::debug;
use snafu::prelude::*;

use crate::pipeline::*;

/// A cell of a table, as read from a spreadsheet or a CSV file.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    /// The numeric value. Text cells are parsed, so "41.5" and 41.5 read the same.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(x) => x.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => "".to_string(),
        }
    }
}

/// A header followed by data rows. Rows may be shorter than the header.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Table {
        Table {
            header,
            rows: Vec::new(),
        }
    }

    /// Position of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str, path: &Path) -> PipelineResult<usize> {
        self.column_index(name)
            .context(MissingColumnSnafu { column: name, path })
    }
}

/// The cell at the given position, or an empty cell past the end of the row.
pub fn get_cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum TableFormat {
    Excel,
    Csv,
}

fn table_format(path: &Path) -> PipelineResult<TableFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(TableFormat::Excel),
        Some("csv") => Ok(TableFormat::Csv),
        _ => UnsupportedFormatSnafu { path }.fail(),
    }
}

/// Reads a table, picking the reader from the file extension.
///
/// `worksheet` only applies to spreadsheets. Without it, the first sheet is read.
pub fn read_table(path: &Path, worksheet: Option<&str>) -> PipelineResult<Table> {
    debug!("read_table: path: {:?} worksheet: {:?}", path, worksheet);
    let table = match table_format(path)? {
        TableFormat::Excel => io_excel::read_excel_table(path, worksheet)?,
        TableFormat::Csv => io_csv::read_csv_table(path)?,
    };
    debug!(
        "read_table: path: {:?} header: {:?} rows: {}",
        path,
        table.header,
        table.rows.len()
    );
    Ok(table)
}

pub fn write_table(path: &Path, table: &Table) -> PipelineResult<()> {
    debug!(
        "write_table: path: {:?} rows: {}",
        path,
        table.rows.len()
    );
    match table_format(path)? {
        TableFormat::Excel => io_excel::write_excel_table(path, table),
        TableFormat::Csv => io_csv::write_csv_table(path, table),
    }
}

pub fn ensure_exists(path: &Path, description: &'static str) -> PipelineResult<()> {
    ensure!(
        path.exists(),
        InputNotFoundSnafu {
            description,
            path: path.to_path_buf(),
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn numbers_can_be_stored_as_text() {
        assert_eq!(Cell::Number(41.5).as_f64(), Some(41.5));
        assert_eq!(Cell::Text(" 41.5 ".to_string()).as_f64(), Some(41.5));
        assert_eq!(Cell::Text("n/a".to_string()).as_f64(), None);
        assert_eq!(Cell::Empty.as_f64(), None);
        assert_eq!(Cell::Number(12.0).as_text(), "12");
        assert_eq!(Cell::text(""), Cell::Empty);
    }

    #[test]
    fn short_rows_read_as_empty() {
        let row = vec![Cell::Number(1.0)];
        assert_eq!(get_cell(&row, 0), &Cell::Number(1.0));
        assert_eq!(get_cell(&row, 5), &Cell::Empty);
    }

    #[test]
    fn missing_columns_are_named() {
        let table = Table::new(vec!["lat".to_string(), "lng".to_string()]);
        assert_eq!(table.column_index("lng"), Some(1));
        let err = table
            .require_column("percentage", Path::new("stations.xlsx"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "percentage"));
    }

    #[test]
    fn formats_come_from_the_extension() {
        assert_eq!(
            table_format(Path::new("a/b/pairs.XLSX")).unwrap(),
            TableFormat::Excel
        );
        assert_eq!(table_format(Path::new("pairs.csv")).unwrap(), TableFormat::Csv);
        assert!(matches!(
            table_format(Path::new("pairs.ods")),
            Err(PipelineError::UnsupportedFormat { .. })
        ));
        assert!(table_format(Path::new("pairs")).is_err());
    }

    #[test]
    fn missing_inputs_are_reported_with_their_path() {
        let path = PathBuf::from("/definitely/not/here/stations.xlsx");
        let err = ensure_exists(&path, "percentage").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("percentage file"), "{}", msg);
        assert!(msg.contains("/definitely/not/here/stations.xlsx"), "{}", msg);
    }
}
