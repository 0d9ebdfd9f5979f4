// Primitives for reading and writing Excel files.

use std::path::Path;

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::debug;
use rust_xlsxwriter::{Format, Workbook};
use snafu::prelude::*;

use crate::pipeline::{io_common::Cell, io_common::Table, *};

pub fn read_excel_table(path: &Path, worksheet: Option<&str>) -> PipelineResult<Table> {
    let wrange = get_range(path, worksheet)?;

    let mut iter = wrange.rows();
    let header_row = iter.next().context(EmptyTableSnafu { path })?;
    let header: Vec<String> = header_row
        .iter()
        .map(|c| read_cell_calamine(c).as_text())
        .collect();
    debug!("read_excel_table: header: {:?}", header);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        debug!("read_excel_table: idx: {:?} row: {:?}", idx, row);
        rows.push(row.iter().map(read_cell_calamine).collect());
    }
    Ok(Table { header, rows })
}

fn read_cell_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::String(s) => Cell::text(s),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::Empty => Cell::Empty,
        // Dates, durations and cell errors carry nothing this pipeline reads.
        _ => Cell::Empty,
    }
}

fn get_range(path: &Path, worksheet: Option<&str>) -> PipelineResult<Range<DataType>> {
    debug!(
        "read_excel_file: path: {:?} worksheet: {:?}",
        path, worksheet
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyWorkbookSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}

/// Writes the table to the first sheet of a new workbook, with a bold header row.
/// Empty cells are left blank.
pub fn write_excel_table(path: &Path, table: &Table) -> PipelineResult<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .context(WritingExcelSnafu { path })?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Number(x) => {
                    worksheet
                        .write_number(row_num, col as u16, *x)
                        .context(WritingExcelSnafu { path })?;
                }
                Cell::Text(s) => {
                    worksheet
                        .write_string(row_num, col as u16, s)
                        .context(WritingExcelSnafu { path })?;
                }
                Cell::Empty => {}
            }
        }
    }

    workbook.save(path).context(WritingExcelSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_survive_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.xlsx");

        let mut table = Table::new(vec![
            "lat".to_string(),
            "lng".to_string(),
            "address_1".to_string(),
        ]);
        table.rows.push(vec![
            Cell::Number(41.7151),
            Cell::Number(44.8271),
            Cell::Text("School #1".to_string()),
        ]);
        table
            .rows
            .push(vec![Cell::Number(42.2679), Cell::Empty, Cell::Text("Kutaisi".to_string())]);
        write_excel_table(&path, &table).unwrap();

        let back = read_excel_table(&path, None).unwrap();
        assert_eq!(back.header, table.header);
        assert_eq!(back.rows, table.rows);
    }

    #[test]
    fn named_worksheet_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.xlsx");
        write_excel_table(&path, &Table::new(vec!["lat".to_string()])).unwrap();

        let err = read_excel_table(&path, Some("Round 2")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingWorksheet { ref name, .. } if name == "Round 2"));
        // The default sheet name of a new workbook.
        assert!(read_excel_table(&path, Some("Sheet1")).is_ok());
    }

    #[test]
    fn header_only_workbook_has_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.xlsx");
        write_excel_table(&path, &Table::new(vec!["Address 1".to_string()])).unwrap();
        let back = read_excel_table(&path, None).unwrap();
        assert_eq!(back.header, vec!["Address 1".to_string()]);
        assert!(back.rows.is_empty());
    }
}
