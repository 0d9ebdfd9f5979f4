// Primitives for reading and writing CSV files.

use std::path::Path;

use log::debug;
use snafu::prelude::*;

use crate::pipeline::{io_common::Cell, io_common::Table, *};

/// Reads a CSV file with a header line. All the values are kept as text, and
/// empty fields become empty cells.
pub fn read_csv_table(path: &Path) -> PipelineResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(ReadingCsvSnafu { path })?;

    let header: Vec<String> = rdr
        .headers()
        .context(ReadingCsvSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_csv_table: header: {:?}", header);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r.context(ReadingCsvSnafu { path })?;
        debug!("read_csv_table: lineno: {:?} row: {:?}", idx + 2, line);
        rows.push(line.iter().map(Cell::text).collect());
    }
    Ok(Table { header, rows })
}

/// Numbers are written in their shortest exact form, so reading them back gives
/// the same values.
pub fn write_csv_table(path: &Path, table: &Table) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    wtr.write_record(&table.header)
        .context(WritingCsvSnafu { path })?;
    for row in table.rows.iter() {
        let fields: Vec<String> = row.iter().map(|c| c.as_text()).collect();
        wtr.write_record(&fields)
            .context(WritingCsvSnafu { path })?;
    }
    wtr.flush()
        .map_err(csv::Error::from)
        .context(WritingCsvSnafu { path })?;
    Ok(())
}
