use std::path::Path;

use log::{debug, warn};
use proximity_divergence::{RawRecord, RecordId};

use crate::pipeline::config_reader::ColumnNames;
use crate::pipeline::io_common::{get_cell, Table};
use crate::pipeline::*;

/// Reads the records of a table of polling locations.
///
/// The coordinate and percentage columns are required. The address columns are
/// optional, and missing ones read as empty text. Nothing is validated here:
/// unreadable numbers are `None`, and every data row produces a record, with the
/// 1-based row position as its id.
pub fn read_geo_records(
    table: &Table,
    columns: &ColumnNames,
    path: &Path,
) -> PipelineResult<Vec<RawRecord>> {
    let lat_idx = table.require_column(&columns.latitude, path)?;
    let lon_idx = table.require_column(&columns.longitude, path)?;
    let pct_idx = table.require_column(&columns.percentage, path)?;
    let address_idxs: Vec<Option<usize>> = columns
        .address
        .iter()
        .map(|name| {
            let idx = table.column_index(name);
            if idx.is_none() {
                warn!(
                    "Missing address column {:?} in {}, using empty addresses",
                    name,
                    path.display()
                );
            }
            idx
        })
        .collect();
    debug!(
        "read_geo_records: lat: {} lon: {} pct: {} address: {:?}",
        lat_idx, lon_idx, pct_idx, address_idxs
    );

    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| RawRecord {
            id: RecordId(idx + 1),
            latitude: get_cell(row, lat_idx).as_f64(),
            longitude: get_cell(row, lon_idx).as_f64(),
            percentage: get_cell(row, pct_idx).as_f64(),
            address: [0, 1, 2].map(|i| {
                address_idxs[i]
                    .map(|c| get_cell(row, c).as_text().trim().to_string())
                    .unwrap_or_default()
            }),
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::io_common::Cell;

    fn header(names: &[&str]) -> Table {
        Table::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn rows_become_records_in_order() {
        let mut table = header(&[
            "address_1",
            "lat",
            "lng",
            "percentage",
            "address_2",
            "address_3",
        ]);
        table.rows.push(vec![
            Cell::text("School #1 "),
            Cell::Number(41.7151),
            Cell::Number(44.8271),
            Cell::Number(0.5),
            Cell::text("Tbilisi"),
            Cell::Number(12.0),
        ]);
        table.rows.push(vec![Cell::Empty, Cell::text("41.6"), Cell::text("n/a")]);

        let records =
            read_geo_records(&table, &ColumnNames::default(), Path::new("stations.xlsx")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RecordId(1));
        assert_eq!(records[0].latitude, Some(41.7151));
        assert_eq!(records[0].percentage, Some(0.5));
        assert_eq!(
            records[0].address,
            [
                "School #1".to_string(),
                "Tbilisi".to_string(),
                "12".to_string()
            ]
        );
        assert_eq!(records[1].id, RecordId(2));
        assert_eq!(records[1].latitude, Some(41.6));
        assert_eq!(records[1].longitude, None);
        assert_eq!(records[1].percentage, None);
        assert_eq!(records[1].address[0], "");
    }

    #[test]
    fn address_columns_are_optional() {
        let mut table = header(&["lat", "lng", "percentage"]);
        table
            .rows
            .push(vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(0.1)]);
        let records =
            read_geo_records(&table, &ColumnNames::default(), Path::new("stations.csv")).unwrap();
        assert_eq!(records[0].address, ["", "", ""].map(String::from));
    }

    #[test]
    fn coordinate_columns_are_required() {
        let table = header(&["lat", "percentage"]);
        let err =
            read_geo_records(&table, &ColumnNames::default(), Path::new("stations.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "lng"));
    }
}
