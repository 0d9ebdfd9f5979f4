// The pair table written by the detector and read back by the map stage.

use std::path::Path;

use log::{debug, warn};
use proximity_divergence::{CandidatePair, Coordinates, PairEndpoint, RecordId};
use snafu::prelude::*;

use crate::pipeline::coords::{format_coordinates, parse_coordinates, CoordinateParseError};
use crate::pipeline::io_common::{get_cell, Cell, Table};
use crate::pipeline::*;

pub const ADDRESS_1: &str = "Address 1";
pub const ADDRESS_2: &str = "Address 2";
pub const DISTANCE: &str = "Distance (km)";
pub const PERCENTAGE_DIFF: &str = "Percentage Difference (%)";
pub const PERCENTAGE_1: &str = "Percentage 1";
pub const PERCENTAGE_2: &str = "Percentage 2";
pub const RECORD_1_ID: &str = "Record 1 ID";
pub const RECORD_2_ID: &str = "Record 2 ID";
pub const ADDR1_LAT: &str = "addr1_lat";
pub const ADDR1_LON: &str = "addr1_lon";
pub const ADDR2_LAT: &str = "addr2_lat";
pub const ADDR2_LON: &str = "addr2_lon";
pub const SCHEMA_VERSION_COLUMN: &str = "Schema Version";

/// Version of the pair table written by this crate. Tables without the
/// version column are version 1 and only carry the text coordinates.
pub const SCHEMA_VERSION: u32 = 2;

pub const PAIR_COLUMNS: [&str; 19] = [
    ADDRESS_1,
    ADDRESS_2,
    DISTANCE,
    PERCENTAGE_DIFF,
    PERCENTAGE_1,
    PERCENTAGE_2,
    "Address 1 - Part 1",
    "Address 1 - Part 2",
    "Address 1 - Part 3",
    "Address 2 - Part 1",
    "Address 2 - Part 2",
    "Address 2 - Part 3",
    RECORD_1_ID,
    RECORD_2_ID,
    ADDR1_LAT,
    ADDR1_LON,
    ADDR2_LAT,
    ADDR2_LON,
    SCHEMA_VERSION_COLUMN,
];

fn address_cells(endpoint: &PairEndpoint) -> [Cell; 3] {
    [0, 1, 2].map(|i| Cell::text(&endpoint.address[i]))
}

pub fn pairs_to_table(pairs: &[CandidatePair]) -> Table {
    let mut table = Table::new(PAIR_COLUMNS.iter().map(|s| s.to_string()).collect());
    for pair in pairs.iter() {
        let (a, b) = (&pair.first, &pair.second);
        let mut row = vec![
            Cell::Text(format_coordinates(&a.coordinates)),
            Cell::Text(format_coordinates(&b.coordinates)),
            Cell::Number(pair.distance_km),
            Cell::Number(pair.percentage_diff),
            Cell::Number(a.percentage_points),
            Cell::Number(b.percentage_points),
        ];
        row.extend(address_cells(a));
        row.extend(address_cells(b));
        row.extend([
            Cell::Number(a.id.0 as f64),
            Cell::Number(b.id.0 as f64),
            Cell::Number(a.coordinates.latitude),
            Cell::Number(a.coordinates.longitude),
            Cell::Number(b.coordinates.latitude),
            Cell::Number(b.coordinates.longitude),
            Cell::Number(SCHEMA_VERSION as f64),
        ]);
        table.rows.push(row);
    }
    table
}

/// One side of a pair, as read back from the table.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PairRowEndpoint {
    /// Only present in version 2 tables.
    pub id: Option<RecordId>,
    pub coordinates: Coordinates,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PairRow {
    /// 1-based position of the row in the table, header excluded.
    pub row: usize,
    pub first: PairRowEndpoint,
    pub second: PairRowEndpoint,
    pub distance_km: f64,
    pub percentage_diff: f64,
}

#[derive(Debug, Snafu, PartialEq)]
pub enum RowError {
    #[snafu(display("Error parsing coordinates: {}: {}", text, source))]
    BadCoordinates {
        text: String,
        source: CoordinateParseError,
    },
    #[snafu(display("missing value in column {:?}", column))]
    MissingValue { column: &'static str },
}

/// A row of the pair table that was dropped.
#[derive(PartialEq, Debug)]
pub struct RowRejection {
    pub row: usize,
    pub reason: RowError,
}

#[derive(PartialEq, Debug)]
pub struct ParsedPairTable {
    pub schema_version: u32,
    pub pairs: Vec<PairRow>,
    pub rejected: Vec<RowRejection>,
}

// Where the columns of one endpoint live in the table.
struct EndpointColumns {
    text_name: &'static str,
    text: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    id: Option<usize>,
}

impl EndpointColumns {
    fn locate(
        table: &Table,
        text_name: &'static str,
        lat: &str,
        lon: &str,
        id: &str,
        path: &Path,
    ) -> PipelineResult<EndpointColumns> {
        let cols = EndpointColumns {
            text_name,
            text: table.column_index(text_name),
            latitude: table.column_index(lat),
            longitude: table.column_index(lon),
            id: table.column_index(id),
        };
        let has_numeric = cols.latitude.is_some() && cols.longitude.is_some();
        if !has_numeric && cols.text.is_none() {
            return MissingColumnSnafu {
                column: text_name,
                path,
            }
            .fail();
        }
        Ok(cols)
    }

    fn read(&self, row: &[Cell]) -> Result<PairRowEndpoint, RowError> {
        let id = self
            .id
            .and_then(|idx| get_cell(row, idx).as_f64())
            .filter(|x| x.fract() == 0.0 && *x >= 1.0)
            .map(|x| RecordId(x as usize));

        let numeric = match (self.latitude, self.longitude) {
            (Some(lat_idx), Some(lon_idx)) => {
                match (get_cell(row, lat_idx).as_f64(), get_cell(row, lon_idx).as_f64()) {
                    (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                        Some(Coordinates::new(lat, lon))
                    }
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(coordinates) = numeric {
            return Ok(PairRowEndpoint { id, coordinates });
        }

        let text = self
            .text
            .map(|idx| get_cell(row, idx).as_text())
            .unwrap_or_default();
        ensure!(
            !text.trim().is_empty(),
            MissingValueSnafu {
                column: self.text_name
            }
        );
        let coordinates = parse_coordinates(&text).context(BadCoordinatesSnafu { text })?;
        Ok(PairRowEndpoint { id, coordinates })
    }
}

fn read_number(row: &[Cell], idx: usize, column: &'static str) -> Result<f64, RowError> {
    get_cell(row, idx)
        .as_f64()
        .context(MissingValueSnafu { column })
}

/// Reads the pair table back. Rows that cannot be used are dropped with a
/// warning and reported in `rejected`. A missing column fails the whole table.
pub fn parse_pair_table(table: &Table, path: &Path) -> PipelineResult<ParsedPairTable> {
    let distance_idx = table.require_column(DISTANCE, path)?;
    let diff_idx = table.require_column(PERCENTAGE_DIFF, path)?;
    let first_cols =
        EndpointColumns::locate(table, ADDRESS_1, ADDR1_LAT, ADDR1_LON, RECORD_1_ID, path)?;
    let second_cols =
        EndpointColumns::locate(table, ADDRESS_2, ADDR2_LAT, ADDR2_LON, RECORD_2_ID, path)?;

    let schema_version = match table.column_index(SCHEMA_VERSION_COLUMN) {
        None => 1,
        Some(idx) => table
            .rows
            .iter()
            .find_map(|row| get_cell(row, idx).as_f64())
            .map(|v| v as u32)
            .unwrap_or(SCHEMA_VERSION),
    };
    debug!(
        "parse_pair_table: path: {:?} schema_version: {}",
        path, schema_version
    );

    let mut pairs: Vec<PairRow> = Vec::new();
    let mut rejected: Vec<RowRejection> = Vec::new();
    for (idx, cells) in table.rows.iter().enumerate() {
        let row = idx + 1;
        let parsed = (|| -> Result<PairRow, RowError> {
            Ok(PairRow {
                row,
                first: first_cols.read(cells)?,
                second: second_cols.read(cells)?,
                distance_km: read_number(cells, distance_idx, DISTANCE)?,
                percentage_diff: read_number(cells, diff_idx, PERCENTAGE_DIFF)?,
            })
        })();
        match parsed {
            Ok(pair) => pairs.push(pair),
            Err(reason) => {
                warn!("row {}: {}", row, reason);
                rejected.push(RowRejection { row, reason });
            }
        }
    }

    Ok(ParsedPairTable {
        schema_version,
        pairs,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(id: usize, lat: f64, lon: f64, pct: f64) -> PairEndpoint {
        PairEndpoint {
            id: RecordId(id),
            coordinates: Coordinates::new(lat, lon),
            percentage_points: pct,
            address: [
                format!("School {}", id),
                "".to_string(),
                "Tbilisi".to_string(),
            ],
        }
    }

    fn sample_pair() -> CandidatePair {
        CandidatePair {
            first: endpoint(1, 40.0, 44.0, 50.0),
            second: endpoint(4, 40.005, 44.0, 20.0),
            distance_km: 0.555_974_6,
            percentage_diff: 30.000_000_000_000_004,
        }
    }

    fn legacy_table(rows: Vec<(&str, &str)>) -> Table {
        let mut table = Table::new(
            [ADDRESS_1, ADDRESS_2, DISTANCE, PERCENTAGE_DIFF]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for (a, b) in rows {
            table.rows.push(vec![
                Cell::text(a),
                Cell::text(b),
                Cell::Number(0.5),
                Cell::Number(25.0),
            ]);
        }
        table
    }

    #[test]
    fn pair_rows_have_the_full_schema() {
        let table = pairs_to_table(&[sample_pair()]);
        assert_eq!(table.header.len(), 19);
        assert_eq!(table.header[12], RECORD_1_ID);
        let row = &table.rows[0];
        assert_eq!(row[0], Cell::Text("(40, 44)".to_string()));
        assert_eq!(row[1], Cell::Text("(40.005, 44)".to_string()));
        assert_eq!(row[4], Cell::Number(50.0));
        assert_eq!(row[6], Cell::Text("School 1".to_string()));
        assert_eq!(row[7], Cell::Empty);
        assert_eq!(row[13], Cell::Number(4.0));
        assert_eq!(row[16], Cell::Number(40.005));
        assert_eq!(row[18], Cell::Number(2.0));
    }

    #[test]
    fn written_pairs_are_read_back() {
        let pair = sample_pair();
        let table = pairs_to_table(&[pair.clone()]);
        let parsed = parse_pair_table(&table, Path::new("pairs.xlsx")).unwrap();
        assert_eq!(parsed.schema_version, 2);
        assert!(parsed.rejected.is_empty());
        let row = &parsed.pairs[0];
        assert_eq!(row.row, 1);
        assert_eq!(row.first.id, Some(RecordId(1)));
        assert_eq!(row.second.coordinates, pair.second.coordinates);
        assert_eq!(row.distance_km, pair.distance_km);
        assert_eq!(row.percentage_diff, pair.percentage_diff);
    }

    #[test]
    fn numeric_columns_win_over_the_text() {
        let mut table = pairs_to_table(&[sample_pair()]);
        table.rows[0][0] = Cell::Text("garbage".to_string());
        let parsed = parse_pair_table(&table, Path::new("pairs.xlsx")).unwrap();
        assert_eq!(parsed.pairs.len(), 1);
        assert_eq!(parsed.pairs[0].first.coordinates, Coordinates::new(40.0, 44.0));

        // Without usable numbers, the text is used.
        table.rows[0][0] = Cell::Text("(41.5, 44.5)".to_string());
        table.rows[0][14] = Cell::Empty;
        let parsed = parse_pair_table(&table, Path::new("pairs.xlsx")).unwrap();
        assert_eq!(parsed.pairs[0].first.coordinates, Coordinates::new(41.5, 44.5));
    }

    #[test]
    fn legacy_tables_parse_the_text() {
        let table = legacy_table(vec![
            ("(np.float64(41.7), np.float64(44.8))", "(41.701, 44.8)"),
            ("(41.7, 44.8)", "not a coordinate"),
            ("", "(41.7, 44.8)"),
        ]);
        let parsed = parse_pair_table(&table, Path::new("pairs.csv")).unwrap();
        assert_eq!(parsed.schema_version, 1);
        assert_eq!(parsed.pairs.len(), 1);
        assert_eq!(parsed.pairs[0].first.id, None);
        assert_eq!(parsed.pairs[0].first.coordinates, Coordinates::new(41.7, 44.8));

        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(parsed.rejected[0].row, 2);
        assert!(matches!(
            parsed.rejected[0].reason,
            RowError::BadCoordinates { ref text, .. } if text == "not a coordinate"
        ));
        assert_eq!(
            parsed.rejected[1].reason,
            RowError::MissingValue { column: ADDRESS_1 }
        );
        assert!(parsed.rejected[0]
            .reason
            .to_string()
            .starts_with("Error parsing coordinates: not a coordinate: "));
    }

    #[test]
    fn missing_columns_fail_the_table() {
        let table = Table::new(vec![ADDRESS_1.to_string(), ADDRESS_2.to_string()]);
        let err = parse_pair_table(&table, Path::new("pairs.xlsx")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == DISTANCE));

        let table = Table::new(
            [ADDRESS_1, DISTANCE, PERCENTAGE_DIFF]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let err = parse_pair_table(&table, Path::new("pairs.xlsx")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == ADDRESS_2));
    }
}
