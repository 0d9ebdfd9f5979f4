use log::{debug, info, warn};

use proximity_divergence::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub mod config_reader;
pub mod coords;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod io_pairs;
pub mod io_records;
pub mod map_html;
pub mod map_model;

use crate::pipeline::config_reader::ColumnNames;
use crate::pipeline::io_common::{ensure_exists, read_table, write_table};
use crate::pipeline::io_pairs::{pairs_to_table, parse_pair_table};
use crate::pipeline::io_records::read_geo_records;
use crate::pipeline::map_html::write_map_html;
use crate::pipeline::map_model::{build_map_view, MapSettings, PercentageIndex};

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Could not find the {} file at: {}", description, path.display()))]
    InputNotFound {
        description: &'static str,
        path: PathBuf,
    },
    #[snafu(display(
        "Unsupported file format for {} (expected .xlsx, .xlsm or .csv)",
        path.display()
    ))]
    UnsupportedFormat { path: PathBuf },
    #[snafu(display("Error opening file {}", path.display()))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: PathBuf,
    },
    #[snafu(display("Could not find the worksheet {:?} in {}", name, path.display()))]
    MissingWorksheet { name: String, path: PathBuf },
    #[snafu(display("The file {} does not contain any worksheet", path.display()))]
    EmptyWorkbook { path: PathBuf },
    #[snafu(display("The table in {} does not have a header row", path.display()))]
    EmptyTable { path: PathBuf },
    #[snafu(display("Error reading file {}", path.display()))]
    ReadingCsv { source: csv::Error, path: PathBuf },
    #[snafu(display("Error writing file {}", path.display()))]
    WritingCsv { source: csv::Error, path: PathBuf },
    #[snafu(display("Error writing file {}", path.display()))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: PathBuf,
    },
    #[snafu(display("Error writing file {}", path.display()))]
    WritingHtml {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Could not locate the directory of the running program"))]
    LocatingExecutable { source: std::io::Error },
    #[snafu(display("Error opening file {}", path.display()))]
    OpeningJson {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error parsing the configuration file {}", path.display()))]
    ParsingJson {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[snafu(display("Error serializing the map data"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Missing column {:?} in {}", column, path.display()))]
    MissingColumn { column: String, path: PathBuf },
    #[snafu(display("Invalid thresholds"))]
    InvalidThresholds { source: DetectionErrors },
    #[snafu(display("No valid coordinate pairs found after parsing"))]
    NoValidPairs {},
    #[snafu(display("No valid coordinates found to create the map"))]
    NoValidCoordinates {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything the detection stage needs to run.
#[derive(PartialEq, Debug, Clone)]
pub struct DetectSettings {
    pub records_path: PathBuf,
    pub pairs_path: PathBuf,
    pub worksheet: Option<String>,
    pub columns: ColumnNames,
    pub thresholds: Thresholds,
}

/// Everything the map stage needs to run.
#[derive(PartialEq, Debug, Clone)]
pub struct RenderSettings {
    pub pairs_path: PathBuf,
    pub records_path: PathBuf,
    pub map_path: PathBuf,
    /// Worksheet of the records file. The pairs file is always read from its first sheet.
    pub worksheet: Option<String>,
    pub columns: ColumnNames,
    pub map: MapSettings,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DetectionReport {
    pub records_read: usize,
    pub records_rejected: usize,
    pub pairs_evaluated: u64,
    pub pairs_flagged: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RenderReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub pairs_rendered: usize,
    pub markers: usize,
    pub lines: usize,
    /// Markers for which no original percentage was found.
    pub unmatched_markers: usize,
}

fn log_rejections(path: &Path, report: &ValidationReport) {
    for (field, count) in report.rejection_counts() {
        warn!(
            "{}: {} rows rejected because of their {} value",
            path.display(),
            count,
            field
        );
    }
}

fn read_validated_records(
    path: &Path,
    worksheet: Option<&str>,
    columns: &ColumnNames,
) -> PipelineResult<(usize, ValidationReport)> {
    let table = read_table(path, worksheet)?;
    info!(
        "Processing {} rows of data from {}",
        table.rows.len(),
        path.display()
    );
    debug!("Column names in {}: {:?}", path.display(), table.header);
    let raw = read_geo_records(&table, columns, path)?;
    let report = validate_records(&raw);
    log_rejections(path, &report);
    Ok((raw.len(), report))
}

/// Runs the first stage: reads the records, flags the close pairs with divergent
/// percentages and writes them to the pair table.
pub fn run_detection(settings: &DetectSettings) -> PipelineResult<DetectionReport> {
    info!("run_detection: settings: {:?}", settings);
    ensure_exists(&settings.records_path, "input")?;

    let (records_read, validation) = read_validated_records(
        &settings.records_path,
        settings.worksheet.as_deref(),
        &settings.columns,
    )?;

    let detection = find_close_pairs(&validation.records, &settings.thresholds)
        .context(InvalidThresholdsSnafu {})?;

    let table = pairs_to_table(&detection.pairs);
    write_table(&settings.pairs_path, &table)?;
    println!("Results saved to {}", settings.pairs_path.display());

    Ok(DetectionReport {
        records_read,
        records_rejected: validation.rejections.len(),
        pairs_evaluated: detection.pairs_evaluated,
        pairs_flagged: detection.pairs.len(),
    })
}

/// Runs the second stage: reads the pair table back, joins it to the original
/// percentages and writes the HTML map.
pub fn run_render(settings: &RenderSettings) -> PipelineResult<RenderReport> {
    info!("run_render: settings: {:?}", settings);
    ensure_exists(&settings.pairs_path, "address pairs")?;
    ensure_exists(&settings.records_path, "percentage")?;

    let pairs_table = read_table(&settings.pairs_path, None)?;
    info!(
        "Processing {} rows of data from address pairs...",
        pairs_table.rows.len()
    );
    info!(
        "Column names in the address pairs file: {:?}",
        pairs_table.header
    );

    let parsed = parse_pair_table(&pairs_table, &settings.pairs_path)?;
    info!(
        "Successfully parsed coordinates for {} rows",
        parsed.pairs.len()
    );

    let (_, validation) = read_validated_records(
        &settings.records_path,
        settings.worksheet.as_deref(),
        &settings.columns,
    )?;
    let index = PercentageIndex::new(&validation.records);

    let view = build_map_view(&parsed.pairs, &index, &settings.map)?;
    let unmatched_markers = view.markers.iter().filter(|m| !m.matched).count();
    if unmatched_markers > 0 {
        warn!(
            "{} markers have no matching record in {}",
            unmatched_markers,
            settings.records_path.display()
        );
    }

    write_map_html(&settings.map_path, &view)?;
    println!(
        "Map visualization saved to {}",
        settings.map_path.display()
    );
    println!("Total pairs visualized: {}", parsed.pairs.len());

    Ok(RenderReport {
        rows_read: pairs_table.rows.len(),
        rows_dropped: parsed.rejected.len(),
        pairs_rendered: parsed.pairs.len(),
        markers: view.markers.len(),
        lines: view.connectors.len(),
        unmatched_markers,
    })
}

/// Writes the error and the chain of its causes.
pub fn write_error_details<W: Write>(e: &PipelineError, out: &mut W) -> io::Result<()> {
    writeln!(out, "An error occurred: {}", e)?;
    writeln!(out, "\nDetailed error information:")?;
    for (depth, cause) in ErrorCompat::iter_chain(e).enumerate() {
        writeln!(out, "  {}: {}", depth, cause)?;
    }
    Ok(())
}

pub fn print_error_details(e: &PipelineError) {
    let _ = write_error_details(e, &mut io::stderr().lock());
}

/// Best effort: writes the shape of a table to help debugging a failed run. A
/// table that cannot be read is reported in the output, not as an error.
pub fn write_table_overview<W: Write>(path: &Path, out: &mut W) -> io::Result<()> {
    match read_table(path, None) {
        Ok(table) => {
            writeln!(out, "\nData overview:")?;
            writeln!(out, "Total rows: {}", table.rows.len())?;
            writeln!(out, "\nColumn names:")?;
            writeln!(out, "{:?}", table.header)?;
        }
        Err(e) => {
            writeln!(out, "Could not read {} for debugging: {}", path.display(), e)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::io_common::{Cell, Table};

    fn overview(path: &Path) -> String {
        let mut out: Vec<u8> = Vec::new();
        write_table_overview(path, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn error_details_list_every_cause() {
        let err = crate::pipeline::config_reader::read_config(Path::new("/no/such/polldiff.json"))
            .unwrap_err();
        let mut out: Vec<u8> = Vec::new();
        write_error_details(&err, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(
            text.starts_with("An error occurred: Error opening file /no/such/polldiff.json"),
            "{}",
            text
        );
        assert!(text.contains("  0: Error opening file /no/such/polldiff.json"), "{}", text);
        // The io error underneath.
        assert!(text.contains("  1: "), "{}", text);
        assert!(!text.contains("trace"), "{}", text);
    }

    #[test]
    fn overview_of_a_readable_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let mut table = Table::new(vec!["Address 1".to_string(), "Distance (km)".to_string()]);
        table.rows.push(vec![Cell::text("(40, 44)"), Cell::Number(0.5)]);
        table.rows.push(vec![Cell::text("(41, 45)"), Cell::Number(0.7)]);
        write_table(&path, &table).unwrap();

        let text = overview(&path);
        assert!(text.contains("Total rows: 2"), "{}", text);
        assert!(text.contains(r#"["Address 1", "Distance (km)"]"#), "{}", text);
    }

    #[test]
    fn overview_of_an_unreadable_table() {
        let text = overview(Path::new("/no/such/dir/pairs.xlsx"));
        assert!(
            text.starts_with("Could not read /no/such/dir/pairs.xlsx for debugging: "),
            "{}",
            text
        );

        let text = overview(Path::new("pairs.ods"));
        assert!(text.starts_with("Could not read pairs.ods for debugging: "), "{}", text);
    }
}
