use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::args::{DetectArgs, RenderArgs};
use crate::pipeline::map_model::{MapSettings, DEFAULT_LAYER_NAME, DEFAULT_ZOOM};
use crate::pipeline::*;

pub const DEFAULT_RECORDS_PATH: &str = "2024_parliamentary_round_1_proportional_electronic.xlsx";
pub const DEFAULT_PAIRS_PATH: &str = "close_address_pairs_with_high_percentage_difference.xlsx";
pub const DEFAULT_MAP_PATH: &str = "map.html";

/// Highest zoom level served by the map tiles.
pub const MAX_ZOOM: u8 = 19;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(rename = "latitude")]
    pub latitude: Option<String>,
    #[serde(rename = "longitude")]
    pub longitude: Option<String>,
    #[serde(rename = "percentage")]
    pub percentage: Option<String>,
    #[serde(rename = "address")]
    pub address: Option<Vec<String>>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(rename = "zoom")]
    pub zoom: Option<u8>,
    #[serde(rename = "layerName")]
    pub layer_name: Option<String>,
}

/// The content of the JSON configuration file. Every key is optional.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "recordsPath")]
    pub records_path: Option<String>,
    #[serde(rename = "pairsPath")]
    pub pairs_path: Option<String>,
    #[serde(rename = "mapPath")]
    pub map_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "proximityThresholdKm")]
    pub proximity_threshold_km: Option<f64>,
    #[serde(rename = "percentageDiffThreshold")]
    pub percentage_diff_threshold: Option<f64>,
    #[serde(rename = "columns")]
    pub columns: Option<ColumnsConfig>,
    #[serde(rename = "map")]
    pub map: Option<MapConfig>,
}

/// The names of the columns of the records table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnNames {
    pub latitude: String,
    pub longitude: String,
    pub percentage: String,
    pub address: [String; 3],
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            latitude: "lat".to_string(),
            longitude: "lng".to_string(),
            percentage: "percentage".to_string(),
            address: [
                "address_1".to_string(),
                "address_2".to_string(),
                "address_3".to_string(),
            ],
        }
    }
}

pub fn read_config(path: &Path) -> PipelineResult<PipelineConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let config: PipelineConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

// The configuration, and the directory its relative paths are resolved against.
fn load_config(config_path: &Option<String>) -> PipelineResult<(PipelineConfig, PathBuf)> {
    match config_path {
        None => Ok((PipelineConfig::default(), PathBuf::new())),
        Some(p) => {
            let path = Path::new(p);
            let config = read_config(path)?;
            debug!("config: {:?}", config);
            let root = path.parent().map(|d| d.to_path_buf()).unwrap_or_default();
            Ok((config, root))
        }
    }
}

/// The directory of the running program. The default files are looked up there.
pub fn default_dir() -> PipelineResult<PathBuf> {
    let exe = env::current_exe().context(LocatingExecutableSnafu {})?;
    Ok(exe.parent().map(|d| d.to_path_buf()).unwrap_or_default())
}

/// The command line wins over the configuration file, which wins over the default.
fn pick_path(
    cli: &Option<String>,
    file: &Option<String>,
    root: &Path,
    default: &str,
) -> PipelineResult<PathBuf> {
    match (cli, file) {
        (Some(p), _) => Ok(PathBuf::from(p)),
        (None, Some(p)) => Ok(root.join(p)),
        (None, None) => Ok(default_dir()?.join(default)),
    }
}

fn column_names(config: &Option<ColumnsConfig>) -> PipelineResult<ColumnNames> {
    let defaults = ColumnNames::default();
    let c = match config {
        Some(c) => c,
        None => return Ok(defaults),
    };
    let address = match &c.address {
        None => defaults.address,
        Some(names) => match names.as_slice() {
            [a1, a2, a3] => [a1.clone(), a2.clone(), a3.clone()],
            _ => whatever!(
                "columns.address must list exactly 3 column names, found {}",
                names.len()
            ),
        },
    };
    Ok(ColumnNames {
        latitude: c.latitude.clone().unwrap_or(defaults.latitude),
        longitude: c.longitude.clone().unwrap_or(defaults.longitude),
        percentage: c.percentage.clone().unwrap_or(defaults.percentage),
        address,
    })
}

pub fn detect_settings(args: &DetectArgs) -> PipelineResult<DetectSettings> {
    let (config, root) = load_config(&args.config)?;

    let thresholds = Thresholds {
        proximity_threshold_km: args
            .proximity_km
            .or(config.proximity_threshold_km)
            .unwrap_or(Thresholds::DEFAULT.proximity_threshold_km),
        percentage_diff_threshold: args
            .min_percentage_diff
            .or(config.percentage_diff_threshold)
            .unwrap_or(Thresholds::DEFAULT.percentage_diff_threshold),
    };
    thresholds.check().context(InvalidThresholdsSnafu {})?;

    Ok(DetectSettings {
        records_path: pick_path(&args.input, &config.records_path, &root, DEFAULT_RECORDS_PATH)?,
        pairs_path: pick_path(&args.out, &config.pairs_path, &root, DEFAULT_PAIRS_PATH)?,
        worksheet: args
            .excel_worksheet_name
            .clone()
            .or(config.excel_worksheet_name),
        columns: column_names(&config.columns)?,
        thresholds,
    })
}

pub fn render_settings(args: &RenderArgs) -> PipelineResult<RenderSettings> {
    let (config, root) = load_config(&args.config)?;
    let map_config = config.map.clone().unwrap_or_default();

    let zoom = args.zoom.or(map_config.zoom).unwrap_or(DEFAULT_ZOOM);
    if zoom > MAX_ZOOM {
        whatever!("zoom must be between 0 and {}, found {}", MAX_ZOOM, zoom);
    }

    Ok(RenderSettings {
        pairs_path: pick_path(&args.pairs, &config.pairs_path, &root, DEFAULT_PAIRS_PATH)?,
        records_path: pick_path(&args.records, &config.records_path, &root, DEFAULT_RECORDS_PATH)?,
        map_path: pick_path(&args.out, &config.map_path, &root, DEFAULT_MAP_PATH)?,
        worksheet: args
            .excel_worksheet_name
            .clone()
            .or(config.excel_worksheet_name),
        columns: column_names(&config.columns)?,
        map: MapSettings {
            zoom,
            layer_name: map_config
                .layer_name
                .unwrap_or_else(|| DEFAULT_LAYER_NAME.to_string()),
        },
    })
}
