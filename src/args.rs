use clap::Parser;

/// Finds polling locations that are close to each other but report very different
/// results, and writes them to a pair table.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct DetectArgs {
    /// (file path, optional) A JSON configuration file. Paths in the file are relative
    /// to the file itself. Command line options override the values of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, .xlsx or .csv) The table of polling locations, with their coordinates
    /// and percentages.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, .xlsx or .csv) Where the pair table is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (default 1.0) Two locations at most this far apart, in kilometers, are close.
    #[clap(long, value_parser)]
    pub proximity_km: Option<f64>,

    /// (default 10.0) The smallest difference between the two percentages, in percentage
    /// points, for a pair to be flagged.
    #[clap(long, value_parser)]
    pub min_percentage_diff: Option<f64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

/// Draws the pairs flagged by polldiff-detect on an interactive HTML map.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct RenderArgs {
    /// (file path, optional) A JSON configuration file, shared with polldiff-detect.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, .xlsx or .csv) The pair table written by polldiff-detect.
    #[clap(short, long, value_parser)]
    pub pairs: Option<String>,

    /// (file path, .xlsx or .csv) The table of polling locations, used to label the markers
    /// with their original percentages.
    #[clap(short, long, value_parser)]
    pub records: Option<String>,

    /// (file path) Where the HTML map is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default: first worksheet) When using an Excel file of locations, indicates the name
    /// of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (default 10) The initial zoom level of the map.
    #[clap(long, value_parser)]
    pub zoom: Option<u8>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
