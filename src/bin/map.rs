use clap::Parser;
use log::info;

use polldiff::args::RenderArgs;
use polldiff::init_logging;
use polldiff::pipeline::config_reader::render_settings;
use polldiff::pipeline::{
    print_error_details, run_render, write_table_overview, PipelineError, RenderSettings,
};

fn main() {
    let args = RenderArgs::parse();
    init_logging(args.verbose);

    let settings: RenderSettings = match render_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            print_error_details(&e);
            std::process::exit(1);
        }
    };

    match run_render(&settings) {
        Ok(report) => {
            info!(
                "{} rows read, {} dropped, {} markers ({} without a percentage), {} lines",
                report.rows_read,
                report.rows_dropped,
                report.markers,
                report.unmatched_markers,
                report.lines
            );
        }
        Err(e @ PipelineError::InputNotFound { .. }) => {
            eprintln!("Error: {}", e);
            eprintln!("Please make sure the input files are in the correct location and properly named.");
            if let PipelineError::InputNotFound { path, .. } = &e {
                eprintln!("Looking for file at: {}", path.display());
            }
            std::process::exit(1);
        }
        Err(e) => {
            print_error_details(&e);
            let _ = write_table_overview(&settings.pairs_path, &mut std::io::stdout().lock());
            std::process::exit(1);
        }
    }
}
