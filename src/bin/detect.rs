use clap::Parser;
use log::info;

use polldiff::args::DetectArgs;
use polldiff::init_logging;
use polldiff::pipeline::config_reader::detect_settings;
use polldiff::pipeline::{print_error_details, run_detection, PipelineResult};

fn run(args: &DetectArgs) -> PipelineResult<()> {
    let settings = detect_settings(args)?;
    let report = run_detection(&settings)?;
    info!(
        "{} records read, {} rejected, {} pairs evaluated, {} pairs flagged",
        report.records_read, report.records_rejected, report.pairs_evaluated, report.pairs_flagged
    );
    Ok(())
}

fn main() {
    let args = DetectArgs::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        print_error_details(&e);
        std::process::exit(1);
    }
}
