//! Flags pairs of nearby polling locations whose reported percentages diverge,
//! and draws them on a map.
//!
//! The two stages are [pipeline::run_detection] and [pipeline::run_render]. The
//! detection itself lives in the `proximity_divergence` crate.

pub mod args;
pub mod pipeline;

/// Logs at the info level, or debug when `verbose` is set. `RUST_LOG` still applies
/// on top of it.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
