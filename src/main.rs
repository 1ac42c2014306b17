mod annotation;
mod cli;
mod gene_filter;
mod globals;
mod logger;
mod os_utils;
mod pipeline;
mod report;
mod run_paths;
mod run_stats;
mod stage;
mod vcf_utils;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::pipeline::run_pipeline;
use crate::run_paths::RunPaths;

/// Run system configuration steps prior to starting any other program logic
///
fn system_configuration_prelude() {
    os_utils::attempt_max_open_file_limit();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!(
        "Running external callers on {} threads",
        settings.thread_count
    );

    let start = std::time::Instant::now();

    cli::write_settings(&settings.output_dir, settings);

    let run_paths = RunPaths::new(settings);
    info!(
        "bam file used for variant calling with clair3 & sniffles2: {}",
        run_paths.bam_filename
    );
    run_pipeline(&run_paths)?;

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    system_configuration_prelude();

    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(&settings.output_dir, settings.clobber, settings.debug);

    if let Err(err) = run(&settings) {
        eprintln!("{err}");
        process::exit(2);
    }
}
