//! Track stats for the whole pipeline run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Default, Deserialize, Serialize)]
pub struct FshdReportStats {
    /// Count of data lines parsed into records from the annotated VCF
    pub records_scanned: usize,

    /// Count of data lines skipped with a warning because they failed to parse
    pub malformed_records_skipped: usize,

    pub records_passing_filter: usize,

    pub report_rows_written: usize,
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &FshdReportStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
