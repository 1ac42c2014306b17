use camino::{Utf8Path, Utf8PathBuf};
use chrono::Datelike;
use clap::Parser;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::run_paths::{
    CLAIR3_MODEL_DIRNAME, CLINVAR_DB_FILENAME, REFERENCE_FILENAME, SNPEFF_JAR_FILENAME,
    SNPSIFT_JAR_FILENAME,
};

pub const SETTINGS_FILENAME: &str = "pipeline.settings.json";

#[derive(Default, Deserialize, Parser, Serialize)]
#[command(
    author,
    version,
    about,
    after_help = format!("Copyright (C) {}
This program is intended for Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(rename_all = "kebab_case")]
pub struct Settings {
    /// Mapped GRCh38 alignment file for the sample, in BAM format. The sample name is taken
    /// from this filename, truncated at its first '.'.
    #[arg(value_name = "BAM")]
    pub bam_filename: String,

    /// Directory for all pipeline output. A 'variant-calling' tree is created inside it.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Utf8PathBuf,

    /// Directory holding the GRCh38 no-alt reference FASTA
    #[arg(value_name = "REF_DIR")]
    pub ref_dir: Utf8PathBuf,

    /// Mapped T2T alignment file for the same sample, in BAM format. Structural variants called
    /// from this alignment are written next to it.
    #[arg(value_name = "T2T_BAM")]
    pub t2t_bam_filename: String,

    /// Number of threads forwarded to the external small-variant caller
    #[arg(value_name = "THREAD_COUNT", default_value_t = 4)]
    pub thread_count: usize,

    /// Directory holding the clair3 model and the snpEff jars and databases
    ///
    /// Defaults to the directory containing the pipeline executable.
    ///
    #[arg(long, value_name = "DIR")]
    pub resource_dir: Option<Utf8PathBuf>,

    /// Overwrite an existing output directory
    #[arg(long)]
    pub clobber: bool,

    /// Turn on extra debug logging
    ///
    /// This option enables extra logging intended for debugging only, including the full command
    /// line of every dispatched stage.
    ///
    #[arg(long)]
    pub debug: bool,
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    let path = std::path::Path::new(&filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Resolve the tool resource directory to the executable's directory when not given on the
/// command line
///
fn resolve_resource_dir(resource_dir: Option<Utf8PathBuf>) -> SimpleResult<Utf8PathBuf> {
    if let Some(dir) = resource_dir {
        return Ok(dir);
    }
    let exe = match std::env::current_exe() {
        Ok(x) => x,
        Err(e) => bail!("Can't determine default resource directory: {e}"),
    };
    let exe = match Utf8PathBuf::from_path_buf(exe) {
        Ok(x) => x,
        Err(e) => bail!(
            "Can't determine default resource directory from non-utf8 executable path: '{}'",
            e.display()
        ),
    };
    match exe.parent() {
        Some(x) => Ok(x.to_path_buf()),
        None => bail!("Can't determine default resource directory"),
    }
}

/// Validate settings and update parameters that can't be processed by clap
///
/// Parts of this process assume logging is not yet setup
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    check_required_filename(&settings.bam_filename, "GRCh38 alignment")?;
    check_required_filename(&settings.t2t_bam_filename, "T2T alignment")?;

    let reference = settings.ref_dir.join(REFERENCE_FILENAME);
    if !reference.is_file() {
        bail!(
            "Can't find reference FASTA '{REFERENCE_FILENAME}' in specified reference directory: '{}'",
            settings.ref_dir
        );
    }

    if settings.thread_count == 0 {
        bail!("THREAD_COUNT argument must be greater than 0");
    }

    let resource_dir = resolve_resource_dir(settings.resource_dir.take())?;
    if !resource_dir.join(CLAIR3_MODEL_DIRNAME).is_dir() {
        bail!(
            "Can't find clair3 model directory '{CLAIR3_MODEL_DIRNAME}' under resource directory: '{resource_dir}'"
        );
    }
    for jar in [SNPEFF_JAR_FILENAME, SNPSIFT_JAR_FILENAME, CLINVAR_DB_FILENAME] {
        if !resource_dir.join(jar).is_file() {
            bail!("Can't find annotation resource '{jar}' under resource directory: '{resource_dir}'");
        }
    }
    settings.resource_dir = Some(resource_dir);

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Write run settings out in json format
pub fn write_settings(output_dir: &Utf8Path, settings: &Settings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing pipeline settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create pipeline settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
