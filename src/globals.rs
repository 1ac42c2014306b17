use const_format::concatcp;

/// Global program name used for logging and output file naming
///
/// All client code should refer directly to these constants instead of using various possibly
/// conflicting environment variables
pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log file written into the run output directory
pub const LOG_FILENAME: &str = concatcp!(PROGRAM_NAME, ".log");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filename_derived_from_program_name() {
        assert_eq!(LOG_FILENAME, "fshd-variant.log");
    }
}
