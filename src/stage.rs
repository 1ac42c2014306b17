//! Pipeline stage abstraction and synchronous stage execution
//!

use std::process::{Command, Stdio};

use camino::Utf8PathBuf;

/// One external tool invocation
///
pub struct StageCommand {
    pub program: String,

    /// Ordered argument list, with all paths already resolved against the run's directory tree
    pub args: Vec<String>,

    /// File capturing the tool's stdout
    ///
    /// The target is created immediately before the tool starts and closed immediately after it
    /// exits, on both the success and failure paths.
    ///
    pub stdout_to: Option<Utf8PathBuf>,
}

impl StageCommand {
    /// Full command line for error messages and debug logging
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

pub enum StageKind {
    /// Synchronous external tool invocation
    Command(StageCommand),

    /// In-process FSHD gene filter and report tabulation
    FshdFilterReport,
}

/// One unit of pipeline work with its declared filesystem contract
///
/// A stage is executed exactly once. Its terminal state is either success or a fatal `StageError`,
/// there are no retries.
///
pub struct Stage {
    pub name: &'static str,

    /// Progress message logged when the stage is dispatched
    pub description: &'static str,

    pub kind: StageKind,

    /// Paths that must be produced by an earlier stage, or exist before the run starts
    pub inputs: Vec<Utf8PathBuf>,

    /// Paths that must exist after the stage completes
    pub outputs: Vec<Utf8PathBuf>,
}

#[derive(Debug)]
pub enum StageError {
    /// An external stage could not be spawned or returned a non-success exit status
    Invocation {
        stage: &'static str,
        command: String,
        detail: String,
    },

    /// A stage completed but a declared output path does not exist afterwards
    ///
    /// This guards against tools that do not propagate their exit codes reliably.
    ///
    MissingOutput {
        stage: &'static str,
        path: Utf8PathBuf,
    },

    /// A stage declares an input that no earlier stage produces
    InputNotStaged {
        stage: &'static str,
        path: Utf8PathBuf,
    },
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::Invocation {
                stage,
                command,
                detail,
            } => {
                write!(
                    f,
                    "pipeline stage '{stage}' failed: {detail}. command: {command}"
                )
            }
            StageError::MissingOutput { stage, path } => {
                write!(
                    f,
                    "pipeline stage '{stage}' completed without writing expected output file: '{path}'"
                )
            }
            StageError::InputNotStaged { stage, path } => {
                write!(
                    f,
                    "pipeline stage '{stage}' requires input '{path}' which no earlier stage produces"
                )
            }
        }
    }
}

impl std::error::Error for StageError {}

/// Run one external stage command to completion
///
/// Blocks until the tool exits. Spawn failures and non-success exit statuses are both reported as
/// `StageError::Invocation` naming the stage and the full command attempted.
///
pub fn execute_command(stage_name: &'static str, command: &StageCommand) -> Result<(), StageError> {
    let invocation_error = |detail: String| StageError::Invocation {
        stage: stage_name,
        command: command.command_line(),
        detail,
    };

    let mut process = Command::new(&command.program);
    process.args(&command.args);

    // The redirect file handle is scoped to this invocation, it is closed when the process
    // builder drops at the end of this function whether or not the tool succeeded:
    if let Some(stdout_to) = &command.stdout_to {
        let file = std::fs::File::create(stdout_to)
            .map_err(|e| invocation_error(format!("can't create stdout capture file: {e}")))?;
        process.stdout(Stdio::from(file));
    }

    let status = process
        .status()
        .map_err(|e| invocation_error(format!("can't start process: {e}")))?;

    if !status.success() {
        return Err(invocation_error(format!(
            "process returned non-success status ({status})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let command = StageCommand {
            program: "tabix".to_string(),
            args: vec!["-p".to_string(), "vcf".to_string(), "a.vcf.gz".to_string()],
            stdout_to: None,
        };
        assert_eq!(command.command_line(), "tabix -p vcf a.vcf.gz");
    }

    #[test]
    fn test_execute_command_spawn_failure() {
        let command = StageCommand {
            program: "/this/tool/does/not/exist".to_string(),
            args: vec![],
            stdout_to: None,
        };
        let result = execute_command("test-stage", &command);
        match result {
            Err(StageError::Invocation { stage, .. }) => assert_eq!(stage, "test-stage"),
            _ => panic!("expected invocation error"),
        }
    }

    #[test]
    fn test_error_message_names_stage_and_command() {
        let err = StageError::Invocation {
            stage: "clair3",
            command: "run_clair3.sh --bam_fn=x".to_string(),
            detail: "process returned non-success status (exit status: 1)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("clair3"));
        assert!(msg.contains("run_clair3.sh --bam_fn=x"));
    }
}
