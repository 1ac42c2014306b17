//! Fixed-order stage sequencing for one sample run
//!

use std::collections::HashSet;

use camino::Utf8PathBuf;
use log::{debug, info};

use crate::os_utils::create_dir_all;
use crate::report;
use crate::run_paths::RunPaths;
use crate::run_stats;
use crate::stage::{Stage, StageCommand, StageError, StageKind, execute_command};

const CLAIR3_BIN: &str = "/opt/conda/envs/clair3/bin/run_clair3.sh";
const WHATSHAP_BIN: &str = "/opt/conda/envs/clair3/bin/whatshap";
const SNIFFLES_BIN: &str = "/opt/conda/envs/clair3/bin/sniffles";
const SAMTOOLS_BIN: &str = "samtools";
const JAVA_BIN: &str = "java";
const BGZIP_BIN: &str = "bgzip";
const TABIX_BIN: &str = "tabix";

fn tbi_path(vcf_gz: &Utf8PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{vcf_gz}.tbi"))
}

/// Compress a VCF with bgzip, capturing the compressed stream from stdout
fn bgzip_stage(name: &'static str, description: &'static str, vcf: Utf8PathBuf) -> Stage {
    let vcf_gz = Utf8PathBuf::from(format!("{vcf}.gz"));
    Stage {
        name,
        description,
        kind: StageKind::Command(StageCommand {
            program: BGZIP_BIN.to_string(),
            args: vec!["-c".to_string(), vcf.to_string()],
            stdout_to: Some(vcf_gz.clone()),
        }),
        inputs: vec![vcf],
        outputs: vec![vcf_gz],
    }
}

fn tabix_stage(name: &'static str, description: &'static str, vcf_gz: Utf8PathBuf) -> Stage {
    Stage {
        name,
        description,
        kind: StageKind::Command(StageCommand {
            program: TABIX_BIN.to_string(),
            args: vec!["-p".to_string(), "vcf".to_string(), vcf_gz.to_string()],
            stdout_to: None,
        }),
        outputs: vec![tbi_path(&vcf_gz)],
        inputs: vec![vcf_gz],
    }
}

/// Build the fixed stage sequence for one run
///
/// The list order is the execution order. Every path argument is resolved here against the run's
/// directory tree, stages never construct paths themselves.
///
fn build_stages(run: &RunPaths) -> Vec<Stage> {
    let mut stages = Vec::new();

    // Small variant calling, with phasing enabled so the merged output VCF is phased
    stages.push(Stage {
        name: "clair3",
        description: "Running Clair3 for Nanopore Kit14_400bps - small variant calling",
        kind: StageKind::Command(StageCommand {
            program: CLAIR3_BIN.to_string(),
            args: vec![
                format!("--bam_fn={}", run.bam_filename),
                format!("--ref_fn={}", run.reference_filename),
                format!("--threads={}", run.thread_count),
                format!("--model_path={}", run.clair3_model_dir()),
                "--platform=ont".to_string(),
                format!("--output={}", run.clair3_dir()),
                format!("--sample_name={}", run.sample_name),
                "--enable_phasing".to_string(),
                format!("--whatshap={WHATSHAP_BIN}"),
            ],
            stdout_to: None,
        }),
        inputs: vec![
            run.bam_filename.clone(),
            run.reference_filename.clone(),
            run.clair3_model_dir(),
        ],
        outputs: vec![run.phased_vcf()],
    });

    stages.push(Stage {
        name: "phase-stats",
        description: "Computing haplotype block statistics with whatshap",
        kind: StageKind::Command(StageCommand {
            program: WHATSHAP_BIN.to_string(),
            args: vec![
                "stats".to_string(),
                format!("--gtf={}", run.haploblocks_gtf()),
                run.phased_vcf().to_string(),
            ],
            stdout_to: None,
        }),
        inputs: vec![run.phased_vcf()],
        outputs: vec![run.haploblocks_gtf()],
    });

    stages.push(Stage {
        name: "haplotag",
        description: "Haplotagging of HG38 bam file with whatshap",
        kind: StageKind::Command(StageCommand {
            program: WHATSHAP_BIN.to_string(),
            args: vec![
                "haplotag".to_string(),
                "-o".to_string(),
                run.haplotagged_bam().to_string(),
                "--reference".to_string(),
                run.reference_filename.to_string(),
                run.phased_vcf().to_string(),
                run.bam_filename.to_string(),
                "--output-threads=20".to_string(),
                "--ignore-read-groups".to_string(),
                "--output-haplotag-list".to_string(),
                run.haplotag_list().to_string(),
            ],
            stdout_to: None,
        }),
        inputs: vec![
            run.phased_vcf(),
            run.reference_filename.clone(),
            run.bam_filename.clone(),
        ],
        outputs: vec![run.haplotagged_bam(), run.haplotag_list()],
    });

    stages.push(Stage {
        name: "index-haplotag",
        description: "Indexing haplotagged bam file",
        kind: StageKind::Command(StageCommand {
            program: SAMTOOLS_BIN.to_string(),
            args: vec!["index".to_string(), run.haplotagged_bam().to_string()],
            stdout_to: None,
        }),
        inputs: vec![run.haplotagged_bam()],
        outputs: vec![run.haplotagged_bam_index()],
    });

    stages.push(Stage {
        name: "sniffles-hg38",
        description: "Running Sniffles2 - structural variant caller for HG38",
        kind: StageKind::Command(StageCommand {
            program: SNIFFLES_BIN.to_string(),
            args: vec![
                "--input".to_string(),
                run.haplotagged_bam().to_string(),
                "--vcf".to_string(),
                run.sniffles_hg38_vcf().to_string(),
                "--phase".to_string(),
                "--output-rnames".to_string(),
            ],
            stdout_to: None,
        }),
        inputs: vec![run.haplotagged_bam(), run.haplotagged_bam_index()],
        outputs: vec![run.sniffles_hg38_vcf()],
    });

    stages.push(Stage {
        name: "sniffles-t2t",
        description: "Running Sniffles2 - structural variant caller for T2T",
        kind: StageKind::Command(StageCommand {
            program: SNIFFLES_BIN.to_string(),
            args: vec![
                "--input".to_string(),
                run.t2t_bam_filename.to_string(),
                "--vcf".to_string(),
                run.sniffles_t2t_vcf().to_string(),
                "--output-rnames".to_string(),
            ],
            stdout_to: None,
        }),
        inputs: vec![run.t2t_bam_filename.clone()],
        outputs: vec![run.sniffles_t2t_vcf()],
    });

    // Functional annotation, snpEff writes the annotated VCF to stdout
    stages.push(Stage {
        name: "snpeff",
        description: "Annotation of SNVs with snpEff",
        kind: StageKind::Command(StageCommand {
            program: JAVA_BIN.to_string(),
            args: vec![
                "-jar".to_string(),
                run.snpeff_jar().to_string(),
                "hg38".to_string(),
                "-noStats".to_string(),
                "-canon".to_string(),
                run.phased_vcf().to_string(),
            ],
            stdout_to: Some(run.snpeff_vcf()),
        }),
        inputs: vec![run.phased_vcf(), run.snpeff_jar()],
        outputs: vec![run.snpeff_vcf()],
    });

    stages.push(bgzip_stage(
        "bgzip-snpeff",
        "Compressing snpEff-annotated VCF",
        run.snpeff_vcf(),
    ));
    stages.push(tabix_stage(
        "tabix-snpeff",
        "Indexing snpEff-annotated VCF",
        run.snpeff_vcf_gz(),
    ));

    // Clinical annotation against the ClinVar database, also written to stdout
    stages.push(Stage {
        name: "snpsift-clinvar",
        description: "Annotation of SNVs with SnpSift and ClinVar db",
        kind: StageKind::Command(StageCommand {
            program: JAVA_BIN.to_string(),
            args: vec![
                "-Xmx1g".to_string(),
                "-jar".to_string(),
                run.snpsift_jar().to_string(),
                "annotate".to_string(),
                "-v".to_string(),
                run.clinvar_db().to_string(),
                run.snpeff_vcf_gz().to_string(),
            ],
            stdout_to: Some(run.clinvar_vcf()),
        }),
        inputs: vec![run.snpeff_vcf_gz(), run.snpsift_jar(), run.clinvar_db()],
        outputs: vec![run.clinvar_vcf()],
    });

    stages.push(bgzip_stage(
        "bgzip-clinvar",
        "Compressing ClinVar-annotated VCF",
        run.clinvar_vcf(),
    ));
    stages.push(tabix_stage(
        "tabix-clinvar",
        "Indexing ClinVar-annotated VCF",
        run.clinvar_vcf_gz(),
    ));

    // Native replacement for the former SnpSift expression filter
    stages.push(Stage {
        name: "fshd-filter",
        description: "Filtering for FSHD-relevant SNVs and creating TSV report",
        kind: StageKind::FshdFilterReport,
        inputs: vec![run.clinvar_vcf_gz()],
        outputs: vec![run.fshd_vcf(), run.fshd_tsv(), run.filter_provenance()],
    });

    stages
}

/// Statically check that no stage consumes a path that a later stage produces
///
/// Run before any stage is dispatched, so a mis-ordered stage list fails the run up front instead
/// of part way through.
///
fn validate_stage_ordering(
    stages: &[Stage],
    preexisting_inputs: &[Utf8PathBuf],
) -> Result<(), StageError> {
    let mut produced = preexisting_inputs
        .iter()
        .map(|x| x.as_path())
        .collect::<HashSet<_>>();

    for stage in stages {
        for input in &stage.inputs {
            if !produced.contains(input.as_path()) {
                return Err(StageError::InputNotStaged {
                    stage: stage.name,
                    path: input.clone(),
                });
            }
        }
        produced.extend(stage.outputs.iter().map(|x| x.as_path()));
    }
    Ok(())
}

fn check_stage_outputs(stage: &Stage) -> Result<(), StageError> {
    for output in &stage.outputs {
        if !output.exists() {
            return Err(StageError::MissingOutput {
                stage: stage.name,
                path: output.clone(),
            });
        }
    }
    Ok(())
}

/// Execute the whole pipeline for one run
///
/// Stages run one at a time in fixed order, each blocking to completion before the next is
/// dispatched. Any stage failure aborts the run immediately, partial output directories are left
/// in place for diagnosis.
///
pub fn run_pipeline(run: &RunPaths) -> Result<(), StageError> {
    create_dir_all(&run.variant_dir(), "variant-calling");
    create_dir_all(&run.clair3_dir(), "clair3 output");

    let stages = build_stages(run);
    validate_stage_ordering(&stages, &run.preexisting_inputs())?;

    for stage in &stages {
        info!("{}.", stage.description);
        match &stage.kind {
            StageKind::Command(command) => {
                debug!("Stage '{}' command: {}", stage.name, command.command_line());
                execute_command(stage.name, command)?;
            }
            StageKind::FshdFilterReport => {
                let stats = report::write_fshd_report(run);
                run_stats::write_run_stats(&run.output_dir, &stats);
            }
        }
        check_stage_outputs(stage)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;

    fn get_test_run_paths() -> RunPaths {
        let settings = cli::Settings {
            bam_filename: "/data/sample1.GRCh38.bam".to_string(),
            output_dir: Utf8PathBuf::from("/out"),
            ref_dir: Utf8PathBuf::from("/ref"),
            t2t_bam_filename: "/data/sample1.t2t.bam".to_string(),
            thread_count: 4,
            resource_dir: Some(Utf8PathBuf::from("/res")),
            ..Default::default()
        };
        RunPaths::new(&settings)
    }

    #[test]
    fn test_stage_list_order() {
        let run = get_test_run_paths();
        let names = build_stages(&run)
            .iter()
            .map(|x| x.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "clair3",
                "phase-stats",
                "haplotag",
                "index-haplotag",
                "sniffles-hg38",
                "sniffles-t2t",
                "snpeff",
                "bgzip-snpeff",
                "tabix-snpeff",
                "snpsift-clinvar",
                "bgzip-clinvar",
                "tabix-clinvar",
                "fshd-filter",
            ]
        );
    }

    #[test]
    fn test_stage_ordering_is_satisfied() {
        // Every stage input must be a run input or the output of an earlier stage
        let run = get_test_run_paths();
        let stages = build_stages(&run);
        assert!(validate_stage_ordering(&stages, &run.preexisting_inputs()).is_ok());
    }

    #[test]
    fn test_stage_ordering_detects_unstaged_input() {
        let run = get_test_run_paths();
        let mut stages = build_stages(&run);
        stages.reverse();
        let result = validate_stage_ordering(&stages, &run.preexisting_inputs());
        assert!(matches!(result, Err(StageError::InputNotStaged { .. })));
    }

    #[test]
    fn test_external_stages_redirect_stdout_only_where_expected() {
        let run = get_test_run_paths();
        for stage in build_stages(&run) {
            if let StageKind::Command(command) = &stage.kind {
                let expect_redirect = matches!(
                    stage.name,
                    "snpeff" | "snpsift-clinvar" | "bgzip-snpeff" | "bgzip-clinvar"
                );
                assert_eq!(command.stdout_to.is_some(), expect_redirect, "{}", stage.name);
            }
        }
    }
}
