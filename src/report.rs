//! FSHD-relevant variant extraction and tabular report output
//!

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use flate2::read::MultiGzDecoder;
use log::{info, warn};
use unwrap::unwrap;

use crate::annotation::expand_ann_field;
use crate::gene_filter::{filter_expression, is_fshd_relevant};
use crate::run_paths::RunPaths;
use crate::run_stats::FshdReportStats;
use crate::vcf_utils::{get_info_value, parse_vcf_line};

const TSV_HEADER: &str = "CHROM\tPOS\tREF\tALT\tGENE\tEFFECT\tIMPACT\tCLNSIG\tCLNDN";

/// Stream the annotated VCF through the FSHD filter, producing the filtered VCF and TSV report
///
/// Header lines and passing data lines are copied verbatim into the filtered VCF. Each passing
/// record contributes one TSV row per decoded annotation entry, in source order; CLNSIG and CLNDN
/// are looked up once per record and repeated across its rows. Malformed data lines are skipped
/// with a warning and counted, they never abort the report.
///
fn tabulate_fshd_records(
    reader: impl BufRead,
    vcf_out: &mut impl Write,
    tsv_out: &mut impl Write,
) -> std::io::Result<FshdReportStats> {
    let mut stats = FshdReportStats::default();

    writeln!(tsv_out, "{TSV_HEADER}")?;

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let record = match parse_vcf_line(&line) {
            Ok(Some(x)) => x,
            Ok(None) => {
                writeln!(vcf_out, "{line}")?;
                continue;
            }
            Err(err) => {
                warn!(
                    "Skipping malformed VCF record at line {}: {err}",
                    line_index + 1
                );
                stats.malformed_records_skipped += 1;
                continue;
            }
        };
        stats.records_scanned += 1;

        let entries = expand_ann_field(&get_info_value(&record.info, "ANN"));
        if !is_fshd_relevant(&record, &entries) {
            continue;
        }
        stats.records_passing_filter += 1;
        writeln!(vcf_out, "{line}")?;

        let clnsig = get_info_value(&record.info, "CLNSIG");
        let clndn = get_info_value(&record.info, "CLNDN");
        for entry in &entries {
            writeln!(
                tsv_out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{clnsig}\t{clndn}",
                record.chrom,
                record.pos,
                record.ref_allele,
                record.alt_allele,
                entry.gene,
                entry.effect,
                entry.impact,
            )?;
            stats.report_rows_written += 1;
        }
    }

    Ok(stats)
}

/// Record the exact filter expression and time used, for reproducibility
fn write_filter_provenance(run: &RunPaths) {
    let filename = run.filter_provenance();
    let mut f = unwrap!(
        File::create(&filename),
        "Unable to create filter provenance file: '{filename}'"
    );
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    writeln!(f, "filter_expression: {}", filter_expression()).unwrap();
    writeln!(f, "filter_time_utc: {timestamp}").unwrap();
}

/// Run the native FSHD filter stage over the ClinVar-annotated small-variant calls
///
pub fn write_fshd_report(run: &RunPaths) -> FshdReportStats {
    let input_filename = run.clinvar_vcf_gz();
    let vcf_filename = run.fshd_vcf();
    let tsv_filename = run.fshd_tsv();

    let input = unwrap!(
        File::open(&input_filename),
        "Unable to open annotated VCF file: '{input_filename}'"
    );
    let reader = BufReader::new(MultiGzDecoder::new(input));

    let mut vcf_out = BufWriter::new(unwrap!(
        File::create(&vcf_filename),
        "Unable to create FSHD-relevant VCF file: '{vcf_filename}'"
    ));
    let mut tsv_out = BufWriter::new(unwrap!(
        File::create(&tsv_filename),
        "Unable to create FSHD-relevant TSV file: '{tsv_filename}'"
    ));

    let stats = unwrap!(
        tabulate_fshd_records(reader, &mut vcf_out, &mut tsv_out),
        "Unable to write FSHD-relevant variant report"
    );
    unwrap!(
        vcf_out.flush(),
        "Unable to finish writing FSHD-relevant VCF file: '{vcf_filename}'"
    );
    unwrap!(
        tsv_out.flush(),
        "Unable to finish writing FSHD-relevant TSV file: '{tsv_filename}'"
    );

    write_filter_provenance(run);

    if stats.malformed_records_skipped > 0 {
        warn!(
            "Skipped {} malformed VCF records while filtering",
            stats.malformed_records_skipped
        );
    }
    info!(
        "Filtered {} records to {} FSHD-relevant records and {} report rows",
        stats.records_scanned, stats.records_passing_filter, stats.report_rows_written
    );
    info!("FSHD-relevant VCF saved to: '{vcf_filename}'");
    info!("FSHD-relevant TSV saved to: '{tsv_filename}'");

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabulate_str(vcf_text: &str) -> (FshdReportStats, String, String) {
        let mut vcf_out = Vec::new();
        let mut tsv_out = Vec::new();
        let stats =
            tabulate_fshd_records(vcf_text.as_bytes(), &mut vcf_out, &mut tsv_out).unwrap();
        (
            stats,
            String::from_utf8(vcf_out).unwrap(),
            String::from_utf8(tsv_out).unwrap(),
        )
    }

    #[test]
    fn test_dux4_record_produces_one_row() {
        let vcf = "##fileformat=VCFv4.2\n\
            chr4\t193000\t.\tA\tG\t.\t.\tANN=G|missense_variant|MODERATE|DUX4|DUX4_id|x;CLNSIG=Pathogenic;CLNDN=Facioscapulohumeral_muscular_dystrophy\n";
        let (stats, vcf_out, tsv_out) = tabulate_str(vcf);

        assert_eq!(stats.records_scanned, 1);
        assert_eq!(stats.records_passing_filter, 1);
        assert_eq!(stats.report_rows_written, 1);

        let rows = tsv_out.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], TSV_HEADER);
        assert_eq!(
            rows[1],
            "chr4\t193000\tA\tG\tDUX4\tmissense_variant\tMODERATE\tPathogenic\tFacioscapulohumeral_muscular_dystrophy"
        );

        // Header line and the passing record are copied into the filtered VCF verbatim
        assert_eq!(vcf_out.lines().count(), 2);
        assert!(vcf_out.starts_with("##fileformat=VCFv4.2\n"));
    }

    #[test]
    fn test_non_fshd_record_produces_no_rows() {
        let vcf =
            "chr17\t43000000\t.\tC\tT\t.\t.\tANN=T|missense_variant|MODERATE|BRCA1|BRCA1_id|x;CLNDN=Breast_cancer\n";
        let (stats, vcf_out, tsv_out) = tabulate_str(vcf);

        assert_eq!(stats.records_scanned, 1);
        assert_eq!(stats.records_passing_filter, 0);
        assert_eq!(stats.report_rows_written, 0);
        assert!(vcf_out.is_empty());
        assert_eq!(tsv_out.lines().count(), 1);
    }

    #[test]
    fn test_short_ann_entries_produce_no_rows() {
        // All ANN entries have only three pipe-separated sub-fields, so no entries decode and the
        // record can't pass on gene content
        let vcf = "chr4\t193000\t.\tA\tG\t.\t.\tANN=G|x|DUX4,G|y|SMCHD1\n";
        let (stats, _, tsv_out) = tabulate_str(vcf);

        assert_eq!(stats.report_rows_written, 0);
        assert_eq!(tsv_out.lines().count(), 1);
    }

    #[test]
    fn test_row_count_sums_entries_over_passing_records() {
        let vcf = "\
            chr18\t2650000\t.\tG\tA\t.\t.\tANN=A|stop_gained|HIGH|SMCHD1|S_id|x,A|upstream_gene_variant|MODIFIER|FRG1|F_id|x\n\
            chr17\t43000000\t.\tC\tT\t.\t.\tANN=T|missense_variant|MODERATE|BRCA1|B_id|x\n\
            chr4\t193000\t.\tA\tG\t.\t.\tCLNDN=Facioscapulohumeral_muscular_dystrophy\n";
        let (stats, vcf_out, tsv_out) = tabulate_str(vcf);

        // The SMCHD1 record passes with two decoded entries, the CLNDN record passes with zero
        // entries and so contributes zero rows
        assert_eq!(stats.records_passing_filter, 2);
        assert_eq!(stats.report_rows_written, 2);
        assert_eq!(vcf_out.lines().count(), 2);
        assert_eq!(tsv_out.lines().count(), 3);
        assert!(tsv_out.contains("\tSMCHD1\t"));
        assert!(tsv_out.contains("\tFRG1\t"));
    }

    #[test]
    fn test_clnsig_and_clndn_repeated_across_rows() {
        let vcf = "chr18\t2650000\t.\tG\tA\t.\t.\tANN=A|stop_gained|HIGH|SMCHD1|S_id|x,A|intron_variant|MODIFIER|SMCHD1|S_id|y;CLNSIG=Likely_pathogenic;CLNDN=Facioscapulohumeral_muscular_dystrophy_2\n";
        let (_, _, tsv_out) = tabulate_str(vcf);

        let rows = tsv_out.lines().skip(1).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert!(row.ends_with(
                "\tLikely_pathogenic\tFacioscapulohumeral_muscular_dystrophy_2"
            ));
        }
    }

    #[test]
    fn test_malformed_lines_skipped_and_counted() {
        let vcf = "\
            chr4\tnot_a_position\t.\tA\tG\t.\t.\tDP=10\n\
            too\tfew\tfields\n\
            chr4\t193000\t.\tA\tG\t.\t.\tANN=G|missense_variant|MODERATE|DUX4|D_id|x\n";
        let (stats, _, tsv_out) = tabulate_str(vcf);

        assert_eq!(stats.malformed_records_skipped, 2);
        assert_eq!(stats.records_scanned, 1);
        assert_eq!(stats.report_rows_written, 1);
        assert_eq!(tsv_out.lines().count(), 2);
    }

    #[test]
    fn test_report_is_deterministic() {
        let vcf = "\
            chr18\t2650000\t.\tG\tA\t.\t.\tANN=A|stop_gained|HIGH|SMCHD1|S_id|x\n\
            chr9\t35060000\t.\tC\tT\t.\t.\tANN=T|missense_variant|MODERATE|VCP|V_id|x\n";
        let first = tabulate_str(vcf);
        let second = tabulate_str(vcf);

        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
    }
}
