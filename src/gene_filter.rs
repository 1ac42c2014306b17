//! FSHD disease-relevance predicate over annotated VCF records
//!

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::annotation::AnnEntry;
use crate::vcf_utils::{VcfRecord, get_info_value};

/// Genes implicated in FSHD and its differential diagnoses
pub const FSHD_GENES: [&str; 7] = [
    "DUX4", "SMCHD1", "LRIF1", "DNMT3B", "TRIM43", "CAPN3", "VCP",
];

/// Pattern matched against the ClinVar disease name annotation (case-sensitive, unanchored)
pub const CLNDN_PATTERN: &str = "Facioscapulohumeral";

/// Compiled once, the predicate runs per record over a genome-wide call set
static CLNDN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(CLNDN_PATTERN).unwrap());

/// Test whether a record is FSHD-relevant
///
/// True if any annotation entry's gene is in the fixed FSHD gene set, or if the record's CLNDN
/// INFO value matches the FSHD disease-name pattern. Evaluated natively over the already-parsed
/// record, no further file or process I/O.
///
pub fn is_fshd_relevant(record: &VcfRecord, entries: &[AnnEntry]) -> bool {
    if entries.iter().any(|x| FSHD_GENES.contains(&x.gene.as_str())) {
        return true;
    }

    let clndn = get_info_value(&record.info, "CLNDN");
    CLNDN_REGEX.is_match(&clndn)
}

/// Render the filter as a SnpSift-style expression string
///
/// Used only in the filter provenance file, so that runs stay comparable with records kept by
/// earlier SnpSift-based filtering.
///
pub fn filter_expression() -> String {
    let gene_terms = FSHD_GENES
        .iter()
        .map(|gene| format!("(ANN[*].GENE = '{gene}')"))
        .join(" | ");
    format!("({gene_terms} | (CLNDN =~ '{CLNDN_PATTERN}'))")
}
