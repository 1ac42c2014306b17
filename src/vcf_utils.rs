//! Text-level VCF record parsing and INFO field lookup
//!

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

/// One data line of a VCF file
///
/// Coordinates and alleles are carried as opaque strings, this module never interprets them as a
/// sequence model. The raw INFO text is retained for key-scoped lookup via [`get_info_value`].
///
pub struct VcfRecord {
    pub chrom: String,

    /// 1-based position
    pub pos: i64,

    pub ref_allele: String,

    /// May itself be multi-valued, treated as a single opaque value here
    pub alt_allele: String,

    /// Raw semicolon-separated key=value INFO text
    pub info: String,
}

/// A data line that can't be parsed into the minimum required VCF fields
///
/// This is a report-level problem, lower severity than a stage failure. Callers are expected to
/// warn and skip the record rather than abort the run.
///
#[derive(Debug, PartialEq)]
pub struct MalformedRecord {
    pub msg: String,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for MalformedRecord {}

/// Parse one line of VCF text
///
/// Header lines (starting with '#') return `Ok(None)`. A data line must have at least the eight
/// fixed VCF columns, any further sample genotype columns are ignored.
///
pub fn parse_vcf_line(line: &str) -> Result<Option<VcfRecord>, MalformedRecord> {
    if line.starts_with('#') {
        return Ok(None);
    }

    let fields = line.trim_end().split('\t').collect::<Vec<_>>();
    if fields.len() < 8 {
        return Err(MalformedRecord {
            msg: format!(
                "expected at least 8 tab-separated VCF fields, found {}",
                fields.len()
            ),
        });
    }

    let pos = fields[1].parse::<i64>().map_err(|_| MalformedRecord {
        msg: format!("VCF POS field is not an integer: '{}'", fields[1]),
    })?;

    Ok(Some(VcfRecord {
        chrom: fields[0].to_string(),
        pos,
        ref_allele: fields[3].to_string(),
        alt_allele: fields[4].to_string(),
        info: fields[7].to_string(),
    }))
}

/// Look up the value of `key` in semicolon-separated INFO text
///
/// Returns the maximal run of non-';' characters following the first occurrence of `key=`, or the
/// empty string when no such occurrence exists. A key present with an empty value and an absent
/// key are indistinguishable to the caller.
///
pub fn get_info_value(info: &str, key: &str) -> String {
    // Lookup patterns are compiled once per distinct key and reused for the rest of the run, the
    // lookup itself sits in the per-record path of the report stage:
    static KEY_REGEXES: LazyLock<Mutex<HashMap<String, Regex>>> =
        LazyLock::new(|| Mutex::new(HashMap::new()));

    let mut key_regexes = KEY_REGEXES.lock().unwrap();
    let re = key_regexes
        .entry(key.to_string())
        .or_insert_with(|| Regex::new(&format!("{}=([^;]+)", regex::escape(key))).unwrap());
    match re.captures(info) {
        Some(captures) => captures[1].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_info_value() {
        let info = "AF=0.5;ANN=x|y|z;CLNSIG=Pathogenic";

        assert_eq!(get_info_value(info, "AF"), "0.5");
        assert_eq!(get_info_value(info, "ANN"), "x|y|z");
        assert_eq!(get_info_value(info, "CLNSIG"), "Pathogenic");
    }

    #[test]
    fn test_get_info_value_absent_key() {
        assert_eq!(get_info_value("AF=0.5;DP=30", "CLNDN"), "");
    }

    #[test]
    fn test_get_info_value_empty_value_matches_absent() {
        // 'key=' with no value chars before the separator behaves the same as an absent key
        assert_eq!(get_info_value("ANN=;DP=30", "ANN"), "");
    }

    #[test]
    fn test_get_info_value_stops_at_separator_or_end() {
        assert_eq!(get_info_value("DP=30;AF=0.5", "DP"), "30");
        assert_eq!(get_info_value("DP=30;AF=0.5", "AF"), "0.5");
    }

    #[test]
    fn test_get_info_value_repeated_lookups() {
        // Later lookups reuse the compiled per-key pattern and must behave identically
        let info = "ANN=x|y|z;CLNSIG=Pathogenic";
        for _ in 0..3 {
            assert_eq!(get_info_value(info, "ANN"), "x|y|z");
            assert_eq!(get_info_value(info, "CLNSIG"), "Pathogenic");
            assert_eq!(get_info_value(info, "CLNDN"), "");
        }
    }

    #[test]
    fn test_get_info_value_regex_key_escaped() {
        assert_eq!(get_info_value("ANN[0]=x;DP=3", "ANN[0]"), "x");
    }

    #[test]
    fn test_parse_vcf_line_skips_headers() {
        assert!(parse_vcf_line("##fileformat=VCFv4.2").unwrap().is_none());
        assert!(
            parse_vcf_line("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_parse_vcf_line() {
        let record = parse_vcf_line("chr4\t193000\t.\tA\tG\t30\tPASS\tDP=10\tGT\t0|1")
            .unwrap()
            .unwrap();
        assert_eq!(record.chrom, "chr4");
        assert_eq!(record.pos, 193000);
        assert_eq!(record.ref_allele, "A");
        assert_eq!(record.alt_allele, "G");
        assert_eq!(record.info, "DP=10");
    }

    #[test]
    fn test_parse_vcf_line_too_few_fields() {
        assert!(parse_vcf_line("chr4\t193000\t.\tA\tG").is_err());
    }

    #[test]
    fn test_parse_vcf_line_bad_position() {
        assert!(parse_vcf_line("chr4\tXYZ\t.\tA\tG\t.\t.\tDP=10").is_err());
    }
}
