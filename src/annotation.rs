//! Expansion of the snpEff 'ANN' INFO sub-field into per-transcript entries
//!

/// One predicted functional effect for one affected transcript or feature
#[derive(Debug, PartialEq)]
pub struct AnnEntry {
    pub effect: String,
    pub impact: String,
    pub gene: String,
    pub gene_id: String,
}

/// Expand a raw ANN value into its per-transcript annotation entries
///
/// The value is a comma-separated list of entries, each a pipe-separated field list. Entries with
/// four or fewer pipe-separated sub-fields are dropped without error, so a malformed or empty ANN
/// value yields an empty sequence. Entry order is preserved.
///
pub fn expand_ann_field(ann_value: &str) -> Vec<AnnEntry> {
    let mut entries = Vec::new();
    for ann in ann_value.split(',') {
        let parts = ann.split('|').collect::<Vec<_>>();
        if parts.len() > 4 {
            entries.push(AnnEntry {
                effect: parts[1].to_string(),
                impact: parts[2].to_string(),
                gene: parts[3].to_string(),
                gene_id: parts[4].to_string(),
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_ann_field() {
        let entries = expand_ann_field("G|missense_variant|MODERATE|DUX4|ENSG1|transcript");
        assert_eq!(
            entries,
            vec![AnnEntry {
                effect: "missense_variant".to_string(),
                impact: "MODERATE".to_string(),
                gene: "DUX4".to_string(),
                gene_id: "ENSG1".to_string(),
            }]
        );
    }

    #[test]
    fn test_expand_ann_field_multiple_entries_preserve_order() {
        let entries = expand_ann_field(
            "G|missense_variant|MODERATE|DUX4|ENSG1,G|upstream_gene_variant|MODIFIER|FRG1|ENSG2",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].gene, "DUX4");
        assert_eq!(entries[1].gene, "FRG1");
    }

    #[test]
    fn test_expand_ann_field_short_entries_dropped() {
        // Entries need more than four pipe-separated sub-fields to contribute
        assert!(expand_ann_field("G|missense_variant|MODERATE|DUX4").is_empty());
        assert_eq!(
            expand_ann_field("a|b|c,G|missense_variant|MODERATE|DUX4|ENSG1").len(),
            1
        );
    }

    #[test]
    fn test_expand_ann_field_exactly_five_subfields_kept() {
        assert_eq!(expand_ann_field("a|b|c|d|e").len(), 1);
    }

    #[test]
    fn test_expand_ann_field_empty_value() {
        assert!(expand_ann_field("").is_empty());
    }

    #[test]
    fn test_expand_ann_field_is_pure() {
        let value = "G|missense_variant|MODERATE|DUX4|ENSG1,a|b|c";
        assert_eq!(expand_ann_field(value), expand_ann_field(value));
    }
}
