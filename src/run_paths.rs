//! Derived working-directory tree for one pipeline run
//!

use camino::Utf8PathBuf;

use crate::cli;

pub const REFERENCE_FILENAME: &str = "Homo_sapiens_GRCh38_no_alt.fasta";

/// Clair3 model for Nanopore Kit14 400bps sup basecalling, relative to the resource directory
pub const CLAIR3_MODEL_DIRNAME: &str = "clair3/r1041_e82_400bps_sup_v500";
pub const SNPEFF_JAR_FILENAME: &str = "snpEff/snpEff.jar";
pub const SNPSIFT_JAR_FILENAME: &str = "snpEff/SnpSift.jar";
pub const CLINVAR_DB_FILENAME: &str = "snpEff/clinvar_20250729.vcf.gz";

pub const VARIANT_DIRNAME: &str = "variant-calling";
pub const CLAIR3_DIRNAME: &str = "clair3";

pub const PHASED_VCF_FILENAME: &str = "phased_merge_output.vcf.gz";
pub const SNPEFF_VCF_FILENAME: &str = "phased_merge_HG38_SnpEff.vcf";
pub const SNPEFF_VCF_GZ_FILENAME: &str = "phased_merge_HG38_SnpEff.vcf.gz";
pub const CLINVAR_VCF_FILENAME: &str = "phased_merge_HG38_snpeff-clinvar.vcf";
pub const CLINVAR_VCF_GZ_FILENAME: &str = "phased_merge_HG38_Clinvar.vcf.gz";
pub const FSHD_VCF_FILENAME: &str = "fshd_relevant.vcf";
pub const FSHD_TSV_FILENAME: &str = "fshd_relevant.tsv";
pub const FILTER_PROVENANCE_FILENAME: &str = "fshd_filter_provenance.txt";
pub const HAPLOTAG_LIST_FILENAME: &str = "haplotag-list.tsv";

/// All input and derived artifact paths for one sample run
///
/// Created once from the validated command-line settings and immutable for the run's lifetime.
/// Every pipeline stage resolves its file arguments through this structure instead of assembling
/// path strings ad hoc.
///
pub struct RunPaths {
    /// Sample name, taken as the alignment filename truncated at its first '.'
    pub sample_name: String,

    pub bam_filename: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub reference_filename: Utf8PathBuf,
    pub t2t_bam_filename: Utf8PathBuf,
    pub resource_dir: Utf8PathBuf,
    pub thread_count: usize,
}

impl RunPaths {
    pub fn new(settings: &cli::Settings) -> Self {
        let bam_filename = Utf8PathBuf::from(&settings.bam_filename);
        let sample_name = bam_filename
            .file_name()
            .unwrap_or_default()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            sample_name,
            bam_filename,
            output_dir: settings.output_dir.clone(),
            reference_filename: settings.ref_dir.join(REFERENCE_FILENAME),
            t2t_bam_filename: Utf8PathBuf::from(&settings.t2t_bam_filename),
            resource_dir: settings.resource_dir.clone().unwrap_or_default(),
            thread_count: settings.thread_count,
        }
    }

    pub fn variant_dir(&self) -> Utf8PathBuf {
        self.output_dir.join(VARIANT_DIRNAME)
    }

    pub fn clair3_dir(&self) -> Utf8PathBuf {
        self.variant_dir().join(CLAIR3_DIRNAME)
    }

    /// Phased small-variant VCF produced by clair3
    pub fn phased_vcf(&self) -> Utf8PathBuf {
        self.clair3_dir().join(PHASED_VCF_FILENAME)
    }

    pub fn haploblocks_gtf(&self) -> Utf8PathBuf {
        self.variant_dir()
            .join(format!("{}_haploblocks.gtf", self.sample_name))
    }

    pub fn haplotagged_bam(&self) -> Utf8PathBuf {
        self.variant_dir()
            .join(format!("{}_haplotagged.bam", self.sample_name))
    }

    pub fn haplotagged_bam_index(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.bai", self.haplotagged_bam()))
    }

    pub fn haplotag_list(&self) -> Utf8PathBuf {
        self.variant_dir().join(HAPLOTAG_LIST_FILENAME)
    }

    /// Structural variants called from the phased GRCh38 alignment
    pub fn sniffles_hg38_vcf(&self) -> Utf8PathBuf {
        self.variant_dir().join(format!(
            "{}_haplotagged_sniffles2_phased.vcf",
            self.sample_name
        ))
    }

    /// Structural variants called from the T2T alignment, written beside the T2T BAM
    pub fn sniffles_t2t_vcf(&self) -> Utf8PathBuf {
        let t2t_name = self.t2t_bam_filename.file_name().unwrap_or_default();
        let t2t_dir = self
            .t2t_bam_filename
            .parent()
            .map(|x| x.to_path_buf())
            .unwrap_or_default();
        t2t_dir.join(format!("{t2t_name}_sniffles2.vcf"))
    }

    pub fn snpeff_vcf(&self) -> Utf8PathBuf {
        self.clair3_dir().join(SNPEFF_VCF_FILENAME)
    }

    pub fn snpeff_vcf_gz(&self) -> Utf8PathBuf {
        self.clair3_dir().join(SNPEFF_VCF_GZ_FILENAME)
    }

    pub fn clinvar_vcf(&self) -> Utf8PathBuf {
        self.clair3_dir().join(CLINVAR_VCF_FILENAME)
    }

    pub fn clinvar_vcf_gz(&self) -> Utf8PathBuf {
        self.clair3_dir().join(CLINVAR_VCF_GZ_FILENAME)
    }

    pub fn fshd_vcf(&self) -> Utf8PathBuf {
        self.clair3_dir().join(FSHD_VCF_FILENAME)
    }

    pub fn fshd_tsv(&self) -> Utf8PathBuf {
        self.clair3_dir().join(FSHD_TSV_FILENAME)
    }

    pub fn filter_provenance(&self) -> Utf8PathBuf {
        self.clair3_dir().join(FILTER_PROVENANCE_FILENAME)
    }

    pub fn clair3_model_dir(&self) -> Utf8PathBuf {
        self.resource_dir.join(CLAIR3_MODEL_DIRNAME)
    }

    pub fn snpeff_jar(&self) -> Utf8PathBuf {
        self.resource_dir.join(SNPEFF_JAR_FILENAME)
    }

    pub fn snpsift_jar(&self) -> Utf8PathBuf {
        self.resource_dir.join(SNPSIFT_JAR_FILENAME)
    }

    pub fn clinvar_db(&self) -> Utf8PathBuf {
        self.resource_dir.join(CLINVAR_DB_FILENAME)
    }

    /// Paths that exist before any stage runs, for the stage ordering check
    pub fn preexisting_inputs(&self) -> Vec<Utf8PathBuf> {
        vec![
            self.bam_filename.clone(),
            self.reference_filename.clone(),
            self.t2t_bam_filename.clone(),
            self.clair3_model_dir(),
            self.snpeff_jar(),
            self.snpsift_jar(),
            self.clinvar_db(),
        ]
    }
}
