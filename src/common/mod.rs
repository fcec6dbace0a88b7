//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Canonicalize a chromosome name: strip any `chr` prefix and normalize the
/// mitochondrial name to `MT`.
pub fn canonical_chrom(chrom: &str) -> String {
    let stripped = chrom.strip_prefix("chr").unwrap_or(chrom);
    let upper = stripped.to_uppercase();
    if upper == "M" {
        String::from("MT")
    } else {
        upper
    }
}

/// Build mapping of chromosome names to chromosome counts.
pub fn build_chrom_map() -> IndexMap<String, usize> {
    let mut result = IndexMap::new();
    for (i, &chrom_name) in CHROMS.iter().enumerate() {
        result.insert(chrom_name.to_owned(), i);
        result.insert(format!("chr{chrom_name}").to_owned(), i);
    }
    result.insert("x".to_owned(), 22);
    result.insert("y".to_owned(), 23);
    result.insert("chrx".to_owned(), 22);
    result.insert("chry".to_owned(), 23);
    result.insert("mt".to_owned(), 24);
    result.insert("m".to_owned(), 24);
    result.insert("chrmt".to_owned(), 24);
    result.insert("chrm".to_owned(), 24);
    result.insert("M".to_owned(), 24);
    result.insert("chrM".to_owned(), 24);
    result
}

/// Return the number of the chromosome for deterministic ordering.
///
/// Unknown contigs sort after all canonical ones.
pub fn chrom_no(chrom: &str) -> usize {
    let canon = canonical_chrom(chrom);
    CHROMS
        .iter()
        .position(|&c| c == canon)
        .unwrap_or(CHROMS.len())
}

/// Strip the leading `/` or `|` from a genotype string, if any.
pub fn strip_gt_leading_slash(gt_str: &str) -> &str {
    if gt_str.starts_with('/') || gt_str.starts_with('|') {
        &gt_str[1..]
    } else {
        gt_str
    }
}

/// Helper type for encoding chromosome classes for zygosity computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Chrom {
    /// Autosome or chrMT, does not matter for zygosity computation.
    Auto,
    /// X chromosome.
    X,
    /// Y chromosome.
    Y,
}

impl std::str::FromStr for Chrom {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match canonical_chrom(s).as_str() {
            "X" => Chrom::X,
            "Y" => Chrom::Y,
            _ => Chrom::Auto,
        })
    }
}

/// The version of the `varfilter` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `varfilter` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("chr1", "1")]
    #[case("1", "1")]
    #[case("chrX", "X")]
    #[case("x", "X")]
    #[case("chrM", "MT")]
    #[case("MT", "MT")]
    #[case("m", "MT")]
    fn canonical_chrom(#[case] chrom: &str, #[case] expected: &str) {
        assert_eq!(super::canonical_chrom(chrom), expected);
    }

    #[rstest::rstest]
    #[case("1", 0)]
    #[case("chr22", 21)]
    #[case("X", 22)]
    #[case("chrY", 23)]
    #[case("MT", 24)]
    #[case("HLA-A", 25)]
    fn chrom_no(#[case] chrom: &str, #[case] expected: usize) {
        assert_eq!(super::chrom_no(chrom), expected);
    }

    #[rstest::rstest]
    #[case("/0/1", "0/1")]
    #[case("|1", "1")]
    #[case("0/1", "0/1")]
    fn strip_gt_leading_slash(#[case] gt: &str, #[case] expected: &str) {
        assert_eq!(super::strip_gt_leading_slash(gt), expected);
    }

    #[test]
    fn build_chrom_map_has_all_aliases() {
        let map = super::build_chrom_map();
        assert_eq!(map.get("chr1"), Some(&0));
        assert_eq!(map.get("MT"), Some(&24));
        assert_eq!(map.get("chrM"), Some(&24));
    }
}
