use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;

use crate::errs::{DecodeError, DecodeResult};

/// The three germline segments of a heavy-chain rearrangement, in genomic
/// order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Region {
    V,
    D,
    J,
}

pub const REGIONS: [Region; 3] = [Region::V, Region::D, Region::J];

impl Region {
    pub fn parse_char(x: char) -> Option<Self> {
        match x {
            'V' => Some(Self::V),
            'D' => Some(Self::D),
            'J' => Some(Self::J),
            _ => None,
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Region::V => 'v',
            Region::D => 'd',
            Region::J => 'j',
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// The germline gene catalogue: an ordered list of gene names per region and
/// the germline nucleotide sequence of each gene. Immutable once built.
#[derive(Debug)]
pub struct GermlineCatalog {
    family: String,
    names: BTreeMap<Region, Vec<String>>,
    seqs: FxHashMap<String, String>,
}

impl GermlineCatalog {
    /// Build a catalogue from (gene name, germline sequence) pairs per
    /// region. Every gene name must start with the family prefix and carry
    /// the region letter right after it.
    pub fn new(
        family: &str,
        genes: BTreeMap<Region, Vec<(String, String)>>,
    ) -> DecodeResult<Self> {
        let mut names = BTreeMap::new();
        let mut seqs = FxHashMap::default();
        for region in REGIONS {
            let mut region_names = Vec::new();
            for (name, seq) in genes.get(&region).into_iter().flatten() {
                let parsed = region_of(family, name)?;
                if parsed != region {
                    return Err(DecodeError::UnknownRegion(name.clone()));
                }
                region_names.push(name.clone());
                seqs.insert(name.clone(), seq.clone());
            }
            names.insert(region, region_names);
        }
        Ok(Self { family: family.to_string(), names, seqs })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn names(&self, region: Region) -> &[String] {
        self.names.get(&region).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn seq(&self, gene: &str) -> Option<&str> {
        self.seqs.get(gene).map(|s| s.as_str())
    }

    pub fn region_of(&self, gene: &str) -> DecodeResult<Region> {
        region_of(&self.family, gene)
    }

    /// Deterministic file-system-safe rendering of a gene name, used to
    /// locate the gene's model file.
    pub fn sanitize_name(&self, gene: &str) -> String {
        gene.replace('*', "_star_").replace('/', "_slash_")
    }
}

fn region_of(family: &str, gene: &str) -> DecodeResult<Region> {
    gene.strip_prefix(family)
        .and_then(|rest| rest.chars().next())
        .and_then(Region::parse_char)
        .ok_or_else(|| DecodeError::UnknownRegion(gene.to_string()))
}
