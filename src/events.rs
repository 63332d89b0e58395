use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use itertools::Itertools;
use lazy_static::lazy_static;

use crate::germline::Region;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

lazy_static! {
    /// Labelled inserts carried by each region's path. The V-D insert sits
    /// at the left edge of the D territory and the D-J insert at the left
    /// edge of the J territory; the post-J insert hangs off the right.
    pub(crate) static ref INSERTION_LABELS: BTreeMap<Region, Vec<&'static str>> =
        BTreeMap::from([
            (Region::V, vec![]),
            (Region::D, vec!["vd"]),
            (Region::J, vec!["dj", "jf"]),
        ]);
}

pub(crate) fn insertion_side(label: &str) -> Side {
    if label == "jf" {
        Side::Right
    } else {
        Side::Left
    }
}

/// The chosen gene for one region and how many germline bases the
/// rearrangement trimmed off each end.
#[derive(Debug, Clone)]
pub struct RegionCall {
    pub gene: String,
    pub left_erosion: usize,
    pub right_erosion: usize,
}

/// One reconstructed recombination event: the gene triplet, erosions,
/// labelled non-templated insertions, the observed sequence(s), and the
/// event's log-probability.
#[derive(Debug, Clone, Default)]
pub struct RecombEvent {
    calls: BTreeMap<Region, RegionCall>,
    insertions: IndexMap<String, String>,
    seq_name: String,
    seq: String,
    second_seq: Option<(String, String)>,
    score: f64,
}

impl RecombEvent {
    pub(crate) fn set_call(&mut self, region: Region, call: RegionCall) {
        self.calls.insert(region, call);
    }

    pub(crate) fn set_insertion(&mut self, label: &str, bases: String) {
        self.insertions.insert(label.to_string(), bases);
    }

    pub(crate) fn set_seq(&mut self, name: &str, seq: String) {
        self.seq_name = name.to_string();
        self.seq = seq;
    }

    pub(crate) fn set_second_seq(&mut self, name: &str, seq: String) {
        self.second_seq = Some((name.to_string(), seq));
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    pub fn call(&self, region: Region) -> Option<&RegionCall> {
        self.calls.get(&region)
    }

    pub fn insertion(&self, label: &str) -> Option<&str> {
        self.insertions.get(label).map(|s| s.as_str())
    }

    pub fn insertions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.insertions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn seq_name(&self) -> &str {
        &self.seq_name
    }

    pub fn seq(&self) -> &str {
        &self.seq
    }

    pub fn second_seq(&self) -> Option<(&str, &str)> {
        self.second_seq.as_ref().map(|(n, s)| (n.as_str(), s.as_str()))
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

impl Display for RecombEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let calls = self
            .calls
            .iter()
            .map(|(region, call)| {
                format!(
                    "{region}={}({}/{})",
                    call.gene, call.left_erosion, call.right_erosion
                )
            })
            .join(" ");
        let inserts = self
            .insertions
            .iter()
            .map(|(label, bases)| {
                format!(
                    "{label}:{}",
                    if bases.is_empty() { "-" } else { bases }
                )
            })
            .join(" ");
        write!(f, "{} {calls} {inserts} {:.4}", self.seq_name, self.score)
    }
}
