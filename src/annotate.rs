use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::errs::{DecodeError, DecodeResult};
use crate::events::{
    insertion_side, RecombEvent, RegionCall, Side, INSERTION_LABELS,
};
use crate::germline::{GermlineCatalog, Region, REGIONS};
use crate::kspace::{KBounds, KSet, QueryResult};
use crate::log_space::{log_product, log_sum_exp};
use crate::model_store::ModelStore;
use crate::sequences::Sequences;
use crate::trellis::{Algorithm, TracebackPath, Trellis};

/// The observed string(s) of a region slice; the second member is empty for
/// single-sequence queries. Used as the cache key for trellises, paths and
/// scores.
pub(crate) type StrPair = (String, String);

/// Insert (N-region) states are identified by their name prefix.
pub(crate) fn is_insert_state(name: &str) -> bool {
    name.starts_with("insert")
}

fn insert_length(side: Side, names: &[String]) -> usize {
    match side {
        Side::Left => {
            names.iter().take_while(|n| is_insert_state(n)).count()
        }
        Side::Right => {
            names.iter().rev().take_while(|n| is_insert_state(n)).count()
        }
    }
}

fn insert_start(side: Side, path_length: usize, insert_length: usize) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => path_length - insert_length,
    }
}

/// Germline position encoded in a state name `<family><gene>_<position>`.
fn state_position(family: &str, name: &str) -> DecodeResult<usize> {
    if !name.starts_with(family) {
        return Err(DecodeError::StateNameUnparseable(name.to_string()));
    }
    name.rsplit_once('_')
        .and_then(|(_, position)| position.parse::<usize>().ok())
        .ok_or_else(|| DecodeError::StateNameUnparseable(name.to_string()))
}

/// Bases trimmed off one end of the germline gene, read off the position of
/// the outermost non-insert state in the path.
fn erosion_length(
    family: &str,
    side: Side,
    names: &[String],
    germline: &str,
) -> DecodeResult<usize> {
    // a path of nothing but inserts carries no positional anchor, so split
    // the germline down the middle
    if names.iter().all(|n| is_insert_state(n)) {
        return Ok(match side {
            Side::Left => germline.len() / 2,
            Side::Right => germline.len() - germline.len() / 2,
        });
    }

    let anchor = match side {
        Side::Left => names.iter().find(|n| !is_insert_state(n)),
        Side::Right => names.iter().rev().find(|n| !is_insert_state(n)),
    }
    .expect("a non-insert state exists past the all-insert check");
    let position = state_position(family, anchor)?;
    if position >= germline.len() {
        return Err(DecodeError::StateNameUnparseable(anchor.clone()));
    }
    Ok(match side {
        Side::Left => position,
        Side::Right => germline.len() - position - 1,
    })
}

/// Per-gene best scores for one query, renderable as a single CSV record.
pub struct GeneScoreReport<'a> {
    pub query_name: &'a str,
    scores: &'a BTreeMap<String, f64>,
}

impl GeneScoreReport<'_> {
    /// `<query_name>,<gene>:<score>;<gene>:<score>` with no trailing
    /// semicolon.
    pub fn to_record(&self) -> String {
        let scores = self
            .scores
            .iter()
            .map(|(gene, score)| format!("{gene}:{score}"))
            .join(";");
        format!("{},{}\n", self.query_name, scores)
    }
}

/// The search engine. Holds the per-query caches; `run()` clears them on
/// entry, so one annotator serves any number of queries sequentially.
pub struct Annotator<'a> {
    catalog: &'a GermlineCatalog,
    models: &'a ModelStore<'a>,
    algorithm: Algorithm,
    chunk_cache: bool,
    only_genes: BTreeMap<Region, HashSet<String>>,
    trellisi: IndexMap<String, IndexMap<StrPair, Trellis>>,
    paths: IndexMap<String, IndexMap<StrPair, Option<TracebackPath>>>,
    all_scores: IndexMap<String, IndexMap<StrPair, f64>>,
    best_per_gene_scores: BTreeMap<String, f64>,
}

impl<'a> Annotator<'a> {
    /// `only_genes` restricts the search to the listed genes; when
    /// non-empty it must leave at least one gene in every region.
    pub fn new(
        catalog: &'a GermlineCatalog,
        models: &'a ModelStore<'a>,
        algorithm: Algorithm,
        only_genes: &[String],
    ) -> DecodeResult<Self> {
        let mut whitelist: BTreeMap<Region, HashSet<String>> =
            REGIONS.iter().map(|&r| (r, HashSet::new())).collect();
        if !only_genes.is_empty() {
            for gene in only_genes {
                let region = catalog.region_of(gene)?;
                whitelist
                    .get_mut(&region)
                    .expect("whitelist covers every region")
                    .insert(gene.clone());
            }
            for region in REGIONS {
                assert!(
                    !whitelist[&region].is_empty(),
                    "gene whitelist leaves region {region} empty"
                );
            }
        }
        Ok(Self {
            catalog,
            models,
            algorithm,
            chunk_cache: false,
            only_genes: whitelist,
            trellisi: IndexMap::new(),
            paths: IndexMap::new(),
            all_scores: IndexMap::new(),
            best_per_gene_scores: BTreeMap::new(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Reuse DP columns of an already computed trellis when a region slice
    /// is a prefix of one scored earlier in the k loop.
    pub fn set_chunk_cache(&mut self, enabled: bool) {
        self.chunk_cache = enabled;
    }

    /// Release every per-query trellis, path and score. Called on entry to
    /// `run()`; the engine never allocates trellises outside a run.
    pub fn clear(&mut self) {
        self.trellisi.clear();
        self.paths.clear();
        self.all_scores.clear();
        self.best_per_gene_scores.clear();
    }

    fn subseqs_for(seqs: &Sequences, kset: KSet, region: Region) -> Sequences {
        match region {
            // v region (plus the vd insert) runs from zero up to k_v
            Region::V => seqs.subseqs(0, kset.v),
            // d region runs from k_v up to k_v + k_d
            Region::D => seqs.subseqs(kset.v, kset.d),
            // j region takes the rest
            Region::J => seqs
                .subseqs(kset.v + kset.d, seqs.seq_len() - kset.v - kset.d),
        }
    }

    fn query_strs(seqs: &Sequences) -> StrPair {
        let second = if seqs.n_seqs() == 2 {
            seqs[1].seq().to_string()
        } else {
            String::new()
        };
        (seqs[0].seq().to_string(), second)
    }

    /// Decode one query over the given k ranges.
    pub fn run(
        &mut self,
        seqs: &Sequences,
        kbounds: KBounds,
    ) -> DecodeResult<QueryResult> {
        assert!(
            kbounds.vmax > kbounds.vmin && kbounds.dmax > kbounds.dmin,
            "empty k range: {kbounds}"
        );
        assert!(
            kbounds.vmin >= 1 && kbounds.dmin >= 1,
            "k_v and k_d lower bounds must be positive: {kbounds}"
        );
        assert!(
            seqs.n_seqs() == 1 || seqs.n_seqs() == 2,
            "queries carry one or two sequences, got {}",
            seqs.n_seqs()
        );
        self.clear();

        let mut best_scores: FxHashMap<KSet, f64> = FxHashMap::default();
        let mut total_scores: FxHashMap<KSet, f64> = FxHashMap::default();
        let mut best_genes: FxHashMap<KSet, BTreeMap<Region, String>> =
            FxHashMap::default();

        let mut result = QueryResult::new(kbounds);
        let mut best_score = f64::NEG_INFINITY;
        let mut best_kset = KSet::new(0, 0);
        let mut n_too_long = 0usize;
        for k_v in (kbounds.vmin..kbounds.vmax).rev() {
            for k_d in (kbounds.dmin..kbounds.dmax).rev() {
                if k_v + k_d >= seqs.seq_len() {
                    n_too_long += 1;
                    continue;
                }
                let kset = KSet::new(k_v, k_d);
                self.run_kset(
                    seqs,
                    kset,
                    &mut best_scores,
                    &mut total_scores,
                    &mut best_genes,
                )?;
                // log P_tot = log sum_k P_k
                result.total_score =
                    log_sum_exp(total_scores[&kset], result.total_score);
                if best_scores[&kset] > best_score {
                    best_score = best_scores[&kset];
                    best_kset = kset;
                }
                if self.algorithm == Algorithm::Viterbi
                    && best_scores[&kset] != f64::NEG_INFINITY
                {
                    let event = self.fill_event(
                        seqs,
                        kset,
                        &best_genes[&kset],
                        best_scores[&kset],
                    )?;
                    result.events.push(event);
                }
            }
        }
        if n_too_long > 0 {
            debug!(
                "skipped {n_too_long} k sets longer than the sequence for {}",
                seqs[0].name()
            );
        }

        if best_kset.v == 0 {
            warn!(
                "no valid paths for {}{}",
                seqs[0].name(),
                if seqs.n_seqs() == 2 {
                    format!(" {}", seqs[1].name())
                } else {
                    String::new()
                }
            );
            result.no_path = true;
            return Ok(result);
        }

        if self.algorithm == Algorithm::Viterbi {
            result.events.sort_by(|a, b| a.score().total_cmp(&b.score()));
            result.events.reverse();
        }

        result.check_boundaries(best_kset, kbounds);
        if result.boundary_error() {
            // not necessarily a problem yet, the caller can retry wider
            warn!(
                "maximum at k space boundary for {}: best {:?} in {kbounds}, \
                 expand to {}",
                seqs[0].name(),
                best_kset,
                result.better_kbounds()
            );
        }

        Ok(result)
    }

    /// Score every candidate gene of every region against the slices of one
    /// kset, filling the per-kset best and total scores and the best gene
    /// triplet.
    fn run_kset(
        &mut self,
        seqs: &Sequences,
        kset: KSet,
        best_scores: &mut FxHashMap<KSet, f64>,
        total_scores: &mut FxHashMap<KSet, f64>,
        best_genes: &mut FxHashMap<KSet, BTreeMap<Region, String>>,
    ) -> DecodeResult<()> {
        best_scores.insert(kset, f64::NEG_INFINITY);
        total_scores.insert(kset, f64::NEG_INFINITY);
        best_genes.insert(kset, BTreeMap::new());
        debug!("kset k_v {} k_d {}", kset.v, kset.d);

        let catalog = self.catalog;
        let mut regional_best: BTreeMap<Region, f64> = BTreeMap::new();
        let mut regional_total: BTreeMap<Region, f64> = BTreeMap::new();
        for region in REGIONS {
            let query_seqs = Self::subseqs_for(seqs, kset, region);
            let query_strs = Self::query_strs(&query_seqs);
            regional_best.insert(region, f64::NEG_INFINITY);
            regional_total.insert(region, f64::NEG_INFINITY);

            let mut n_genes = 0usize;
            let mut n_short_v = 0usize;
            let mut n_long_erosions = 0usize;
            for gene in catalog.names(region) {
                if !self.only_genes[&region].is_empty()
                    && !self.only_genes[&region].contains(gene)
                {
                    continue;
                }
                n_genes += 1;
                let germline = catalog
                    .seq(gene)
                    .expect("catalogue genes carry a sequence");
                // a query longer than the whole v germline cannot be
                // explained by erosion (d and j absorb overflow as inserts)
                if region == Region::V && query_strs.0.len() > germline.len()
                {
                    n_short_v += 1;
                    continue;
                }
                if query_strs.0.len() + 10 < germline.len() {
                    n_long_erosions += 1;
                }

                let cached = self
                    .all_scores
                    .get(gene.as_str())
                    .and_then(|m| m.get(&query_strs))
                    .copied();
                let gene_score = match cached {
                    Some(score) => score,
                    None => {
                        let raw = self.fill_trellis(
                            &query_seqs,
                            &query_strs,
                            gene,
                        )?;
                        // correct for the prior probability of choosing
                        // this gene at all
                        let model = self.models.get(gene)?;
                        let score =
                            log_product(raw, model.overall_prob().ln());
                        self.all_scores
                            .entry(gene.clone())
                            .or_default()
                            .insert(query_strs.clone(), score);
                        score
                    }
                };

                regional_total.insert(
                    region,
                    log_sum_exp(gene_score, regional_total[&region]),
                );
                if gene_score > regional_best[&region] {
                    regional_best.insert(region, gene_score);
                    best_genes
                        .get_mut(&kset)
                        .expect("kset entry inserted above")
                        .insert(region, gene.clone());
                }
                let best_for_gene = self
                    .best_per_gene_scores
                    .entry(gene.clone())
                    .or_insert(f64::NEG_INFINITY);
                if gene_score > *best_for_gene {
                    *best_for_gene = gene_score;
                }
            }

            if !best_genes[&kset].contains_key(&region) {
                debug!(
                    "no valid gene for {region} at k_v {} k_d {}, skipping \
                     kset ({n_short_v}/{n_genes} v germlines too short, \
                     {n_long_erosions}/{n_genes} would need more than 10 \
                     erosions)",
                    kset.v, kset.d
                );
                return Ok(());
            }
        }

        // best = P_v * P_d * P_j over the best gene of each region, total
        // likewise over the per-region sums
        best_scores.insert(
            kset,
            log_product(
                regional_best[&Region::V],
                log_product(
                    regional_best[&Region::D],
                    regional_best[&Region::J],
                ),
            ),
        );
        total_scores.insert(
            kset,
            log_product(
                regional_total[&Region::V],
                log_product(
                    regional_total[&Region::D],
                    regional_total[&Region::J],
                ),
            ),
        );
        Ok(())
    }

    /// Build (or chunk-extend) the trellis for one (gene, slice) pairing and
    /// return the raw decode score, caching the trellis and, under Viterbi,
    /// the traceback path.
    fn fill_trellis(
        &mut self,
        query_seqs: &Sequences,
        query_strs: &StrPair,
        gene: &str,
    ) -> DecodeResult<f64> {
        let model = self.models.get(gene)?;
        let gene_trellisi =
            self.trellisi.entry(gene.to_string()).or_default();

        let mut trell = None;
        let mut origin = "scratch";
        if self.chunk_cache {
            // an earlier (longer) slice of this gene may already hold every
            // DP column we need
            for (cached_strs, cached_trell) in gene_trellisi.iter() {
                if cached_strs.0.starts_with(&query_strs.0) {
                    assert!(
                        cached_strs.1.starts_with(&query_strs.1),
                        "pair members disagree on chunk compatibility"
                    );
                    trell = Some(Trellis::with_cached(
                        Arc::clone(&model),
                        query_seqs,
                        cached_trell,
                    ));
                    origin = "chunk";
                    break;
                }
            }
        }
        let mut trell = trell
            .unwrap_or_else(|| Trellis::new(Arc::clone(&model), query_seqs));

        let score;
        let path = match self.algorithm {
            Algorithm::Viterbi => {
                trell.viterbi();
                score = trell.ending_viterbi_log_prob();
                if score == f64::NEG_INFINITY {
                    debug!("no valid path through {gene} ({origin})");
                    None
                } else {
                    let traceback = trell.traceback();
                    assert_eq!(
                        traceback.score(),
                        score,
                        "traceback disagrees with the trellis ending for \
                         {gene}"
                    );
                    assert!(!traceback.is_empty());
                    Some(traceback)
                }
            }
            Algorithm::Forward => {
                trell.forward();
                score = trell.ending_forward_log_prob();
                // keeps the paths and trellisi keysets in lockstep
                None
            }
        };
        debug!("{gene} {score} ({origin})");

        gene_trellisi.insert(query_strs.clone(), trell);
        self.paths
            .entry(gene.to_string())
            .or_default()
            .insert(query_strs.clone(), path);
        Ok(score)
    }

    /// Reconstruct the recombination event for a kset from the cached
    /// Viterbi paths of its best gene triplet.
    fn fill_event(
        &self,
        seqs: &Sequences,
        kset: KSet,
        best_genes: &BTreeMap<Region, String>,
        score: f64,
    ) -> DecodeResult<RecombEvent> {
        let mut event = RecombEvent::default();
        let mut seq_strs = (String::new(), String::new());
        for region in REGIONS {
            let query_strs =
                Self::query_strs(&Self::subseqs_for(seqs, kset, region));
            let gene = best_genes
                .get(&region)
                .expect("a finite kset has a best gene per region");
            let path = self
                .paths
                .get(gene.as_str())
                .and_then(|m| m.get(&query_strs))
                .expect("the best gene's trellis was cached")
                .as_ref()
                .expect("the best gene has a valid path");
            let names = path.names();
            assert_eq!(names.len(), query_strs.0.len());

            let germline = self
                .catalog
                .seq(gene)
                .expect("catalogue genes carry a sequence");
            let family = self.catalog.family();
            event.set_call(
                region,
                RegionCall {
                    gene: gene.clone(),
                    left_erosion: erosion_length(
                        family,
                        Side::Left,
                        names,
                        germline,
                    )?,
                    right_erosion: erosion_length(
                        family,
                        Side::Right,
                        names,
                        germline,
                    )?,
                },
            );

            for label in INSERTION_LABELS[&region].iter() {
                let side = insertion_side(label);
                let length = insert_length(side, names);
                let start = insert_start(side, names.len(), length);
                event.set_insertion(
                    label,
                    query_strs.0[start..start + length].to_string(),
                );
            }

            seq_strs.0.push_str(&query_strs.0);
            seq_strs.1.push_str(&query_strs.1);
        }

        event.set_seq(seqs[0].name(), seq_strs.0);
        if seqs.n_seqs() == 2 {
            event.set_second_seq(seqs[1].name(), seq_strs.1);
        }
        event.set_score(score);
        Ok(event)
    }

    pub fn gene_score_report<'s>(
        &'s self,
        query_name: &'s str,
    ) -> GeneScoreReport<'s> {
        GeneScoreReport { query_name, scores: &self.best_per_gene_scores }
    }

    /// Append the per-gene best-score CSV record for the last query.
    pub fn write_best_gene_probs<W: Write>(
        &self,
        sink: &mut W,
        query_name: &str,
    ) -> anyhow::Result<u64> {
        let record = self.gene_score_report(query_name).to_record();
        sink.write_all(record.as_bytes())?;
        Ok(1)
    }
}

#[cfg(test)]
mod annotate_tests {
    use std::collections::BTreeMap;

    use crate::annotate::{
        erosion_length, insert_length, insert_start, is_insert_state,
        Annotator,
    };
    use crate::errs::DecodeError;
    use crate::events::Side;
    use crate::germline::{GermlineCatalog, Region};
    use crate::kspace::KBounds;
    use crate::model_store::ModelStore;
    use crate::sequences::{Sequence, Sequences};
    use crate::trellis::Algorithm;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_insert_state() {
        assert!(is_insert_state("insert"));
        assert!(is_insert_state("insert_left"));
        assert!(!is_insert_state("IGHV1_0"));
    }

    #[test]
    fn test_insert_length_and_start() {
        let path = names(&["insert", "insert", "IGHD1_0", "IGHD1_1"]);
        assert_eq!(insert_length(Side::Left, &path), 2);
        assert_eq!(insert_length(Side::Right, &path), 0);
        assert_eq!(insert_start(Side::Left, path.len(), 2), 0);

        let path = names(&["IGHJ1_0", "insert_f", "insert_f"]);
        assert_eq!(insert_length(Side::Left, &path), 0);
        assert_eq!(insert_length(Side::Right, &path), 2);
        assert_eq!(insert_start(Side::Right, path.len(), 2), 1);

        // the reverse scan terminates on an all-insert path
        let path = names(&["insert", "insert"]);
        assert_eq!(insert_length(Side::Right, &path), 2);
        assert_eq!(insert_length(Side::Left, &path), 2);
    }

    #[test]
    fn test_erosion_length_from_anchor_states() {
        // germline ACGTAC, matched positions 2..=4
        let path = names(&["insert", "IGHD9_2", "IGHD9_3", "IGHD9_4"]);
        let germline = "ACGTAC";
        assert_eq!(
            erosion_length("IGH", Side::Left, &path, germline).unwrap(),
            2
        );
        assert_eq!(
            erosion_length("IGH", Side::Right, &path, germline).unwrap(),
            1
        );
    }

    #[test]
    fn test_erosion_length_all_inserts_splits_germline() {
        let path = names(&["insert", "insert", "insert"]);
        let germline = "ACGTA";
        let left =
            erosion_length("IGH", Side::Left, &path, germline).unwrap();
        let right =
            erosion_length("IGH", Side::Right, &path, germline).unwrap();
        assert_eq!(left, 2);
        assert_eq!(right, 3);
        assert_eq!(left + right, germline.len());
    }

    #[test]
    fn test_erosion_length_rejects_foreign_states() {
        let path = names(&["TRBV9_0"]);
        assert!(matches!(
            erosion_length("IGH", Side::Left, &path, "ACGT"),
            Err(DecodeError::StateNameUnparseable(_))
        ));
        let path = names(&["IGHV9"]);
        assert!(matches!(
            erosion_length("IGH", Side::Left, &path, "ACGT"),
            Err(DecodeError::StateNameUnparseable(_))
        ));
    }

    const V_DOC: &str = r#"
overall_prob: 0.2
states:
  - name: init
    transitions: {IGHV1_0: 1.0}
  - name: IGHV1_0
    transitions: {IGHV1_1: 0.5, end: 0.5}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
  - name: IGHV1_1
    transitions: {end: 1.0}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
"#;

    const D_DOC: &str = r#"
overall_prob: 0.3
states:
  - name: init
    transitions: {insert_d: 0.5, IGHD1_0: 0.5}
  - name: insert_d
    transitions: {insert_d: 0.5, IGHD1_0: 0.5}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
  - name: IGHD1_0
    transitions: {IGHD1_1: 0.5, end: 0.5}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
  - name: IGHD1_1
    transitions: {end: 1.0}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
"#;

    const J_DOC: &str = r#"
overall_prob: 0.5
states:
  - name: init
    transitions: {insert_dj: 0.5, IGHJ1_0: 0.5}
  - name: insert_dj
    transitions: {insert_dj: 0.5, IGHJ1_0: 0.5}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
  - name: IGHJ1_0
    transitions: {IGHJ1_1: 0.5, end: 0.5}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
  - name: IGHJ1_1
    transitions: {end: 1.0}
    emissions: {probs: [0.25, 0.25, 0.25, 0.25]}
"#;

    fn tiny_catalog() -> GermlineCatalog {
        let genes = BTreeMap::from([
            (Region::V, vec![("IGHV1".to_string(), "AC".to_string())]),
            (Region::D, vec![("IGHD1".to_string(), "GT".to_string())]),
            (Region::J, vec![("IGHJ1".to_string(), "CA".to_string())]),
        ]);
        GermlineCatalog::new("IGH", genes).unwrap()
    }

    fn write_tiny_models(dir: &std::path::Path) {
        std::fs::write(dir.join("IGHV1.yaml"), V_DOC).unwrap();
        std::fs::write(dir.join("IGHD1.yaml"), D_DOC).unwrap();
        std::fs::write(dir.join("IGHJ1.yaml"), J_DOC).unwrap();
    }

    #[test]
    fn test_caches_stay_in_lockstep() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_models(dir.path());
        let catalog = tiny_catalog();
        let store = ModelStore::new(&catalog, dir.path());
        let mut annotator =
            Annotator::new(&catalog, &store, Algorithm::Viterbi, &[])
                .unwrap();

        let seqs = Sequences::from(Sequence::new("q", "ACGTCA"));
        let result =
            annotator.run(&seqs, KBounds::new(1, 3, 1, 3)).unwrap();
        assert!(!result.no_path);
        assert!(!result.events.is_empty());

        // trellisi and paths hold exactly the same keys, and every stored
        // path covers its slice base for base
        let trellis_keys: Vec<(&String, Vec<_>)> = annotator
            .trellisi
            .iter()
            .map(|(gene, m)| (gene, m.keys().collect()))
            .collect();
        let path_keys: Vec<(&String, Vec<_>)> = annotator
            .paths
            .iter()
            .map(|(gene, m)| (gene, m.keys().collect()))
            .collect();
        assert_eq!(trellis_keys, path_keys);
        for (_, strs_map) in annotator.paths.iter() {
            for (strs, path) in strs_map.iter() {
                if let Some(path) = path {
                    assert_eq!(path.len(), strs.0.len());
                }
            }
        }

        // clear() is the lifecycle boundary
        annotator.clear();
        assert!(annotator.trellisi.is_empty());
        assert!(annotator.paths.is_empty());
        assert!(annotator.all_scores.is_empty());
        assert!(annotator.best_per_gene_scores.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_whitelist_must_cover_every_region() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_models(dir.path());
        let catalog = tiny_catalog();
        let store = ModelStore::new(&catalog, dir.path());
        // only a v gene: d and j end up empty
        let _ = Annotator::new(
            &catalog,
            &store,
            Algorithm::Viterbi,
            &["IGHV1".to_string()],
        );
    }
}
