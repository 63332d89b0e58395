use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::log_space::{log_product, log_sum_exp};
use crate::model::Model;
use crate::sequences::{nuc_index, Sequences};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Algorithm {
    Viterbi,
    Forward,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Viterbi => write!(f, "viterbi"),
            Algorithm::Forward => write!(f, "forward"),
        }
    }
}

/// The best path through an HMM: one state name per emitted base, plus the
/// path's log-probability. The score is recomputed along the path in the
/// same association order as the DP fold, so it equals
/// `ending_viterbi_log_prob()` exactly.
#[derive(Debug, Clone)]
pub struct TracebackPath {
    names: Vec<String>,
    score: f64,
}

impl TracebackPath {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The DP structure for one (model, query) pairing. Tables are computed
/// lazily by `viterbi()`/`forward()`; a trellis may be seeded from another
/// trellis over a shared column prefix, in which case only the remaining
/// columns are computed.
pub struct Trellis {
    model: Arc<Model>,
    codes: Vec<Vec<usize>>,
    n_cols: usize,
    pair: bool,
    viterbi_scores: Vec<Vec<f64>>,
    viterbi_pointers: Vec<Vec<Option<u32>>>,
    forward_scores: Vec<Vec<f64>>,
    ending_viterbi_log_prob: f64,
    ending_viterbi_state: Option<usize>,
    ending_forward_log_prob: f64,
}

impl Trellis {
    pub fn new(model: Arc<Model>, seqs: &Sequences) -> Self {
        let codes = seqs
            .iter()
            .map(|seq| {
                seq.seq()
                    .bytes()
                    .map(|b| {
                        nuc_index(b).expect("sequences are validated ACGT")
                    })
                    .collect::<Vec<usize>>()
            })
            .collect::<Vec<Vec<usize>>>();
        let n_cols = seqs.seq_len();
        let pair = seqs.n_seqs() == 2;
        Self {
            model,
            codes,
            n_cols,
            pair,
            viterbi_scores: Vec::new(),
            viterbi_pointers: Vec::new(),
            forward_scores: Vec::new(),
            ending_viterbi_log_prob: f64::NEG_INFINITY,
            ending_viterbi_state: None,
            ending_forward_log_prob: f64::NEG_INFINITY,
        }
    }

    /// Seed a trellis from `cached`, whose sequences must agree with the new
    /// ones on their shared prefix. The shared DP columns are reused and
    /// only the columns past them are ever computed.
    pub fn with_cached(
        model: Arc<Model>,
        seqs: &Sequences,
        cached: &Trellis,
    ) -> Self {
        let mut trell = Self::new(model, seqs);
        let n_shared = std::cmp::min(trell.n_cols, cached.n_cols);
        debug_assert!(
            trell
                .codes
                .iter()
                .zip(cached.codes.iter())
                .all(|(a, b)| a[..n_shared] == b[..n_shared]),
            "seeding trellis from an incompatible cache"
        );
        trell.viterbi_scores =
            cached.viterbi_scores.iter().take(n_shared).cloned().collect();
        trell.viterbi_pointers =
            cached.viterbi_pointers.iter().take(n_shared).cloned().collect();
        trell.forward_scores =
            cached.forward_scores.iter().take(n_shared).cloned().collect();
        trell
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    fn emission_log_prob(&self, state_index: usize, col: usize) -> f64 {
        let state = self.model.state(state_index);
        if self.pair {
            state.pair_emission_log_prob(self.codes[0][col], self.codes[1][col])
        } else {
            state.emission_log_prob(self.codes[0][col])
        }
    }

    pub fn viterbi(&mut self) {
        let n_states = self.model.n_states();
        for col in self.viterbi_scores.len()..self.n_cols {
            let mut scores = vec![f64::NEG_INFINITY; n_states];
            let mut pointers: Vec<Option<u32>> = vec![None; n_states];
            for state in 0..n_states {
                let mut best = f64::NEG_INFINITY;
                let mut best_prev = None;
                if col == 0 {
                    best = self.model.init().transition_log_prob(state);
                } else {
                    let prev_scores = &self.viterbi_scores[col - 1];
                    for prev in 0..n_states {
                        let cand = log_product(
                            prev_scores[prev],
                            self.model.state(prev).transition_log_prob(state),
                        );
                        if cand > best {
                            best = cand;
                            best_prev = Some(prev as u32);
                        }
                    }
                }
                scores[state] =
                    log_product(best, self.emission_log_prob(state, col));
                pointers[state] = best_prev;
            }
            self.viterbi_scores.push(scores);
            self.viterbi_pointers.push(pointers);
        }

        // the ending depends on the final column, so a seeded trellis
        // recomputes it even when every column was reused
        let mut best = f64::NEG_INFINITY;
        let mut best_state = None;
        if let Some(last) = self.viterbi_scores.last() {
            for state in 0..n_states {
                let cand = log_product(
                    last[state],
                    self.model.state(state).end_trans_log_prob(),
                );
                if cand > best {
                    best = cand;
                    best_state = Some(state);
                }
            }
        }
        self.ending_viterbi_log_prob = best;
        self.ending_viterbi_state = best_state;
    }

    pub fn forward(&mut self) {
        let n_states = self.model.n_states();
        for col in self.forward_scores.len()..self.n_cols {
            let mut scores = vec![f64::NEG_INFINITY; n_states];
            for state in 0..n_states {
                let total = if col == 0 {
                    self.model.init().transition_log_prob(state)
                } else {
                    let prev_scores = &self.forward_scores[col - 1];
                    (0..n_states).fold(f64::NEG_INFINITY, |acc, prev| {
                        log_sum_exp(
                            acc,
                            log_product(
                                prev_scores[prev],
                                self.model
                                    .state(prev)
                                    .transition_log_prob(state),
                            ),
                        )
                    })
                };
                scores[state] =
                    log_product(total, self.emission_log_prob(state, col));
            }
            self.forward_scores.push(scores);
        }

        let mut total = f64::NEG_INFINITY;
        if let Some(last) = self.forward_scores.last() {
            for state in 0..n_states {
                total = log_sum_exp(
                    total,
                    log_product(
                        last[state],
                        self.model.state(state).end_trans_log_prob(),
                    ),
                );
            }
        }
        self.ending_forward_log_prob = total;
    }

    pub fn ending_viterbi_log_prob(&self) -> f64 {
        self.ending_viterbi_log_prob
    }

    pub fn ending_forward_log_prob(&self) -> f64 {
        self.ending_forward_log_prob
    }

    /// Reconstruct the best path. Only valid after `viterbi()` found a path
    /// with finite probability.
    pub fn traceback(&self) -> TracebackPath {
        let end_state = self
            .ending_viterbi_state
            .expect("traceback without a finite viterbi path");

        let mut state_indices = vec![0usize; self.n_cols];
        let mut cur = end_state;
        for col in (0..self.n_cols).rev() {
            state_indices[col] = cur;
            if col > 0 {
                cur = self.viterbi_pointers[col][cur]
                    .expect("finite path has a predecessor") as usize;
            }
        }

        let mut score =
            self.model.init().transition_log_prob(state_indices[0]);
        score = log_product(score, self.emission_log_prob(state_indices[0], 0));
        for col in 1..self.n_cols {
            score = log_product(
                score,
                self.model
                    .state(state_indices[col - 1])
                    .transition_log_prob(state_indices[col]),
            );
            score =
                log_product(score, self.emission_log_prob(state_indices[col], col));
        }
        score = log_product(
            score,
            self.model.state(state_indices[self.n_cols - 1]).end_trans_log_prob(),
        );

        let names = state_indices
            .into_iter()
            .map(|i| self.model.state(i).name().to_string())
            .collect();
        TracebackPath { names, score }
    }
}

#[cfg(test)]
mod trellis_tests {
    use std::sync::Arc;

    use assert_approx_eq::assert_approx_eq;

    use crate::model::{Model, RawModel};
    use crate::sequences::{Sequence, Sequences};
    use crate::trellis::Trellis;

    const TOY_DOC: &str = r#"
overall_prob: 1.0
states:
  - name: init
    transitions:
      IGHV5_0: 0.6
      IGHV5_1: 0.4
  - name: IGHV5_0
    transitions:
      IGHV5_0: 0.2
      IGHV5_1: 0.5
      end: 0.3
    emissions:
      probs: [0.7, 0.1, 0.1, 0.1]
  - name: IGHV5_1
    transitions:
      IGHV5_0: 0.3
      IGHV5_1: 0.3
      end: 0.4
    emissions:
      probs: [0.1, 0.1, 0.1, 0.7]
"#;

    fn toy_model() -> Arc<Model> {
        let raw: RawModel = serde_yaml::from_str(TOY_DOC).unwrap();
        Arc::new(Model::from_raw(raw).unwrap())
    }

    fn single(seq: &str) -> Sequences {
        Sequences::from(Sequence::new("q", seq))
    }

    #[test]
    fn test_viterbi_matches_hand_computation() {
        let mut trell = Trellis::new(toy_model(), &single("AT"));
        trell.viterbi();
        // best path is IGHV5_0 -> IGHV5_1:
        // 0.6 * 0.7 * 0.5 * 0.7 * 0.4 = 0.0588
        assert_approx_eq!(trell.ending_viterbi_log_prob(), 0.0588f64.ln());
        let path = trell.traceback();
        assert_eq!(path.names(), ["IGHV5_0", "IGHV5_1"]);
        assert_eq!(path.len(), 2);
        assert_eq!(path.score(), trell.ending_viterbi_log_prob());
    }

    #[test]
    fn test_forward_matches_hand_computation() {
        let mut trell = Trellis::new(toy_model(), &single("AT"));
        trell.forward();
        // sum over the four state sequences of length two
        assert_approx_eq!(trell.ending_forward_log_prob(), 0.06504f64.ln());
    }

    #[test]
    fn test_forward_dominates_viterbi() {
        let mut trell = Trellis::new(toy_model(), &single("ATTA"));
        trell.viterbi();
        trell.forward();
        assert!(
            trell.ending_forward_log_prob() >= trell.ending_viterbi_log_prob()
        );
    }

    #[test]
    fn test_no_valid_path() {
        let doc = r#"
overall_prob: 1.0
states:
  - name: init
    transitions:
      IGHD1_0: 1.0
  - name: IGHD1_0
    transitions:
      end: 1.0
    emissions:
      probs: [1.0, 0.0, 0.0, 0.0]
"#;
        let raw: RawModel = serde_yaml::from_str(doc).unwrap();
        let model = Arc::new(Model::from_raw(raw).unwrap());
        let mut trell = Trellis::new(model, &single("T"));
        trell.viterbi();
        assert_eq!(trell.ending_viterbi_log_prob(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_seeded_trellis_agrees_with_scratch() {
        let model = toy_model();
        let mut long = Trellis::new(Arc::clone(&model), &single("ATA"));
        long.viterbi();
        long.forward();

        let prefix = single("AT");
        let mut seeded =
            Trellis::with_cached(Arc::clone(&model), &prefix, &long);
        seeded.viterbi();
        seeded.forward();

        let mut scratch = Trellis::new(model, &prefix);
        scratch.viterbi();
        scratch.forward();

        assert_eq!(
            seeded.ending_viterbi_log_prob(),
            scratch.ending_viterbi_log_prob()
        );
        assert_eq!(
            seeded.ending_forward_log_prob(),
            scratch.ending_forward_log_prob()
        );
        assert_eq!(seeded.traceback().names(), scratch.traceback().names());
    }
}
