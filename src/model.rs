use std::path::Path;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::errs::{DecodeError, DecodeResult};

/// Tolerance on per-state transition probabilities summing to 1.
pub const TRANSITION_SUM_EPS: f64 = 1e-6;

pub const INIT_STATE: &str = "init";
pub const END_STATE: &str = "end";

const N_NUCS: usize = 4;

#[derive(Debug, Deserialize)]
pub(crate) struct RawModel {
    #[serde(default)]
    pub name: Option<String>,
    pub overall_prob: f64,
    pub states: Vec<RawState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawState {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub transitions: IndexMap<String, f64>,
    #[serde(default)]
    pub emissions: Option<RawEmission>,
    #[serde(default)]
    pub pair_emissions: Option<RawPairEmission>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEmission {
    #[serde(default)]
    pub track: Option<String>,
    pub probs: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPairEmission {
    #[serde(default)]
    pub tracks: Option<Vec<String>>,
    pub probs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct Transition {
    to_state: String,
    log_prob: f64,
}

impl Transition {
    pub fn to_state(&self) -> &str {
        &self.to_state
    }

    pub fn log_prob(&self) -> f64 {
        self.log_prob
    }
}

/// Per-base emission log-probabilities, indexed by alphabet code.
#[derive(Debug, Clone)]
pub struct EmissionTable {
    log_probs: [f64; N_NUCS],
}

impl EmissionTable {
    #[inline]
    pub fn log_prob(&self, code: usize) -> f64 {
        self.log_probs[code]
    }
}

/// Joint emission log-probabilities for a pair of aligned bases.
#[derive(Debug, Clone)]
pub struct PairEmissionTable {
    log_probs: [[f64; N_NUCS]; N_NUCS],
}

impl PairEmissionTable {
    #[inline]
    pub fn log_prob(&self, code_a: usize, code_b: usize) -> f64 {
        self.log_probs[code_a][code_b]
    }
}

/// One HMM state. After the model is assembled its transition vector is
/// aligned to the model's state table: slot i holds the transition to the
/// state with index i, absent transitions are explicit holes.
#[derive(Debug, Clone)]
pub struct HmmState {
    name: String,
    label: Option<String>,
    transitions: Vec<Option<Transition>>,
    end_trans: Option<Transition>,
    emission: Option<EmissionTable>,
    pair_emission: Option<PairEmissionTable>,
}

impl HmmState {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn transitions(&self) -> &[Option<Transition>] {
        &self.transitions
    }

    #[inline]
    pub fn transition_log_prob(&self, to_index: usize) -> f64 {
        self.transitions
            .get(to_index)
            .and_then(|t| t.as_ref())
            .map(|t| t.log_prob)
            .unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub fn end_trans_log_prob(&self) -> f64 {
        self.end_trans
            .as_ref()
            .map(|t| t.log_prob)
            .unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub(crate) fn emission_log_prob(&self, code: usize) -> f64 {
        self.emission
            .as_ref()
            .map(|e| e.log_prob(code))
            .unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub(crate) fn pair_emission_log_prob(
        &self,
        code_a: usize,
        code_b: usize,
    ) -> f64 {
        self.pair_emission
            .as_ref()
            .map(|e| e.log_prob(code_a, code_b))
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// A parsed per-gene HMM: the distinguished init state, the emitting states
/// with stable indices, and the marginal prior probability of choosing this
/// gene at all.
#[derive(Debug)]
pub struct Model {
    name: Option<String>,
    overall_prob: f64,
    init: HmmState,
    states: Vec<HmmState>,
    indices: FxHashMap<String, usize>,
}

impl Model {
    /// Load and assemble a model from a YAML file on disk.
    pub fn parse_file(path: &Path) -> DecodeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            DecodeError::ModelRead { path: path.to_path_buf(), source }
        })?;
        let raw: RawModel =
            serde_yaml::from_str(&contents).map_err(|source| {
                DecodeError::ModelParse { path: path.to_path_buf(), source }
            })?;
        Self::from_raw(raw)
    }

    pub(crate) fn from_raw(raw: RawModel) -> DecodeResult<Self> {
        // state names must be known before any transition can be resolved
        let mut known = FxHashMap::default();
        let mut n_emitting = 0usize;
        for state in raw.states.iter() {
            if state.name != INIT_STATE {
                if known.insert(state.name.clone(), n_emitting).is_some() {
                    return Err(DecodeError::DuplicateStateName(
                        state.name.clone(),
                    ));
                }
                n_emitting += 1;
            }
        }

        let mut init = None;
        let mut states = Vec::with_capacity(n_emitting);
        for raw_state in raw.states {
            let state = parse_state(raw_state, &known, n_emitting)?;
            if state.name == INIT_STATE {
                if init.is_some() {
                    return Err(DecodeError::DuplicateStateName(
                        INIT_STATE.to_string(),
                    ));
                }
                init = Some(state);
            } else {
                states.push(state);
            }
        }
        let init = init.ok_or_else(|| {
            DecodeError::MissingInitState(
                raw.name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
            )
        })?;

        Ok(Self {
            name: raw.name,
            overall_prob: raw.overall_prob,
            init,
            states,
            indices: known,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Linear-space prior probability of choosing this gene.
    pub fn overall_prob(&self) -> f64 {
        self.overall_prob
    }

    pub fn init(&self) -> &HmmState {
        &self.init
    }

    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, index: usize) -> &HmmState {
        &self.states[index]
    }

    pub fn states(&self) -> &[HmmState] {
        &self.states
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }
}

/// Parse one raw state node and re-index its transitions so that slot i
/// holds the transition to the state with index i.
fn parse_state(
    raw: RawState,
    indices: &FxHashMap<String, usize>,
    n_states: usize,
) -> DecodeResult<HmmState> {
    let mut total = 0f64;
    let mut end_trans = None;
    let mut transitions = vec![None; n_states];
    for (to_state, prob) in raw.transitions {
        total += prob;
        let trans =
            Transition { to_state: to_state.clone(), log_prob: prob.ln() };
        if to_state == END_STATE {
            end_trans = Some(trans);
        } else {
            // "init" is not addressable, so it errors here like any other
            // unknown name
            let index = *indices.get(&to_state).ok_or_else(|| {
                DecodeError::UnknownTransitionTarget {
                    from_state: raw.name.clone(),
                    to_state,
                }
            })?;
            transitions[index] = Some(trans);
        }
    }
    if (total - 1.0).abs() >= TRANSITION_SUM_EPS {
        return Err(DecodeError::TransitionsDoNotSumToOne {
            state: raw.name,
            total,
        });
    }

    // emissions only make sense on states that consume a base
    let (emission, pair_emission) = if raw.name == INIT_STATE {
        (None, None)
    } else {
        let emission = raw
            .emissions
            .map(|e| parse_emission(&raw.name, e))
            .transpose()?;
        let pair_emission = raw
            .pair_emissions
            .map(|e| parse_pair_emission(&raw.name, e))
            .transpose()?;
        (emission, pair_emission)
    };

    Ok(HmmState {
        name: raw.name,
        label: raw.label,
        transitions,
        end_trans,
        emission,
        pair_emission,
    })
}

fn check_probs(state: &str, probs: &[f64]) -> DecodeResult<[f64; N_NUCS]> {
    if probs.len() != N_NUCS {
        return Err(DecodeError::MalformedEmission {
            state: state.to_string(),
            reason: format!("expected {N_NUCS} probabilities, got {}", probs.len()),
        });
    }
    let mut log_probs = [0f64; N_NUCS];
    for (i, &p) in probs.iter().enumerate() {
        if !(0f64..=1f64).contains(&p) {
            return Err(DecodeError::MalformedEmission {
                state: state.to_string(),
                reason: format!("probability {p} outside [0, 1]"),
            });
        }
        log_probs[i] = p.ln();
    }
    Ok(log_probs)
}

fn parse_emission(
    state: &str,
    raw: RawEmission,
) -> DecodeResult<EmissionTable> {
    Ok(EmissionTable { log_probs: check_probs(state, &raw.probs)? })
}

fn parse_pair_emission(
    state: &str,
    raw: RawPairEmission,
) -> DecodeResult<PairEmissionTable> {
    if raw.probs.len() != N_NUCS {
        return Err(DecodeError::MalformedEmission {
            state: state.to_string(),
            reason: format!(
                "expected {N_NUCS} rows of pair probabilities, got {}",
                raw.probs.len()
            ),
        });
    }
    let mut log_probs = [[0f64; N_NUCS]; N_NUCS];
    for (i, row) in raw.probs.iter().enumerate() {
        log_probs[i] = check_probs(state, row)?;
    }
    Ok(PairEmissionTable { log_probs })
}
