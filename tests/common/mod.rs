use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use vdj_decode::germline::{GermlineCatalog, Region};

#[derive(Serialize)]
pub struct ModelDoc {
    pub overall_prob: f64,
    pub states: Vec<StateNode>,
}

#[derive(Serialize)]
pub struct StateNode {
    pub name: String,
    pub transitions: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissions: Option<EmissionNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_emissions: Option<PairEmissionNode>,
}

#[derive(Serialize)]
pub struct EmissionNode {
    pub probs: Vec<f64>,
}

#[derive(Serialize)]
pub struct PairEmissionNode {
    pub probs: Vec<Vec<f64>>,
}

fn base_probs(base: u8) -> Vec<f64> {
    let index = match base {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => panic!("germline base {} is not A/C/G/T", base as char),
    };
    (0..4).map(|i| if i == index { 0.85 } else { 0.05 }).collect()
}

fn uniform_probs() -> Vec<f64> {
    vec![0.25; 4]
}

fn pair_probs(probs: &[f64]) -> Vec<Vec<f64>> {
    probs
        .iter()
        .map(|a| probs.iter().map(|b| a * b).collect())
        .collect()
}

fn emitting_state(
    name: &str,
    transitions: BTreeMap<String, f64>,
    probs: Vec<f64>,
) -> StateNode {
    StateNode {
        name: name.to_string(),
        transitions,
        pair_emissions: Some(PairEmissionNode { probs: pair_probs(&probs) }),
        emissions: Some(EmissionNode { probs }),
    }
}

fn init_state(transitions: BTreeMap<String, f64>) -> StateNode {
    StateNode {
        name: "init".to_string(),
        transitions,
        emissions: None,
        pair_emissions: None,
    }
}

/// Germline positions chained left to right, entry only at position zero,
/// an exit to "end" from every position.
fn germline_chain(gene: &str, germline: &str) -> Vec<StateNode> {
    let len = germline.len();
    germline
        .bytes()
        .enumerate()
        .map(|(i, base)| {
            let transitions = if i + 1 < len {
                BTreeMap::from([
                    (format!("{gene}_{}", i + 1), 0.9),
                    ("end".to_string(), 0.1),
                ])
            } else {
                BTreeMap::from([("end".to_string(), 1.0)])
            };
            emitting_state(
                &format!("{gene}_{i}"),
                transitions,
                base_probs(base),
            )
        })
        .collect()
}

/// A V gene eroded only from the right: the germline chain alone.
pub fn v_model(gene: &str, germline: &str, overall_prob: f64) -> ModelDoc {
    let mut states =
        vec![init_state(BTreeMap::from([(format!("{gene}_0"), 1.0)]))];
    states.extend(germline_chain(gene, germline));
    ModelDoc { overall_prob, states }
}

/// A D gene with the V-D insert on its left flank.
pub fn d_model(gene: &str, germline: &str, overall_prob: f64) -> ModelDoc {
    let entry = BTreeMap::from([
        ("insert_vd".to_string(), 0.5),
        (format!("{gene}_0"), 0.5),
    ]);
    let mut states = vec![
        init_state(entry.clone()),
        emitting_state("insert_vd", entry, uniform_probs()),
    ];
    states.extend(germline_chain(gene, germline));
    ModelDoc { overall_prob, states }
}

/// A J gene with the D-J insert on its left flank and the post-J insert on
/// its right.
pub fn j_model(gene: &str, germline: &str, overall_prob: f64) -> ModelDoc {
    let entry = BTreeMap::from([
        ("insert_dj".to_string(), 0.5),
        (format!("{gene}_0"), 0.5),
    ]);
    let mut states = vec![
        init_state(entry.clone()),
        emitting_state("insert_dj", entry, uniform_probs()),
    ];
    let mut chain = germline_chain(gene, germline);
    let last = chain.last_mut().unwrap();
    last.transitions = BTreeMap::from([
        ("end".to_string(), 0.5),
        ("insert_jf".to_string(), 0.5),
    ]);
    states.extend(chain);
    states.push(emitting_state(
        "insert_jf",
        BTreeMap::from([
            ("insert_jf".to_string(), 0.5),
            ("end".to_string(), 0.5),
        ]),
        uniform_probs(),
    ));
    ModelDoc { overall_prob, states }
}

pub fn write_model(dir: &Path, gene: &str, doc: &ModelDoc) {
    let contents = serde_yaml::to_string(doc).unwrap();
    std::fs::write(dir.join(format!("{gene}.yaml")), contents).unwrap();
}

/// One gene per region with model files on disk.
pub struct Fixture {
    pub v: (String, String),
    pub d: (String, String),
    pub j: (String, String),
}

impl Fixture {
    pub fn new(v_seq: &str, d_seq: &str, j_seq: &str) -> Self {
        Self {
            v: ("IGHV7".to_string(), v_seq.to_string()),
            d: ("IGHD3".to_string(), d_seq.to_string()),
            j: ("IGHJ2".to_string(), j_seq.to_string()),
        }
    }

    pub fn catalog(&self) -> GermlineCatalog {
        let genes = BTreeMap::from([
            (Region::V, vec![self.v.clone()]),
            (Region::D, vec![self.d.clone()]),
            (Region::J, vec![self.j.clone()]),
        ]);
        GermlineCatalog::new("IGH", genes).unwrap()
    }

    pub fn write_models(&self, dir: &Path) {
        write_model(dir, &self.v.0, &v_model(&self.v.0, &self.v.1, 0.2));
        write_model(dir, &self.d.0, &d_model(&self.d.0, &self.d.1, 0.3));
        write_model(dir, &self.j.0, &j_model(&self.j.0, &self.j.1, 0.5));
    }

    pub fn gene_names(&self) -> Vec<String> {
        vec![self.v.0.clone(), self.d.0.clone(), self.j.0.clone()]
    }
}
