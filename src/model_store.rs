use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::info;
use rustc_hash::FxHashMap;

use crate::errs::DecodeResult;
use crate::germline::{GermlineCatalog, REGIONS};
use crate::model::Model;

/// Lazily loads and caches parsed per-gene models from a flat directory of
/// `<sanitized gene name>.yaml` files. The map only grows and entries are
/// never mutated after insertion; the lock is held across a load so a
/// concurrent reader either sees the finished model or waits for it.
pub struct ModelStore<'a> {
    catalog: &'a GermlineCatalog,
    dir: PathBuf,
    models: Mutex<FxHashMap<String, Arc<Model>>>,
}

impl<'a> ModelStore<'a> {
    pub fn new<P: Into<PathBuf>>(catalog: &'a GermlineCatalog, dir: P) -> Self {
        Self {
            catalog,
            dir: dir.into(),
            models: Mutex::new(FxHashMap::default()),
        }
    }

    fn model_path(&self, gene: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", self.catalog.sanitize_name(gene)))
    }

    /// The model for `gene`, reading it from disk on first use.
    pub fn get(&self, gene: &str) -> DecodeResult<Arc<Model>> {
        let mut models = self.models.lock().expect("model store lock poisoned");
        if let Some(model) = models.get(gene) {
            return Ok(Arc::clone(model));
        }
        let path = self.model_path(gene);
        info!("reading {}", path.display());
        let model = Arc::new(Model::parse_file(&path)?);
        models.insert(gene.to_string(), Arc::clone(&model));
        Ok(model)
    }

    /// Eagerly load every catalogue gene whose model file exists. Returns
    /// the number of cached models.
    pub fn cache_all(&self) -> DecodeResult<usize> {
        let mut n_cached = 0usize;
        for region in REGIONS {
            for gene in self.catalog.names(region) {
                if self.model_path(gene).is_file() {
                    self.get(gene)?;
                    n_cached += 1;
                }
            }
        }
        Ok(n_cached)
    }
}
