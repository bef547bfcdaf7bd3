use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::types::is_base_label;

/// Ventanas reales recolectadas por etiqueta, persistidas en JSON
#[derive(Debug, Clone)]
pub struct ProgressCounters {
    path: PathBuf,
    counts: BTreeMap<String, u32>,
}

impl ProgressCounters {
    /// Carga el progreso guardado. Un archivo ausente o corrupto empieza en cero.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counts = if path.exists() {
            match Self::read(&path) {
                Ok(counts) => {
                    info!("📊 Progreso cargado desde {:?}", path);
                    counts
                }
                Err(e) => {
                    warn!("⚠️  No se pudo cargar el progreso {:?}: {:#}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Self { path, counts }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, u32>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("No se pudo crear {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(&self.counts)?;
        fs::write(&self.path, content)
            .with_context(|| format!("No se pudo escribir el progreso en {:?}", self.path))
    }

    pub fn get(&self, label: &str) -> u32 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Incrementa el contador de la etiqueta y devuelve el nuevo valor
    pub fn increment(&mut self, label: &str) -> u32 {
        let count = self.counts.entry(label.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Pone a cero todas las etiquetas base: las configuradas y cualquier
    /// etiqueta de un carácter ya registrada
    pub fn reset(&mut self, base_labels: &[String]) {
        for label in base_labels {
            self.counts.insert(label.clone(), 0);
        }
        for (label, count) in self.counts.iter_mut() {
            if is_base_label(label) {
                *count = 0;
            }
        }
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
