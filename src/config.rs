//! Configuración del servicio y del pipeline de entrenamiento.
//!
//! Todos los campos tienen valores por defecto (`#[serde(default)]`), de modo
//! que un JSON parcial sólo necesita los valores que cambian.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feature_extractor::FeaturePolicy;
use crate::types::{DEFAULT_COLLECT_MS, NUM_CHANNELS, SAMPLING_RATE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No se pudo leer la configuración {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON de configuración inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Valor inválido para `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Parámetros del pipeline de entrenamiento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Muestras sintéticas a generar por combo (default: 5)
    pub synth_per_combo: usize,
    /// Longitud máxima de combo (default: 3)
    pub max_combo_len: usize,
    /// Mínimo de ventanas reales por etiqueta base (default: 1)
    pub min_real_per_label: usize,
    /// Fracción reservada para evaluación (default: 0.2)
    pub test_fraction: f32,
    pub seed: u64,
    /// Guardar ventanas sintéticas en disco para auditoría
    pub save_synthetic: bool,
    /// Árboles del bosque aleatorio (default: 200)
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Política de características usada en entrenamiento e inferencia
    pub feature_policy: FeaturePolicy,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            synth_per_combo: 5,
            max_combo_len: 3,
            min_real_per_label: 1,
            test_fraction: 0.2,
            seed: 42,
            save_synthetic: true,
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            feature_policy: FeaturePolicy::Simple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directorio con una carpeta por etiqueta (data/A, data/B, ...)
    pub data_dir: PathBuf,
    /// Directorio del modelo entrenado y del progreso
    pub models_dir: PathBuf,
    pub model_file: String,
    pub progress_file: String,
    /// Canales por muestra (10 flex/presión + 3 IMU)
    pub num_channels: usize,
    pub sample_rate_hz: f32,
    /// Duración de captura cuando `start_label` no trae `duration_ms`
    pub collect_duration_ms: u64,
    /// Meta de ventanas por etiqueta mostrada en los mensajes de estado
    pub target_per_label: u32,
    /// Etiquetas base que `reset_progress` pone a cero y el entrenamiento exige
    pub base_labels: Vec<String>,
    /// Confianza reportada si el modelo no expone probabilidades
    pub default_confidence: f32,
    pub training: TrainingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            models_dir: PathBuf::from("models"),
            model_file: "gesture_model.json".to_string(),
            progress_file: "progress.json".to_string(),
            num_channels: NUM_CHANNELS,
            sample_rate_hz: SAMPLING_RATE,
            collect_duration_ms: DEFAULT_COLLECT_MS,
            target_per_label: 500,
            base_labels: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            default_confidence: 0.8,
            training: TrainingParams::default(),
        }
    }
}

impl Config {
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.models_dir.join(&self.progress_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.num_channels == 0 {
            return Err(invalid("num_channels", "debe ser > 0"));
        }
        if !(self.sample_rate_hz > 0.0) {
            return Err(invalid("sample_rate_hz", "debe ser > 0"));
        }
        if self.collect_duration_ms == 0 {
            return Err(invalid("collect_duration_ms", "debe ser > 0"));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(invalid("default_confidence", "debe estar en [0, 1]"));
        }
        if let Some(label) = self.base_labels.iter().find(|l| l.is_empty()) {
            return Err(invalid("base_labels", format!("etiqueta vacía: {:?}", label)));
        }

        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            return Err(invalid("training.test_fraction", "debe estar en (0, 1)"));
        }
        if t.max_combo_len == 0 {
            return Err(invalid("training.max_combo_len", "debe ser >= 1"));
        }
        if t.n_estimators == 0 {
            return Err(invalid("training.n_estimators", "debe ser >= 1"));
        }
        if t.min_samples_split < 2 {
            return Err(invalid("training.min_samples_split", "debe ser >= 2"));
        }
        if t.max_depth == Some(0) {
            return Err(invalid("training.max_depth", "debe ser >= 1"));
        }
        Ok(())
    }
}
