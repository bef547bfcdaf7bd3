//! Pipeline de entrenamiento: ventanas reales por etiqueta → combos
//! sintéticos → partición → bosque aleatorio → artefacto + evaluación.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combos::{enumerate_combos, synthesize};
use crate::config::Config;
use crate::dataset::{split_dataset, LabeledSet, SplitKind};
use crate::feature_extractor::{FeatureExtractor, FeaturePolicy};
use crate::gesture_classifier::{ClassifierError, ForestParams, GestureModel, ModelArtifact, RandomForest};
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::types::{is_base_label, Window};
use crate::window_store::WindowStore;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("No existe el directorio de datos {0:?}")]
    DataDirMissing(PathBuf),

    #[error("No hay carpetas de etiquetas en {0:?}")]
    NoLabels(PathBuf),

    #[error("Datos insuficientes: {missing:?} necesitan al menos {required} ventana(s) real(es)")]
    InsufficientData { missing: Vec<String>, required: usize },

    #[error("No hay vectores de características para entrenar")]
    NoData,

    #[error("Fallo al entrenar el clasificador: {0}")]
    Fit(#[from] ClassifierError),

    #[error("No se pudo guardar el modelo: {0}")]
    Save(#[source] ClassifierError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Resumen de una ejecución del pipeline
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub labels: Vec<String>,
    pub base_labels: Vec<String>,
    /// Ventanas reales usadas por etiqueta
    pub real_counts: BTreeMap<String, usize>,
    pub combos: usize,
    pub synthetic: usize,
    pub synthetic_saved: usize,
    pub split_kind: SplitKind,
    pub train_size: usize,
    pub test_size: usize,
    pub policy: FeaturePolicy,
    pub classification: ClassificationReport,
    pub confusion: ConfusionMatrix,
    /// Errores de predicción durante la evaluación (no fatales)
    pub evaluation_errors: Vec<String>,
    pub model_path: PathBuf,
}

/// Resultado de un entrenamiento exitoso: el artefacto ya persistido y su reporte
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

/// Etiquetas base exigidas: las configuradas más las de un carácter
/// encontradas en disco; si no hay ninguna, todas las encontradas
pub fn required_base_labels(configured: &[String], discovered: &[String]) -> Vec<String> {
    let mut labels: BTreeSet<String> = configured.iter().cloned().collect();
    labels.extend(discovered.iter().filter(|l| is_base_label(l)).cloned());
    if labels.is_empty() {
        labels.extend(discovered.iter().cloned());
    }
    labels.into_iter().collect()
}

/// Ventanas de cada etiqueta con el número de canales esperado
fn load_pools(
    store: &WindowStore,
    labels: &[String],
    channels: usize,
) -> BTreeMap<String, Vec<Window>> {
    let mut pools = store.load_all(labels);
    for (label, windows) in pools.iter_mut() {
        let before = windows.len();
        windows.retain(|w| w.channels() == channels);
        if windows.len() != before {
            warn!(
                "⚠️  {}: {} ventana(s) con número de canales distinto de {} omitidas",
                label,
                before - windows.len(),
                channels
            );
        }
    }
    pools
}

/// Ejecuta el pipeline completo. Sólo escribe el modelo si el ajuste tuvo éxito.
pub fn run_training(config: &Config) -> Result<TrainedModel, TrainError> {
    let params = &config.training;
    let store = WindowStore::new(&config.data_dir);

    if !config.data_dir.is_dir() {
        return Err(TrainError::DataDirMissing(config.data_dir.clone()));
    }
    let labels = store.discover_labels()?;
    if labels.is_empty() {
        return Err(TrainError::NoLabels(config.data_dir.clone()));
    }
    info!("📂 Etiquetas encontradas: {:?}", labels);

    let base_labels = required_base_labels(&config.base_labels, &labels);
    let all_labels: Vec<String> = labels
        .iter()
        .chain(&base_labels)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let pools = load_pools(&store, &all_labels, config.num_channels);

    let missing: Vec<String> = base_labels
        .iter()
        .filter(|label| pools.get(*label).map(Vec::len).unwrap_or(0) < params.min_real_per_label)
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(TrainError::InsufficientData {
            missing,
            required: params.min_real_per_label,
        });
    }

    let mut extractor = FeatureExtractor::new(params.feature_policy, config.sample_rate_hz);
    let mut dataset = LabeledSet::new();
    let mut real_counts = BTreeMap::new();
    for (label, windows) in &pools {
        for window in windows {
            dataset.push(extractor.extract(window), label.as_str());
        }
        if !windows.is_empty() {
            real_counts.insert(label.clone(), windows.len());
        }
    }
    info!("📊 Ventanas reales: {:?}", real_counts);

    let combos = enumerate_combos(&base_labels, params.max_combo_len);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut synthetic = LabeledSet::new();
    let mut synthetic_saved = 0;
    for combo in combos.iter().filter(|c| c.len() > 1) {
        let samples = synthesize(combo, &pools, params.synth_per_combo, &mut extractor, &mut rng);
        debug!("🧪 {}: {} muestra(s) sintética(s)", combo, samples.len());
        for sample in samples {
            if params.save_synthetic {
                match store.save_synthetic(&sample.label, &sample.window, sample.attempt) {
                    Ok(_) => synthetic_saved += 1,
                    Err(e) => warn!("⚠️  No se pudo guardar la ventana sintética {}: {:#}", sample.label, e),
                }
            }
            synthetic.push(sample.features, sample.label);
        }
    }
    let synthetic_count = synthetic.len();
    info!(
        "🧪 {} combos, {} muestras sintéticas ({} guardadas)",
        combos.len(),
        synthetic_count,
        synthetic_saved
    );
    dataset.extend(synthetic);

    if dataset.is_empty() {
        return Err(TrainError::NoData);
    }

    let split = split_dataset(&dataset, params.test_fraction, params.seed);
    info!(
        "✂️  Partición {:?}: {} entrenamiento / {} prueba",
        split.kind,
        split.train.len(),
        split.test.len()
    );

    let forest = RandomForest::fit(
        &split.train.features,
        &split.train.labels,
        &ForestParams {
            n_estimators: params.n_estimators,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            seed: params.seed,
        },
    )?;
    info!("🌲 Bosque entrenado: {} árboles, clases {:?}", forest.n_trees(), forest.classes());

    let artifact = ModelArtifact::new(params.feature_policy, config.sample_rate_hz, forest);
    let model_path = config.model_path();
    artifact.save(&model_path).map_err(TrainError::Save)?;
    info!("💾 Modelo guardado en {:?}", model_path);

    let mut y_true = Vec::with_capacity(split.test.len());
    let mut y_pred = Vec::with_capacity(split.test.len());
    let mut evaluation_errors = Vec::new();
    for (features, label) in split.test.features.iter().zip(&split.test.labels) {
        match artifact.forest.predict(features) {
            Ok(pred) => {
                y_true.push(label.clone());
                y_pred.push(pred);
            }
            Err(e) => {
                warn!("⚠️  Error evaluando muestra de {}: {}", label, e);
                evaluation_errors.push(format!("{}: {}", label, e));
            }
        }
    }

    let classification = ClassificationReport::new(&y_true, &y_pred);
    let confusion = ConfusionMatrix::new(&y_true, &y_pred);
    info!("✅ Exactitud en prueba: {:.3}", classification.accuracy);

    let report = TrainingReport {
        labels,
        base_labels,
        real_counts,
        combos: combos.len(),
        synthetic: synthetic_count,
        synthetic_saved,
        split_kind: split.kind,
        train_size: split.train.len(),
        test_size: split.test.len(),
        policy: params.feature_policy,
        classification,
        confusion,
        evaluation_errors,
        model_path,
    };

    Ok(TrainedModel { artifact, report })
}

/// Entrena en un hilo aparte y envía el resultado por el canal
pub fn spawn_training(config: Config, tx: Sender<Result<TrainedModel, TrainError>>) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("🏋️  Entrenamiento iniciado");
        let result = run_training(&config);
        if tx.send(result).is_err() {
            warn!("⚠️  Nadie espera el resultado del entrenamiento");
        }
    })
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Etiquetas:        {:?}", self.labels)?;
        writeln!(f, "Etiquetas base:   {:?}", self.base_labels)?;
        writeln!(f, "Ventanas reales:  {:?}", self.real_counts)?;
        writeln!(f, "Combos:           {}", self.combos)?;
        writeln!(f, "Sintéticas:       {} ({} guardadas)", self.synthetic, self.synthetic_saved)?;
        writeln!(f, "Política:         {:?}", self.policy)?;
        writeln!(
            f,
            "Partición:        {:?} ({} entrenamiento / {} prueba)",
            self.split_kind, self.train_size, self.test_size
        )?;
        if self.split_kind == SplitKind::Full {
            writeln!(f, "⚠️  Evaluado sobre el conjunto de entrenamiento: métricas optimistas")?;
        }
        writeln!(f, "Modelo:           {:?}", self.model_path)?;
        writeln!(f)?;
        write!(f, "{}", self.classification)?;
        writeln!(f)?;
        writeln!(f, "Matriz de confusión (filas = real, columnas = predicción):")?;
        write!(f, "{}", self.confusion)?;
        for error in &self.evaluation_errors {
            writeln!(f, "❌ {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::path::Path;

    const CHANNELS: usize = 3;

    fn window_for(level: f32, i: usize) -> Window {
        let rows: Vec<Vec<f32>> = (0..5)
            .map(|t| {
                let v = level + (i + t) as f32 * 0.1;
                vec![v, v * 0.5, -v]
            })
            .collect();
        Window::from_rows(&rows, CHANNELS).unwrap()
    }

    fn populate(root: &Path, counts: &[(&str, usize, f32)]) {
        let store = WindowStore::new(root);
        for (label, count, level) in counts {
            std::fs::create_dir_all(store.label_dir(label)).unwrap();
            for i in 0..*count {
                store.save_window(label, &window_for(*level, i)).unwrap();
            }
        }
    }

    fn test_config(root: &Path) -> Config {
        let mut config = Config {
            data_dir: root.join("data"),
            models_dir: root.join("models"),
            num_channels: CHANNELS,
            ..Config::default()
        };
        config.training.n_estimators = 10;
        config.training.save_synthetic = false;
        config
    }

    #[test]
    fn test_required_base_labels() {
        let labels = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            required_base_labels(&labels(&["A", "B"]), &labels(&["AB", "C"])),
            labels(&["A", "B", "C"])
        );
        assert_eq!(required_base_labels(&[], &labels(&["AB", "BA"])), labels(&["AB", "BA"]));
    }

    #[test]
    fn test_training_with_singleton_class_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        populate(&config.data_dir, &[("A", 5, 0.0), ("B", 5, 10.0), ("C", 1, 20.0)]);

        let trained = run_training(&config).unwrap();
        let report = &trained.report;
        assert_eq!(report.real_counts["A"], 5);
        assert_eq!(report.real_counts["C"], 1);
        // 3 + 6 + 12 combos; los 18 de longitud > 1 producen 5 cada uno
        assert_eq!(report.combos, 21);
        assert_eq!(report.synthetic, 90);
        assert_eq!(report.train_size + report.test_size, 101);
        assert!(config.model_path().exists());
        assert!(report.evaluation_errors.is_empty());
        assert_eq!(trained.artifact.forest.n_features(), 4 * CHANNELS);
    }

    #[test]
    fn test_missing_base_label_aborts_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        populate(&config.data_dir, &[("A", 5, 0.0), ("B", 5, 10.0)]);

        match run_training(&config) {
            Err(TrainError::InsufficientData { missing, required }) => {
                assert_eq!(missing, vec!["C".to_string()]);
                assert_eq!(required, 1);
            }
            other => panic!("se esperaba InsufficientData, llegó {:?}", other.map(|t| t.report)),
        }
        assert!(!config.model_path().exists());
    }

    #[test]
    fn test_tiny_dataset_trains_on_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.base_labels = Vec::new();
        config.training.max_combo_len = 1;
        populate(&config.data_dir, &[("A", 1, 0.0), ("B", 1, 10.0)]);

        let report = run_training(&config).unwrap().report;
        assert_eq!(report.split_kind, SplitKind::Full);
        assert_eq!(report.train_size, 2);
        assert_eq!(report.test_size, 2);
        assert_eq!(report.synthetic, 0);
    }

    #[test]
    fn test_rich_policy_recorded_in_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.training.feature_policy = FeaturePolicy::Rich;
        config.training.max_combo_len = 2;
        populate(&config.data_dir, &[("A", 3, 0.0), ("B", 3, 10.0), ("C", 3, 20.0)]);

        let trained = run_training(&config).unwrap();
        let loaded = ModelArtifact::load(&config.model_path()).unwrap();
        assert_eq!(loaded.policy, FeaturePolicy::Rich);
        assert_eq!(loaded.forest.n_features(), FeaturePolicy::Rich.feature_len(CHANNELS));
        assert_eq!(trained.report.policy, FeaturePolicy::Rich);
    }

    #[test]
    fn test_synthetic_windows_saved_but_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.base_labels = vec!["A".to_string(), "B".to_string()];
        config.training.max_combo_len = 2;
        config.training.save_synthetic = true;
        populate(&config.data_dir, &[("A", 3, 0.0), ("B", 3, 10.0)]);

        let first = run_training(&config).unwrap().report;
        assert_eq!(first.synthetic_saved, 10);

        // Las carpetas AB/BA sólo contienen sintéticas: no aportan datos reales
        let second = run_training(&config).unwrap().report;
        assert!(!second.real_counts.contains_key("AB"));
        assert_eq!(second.labels, vec!["A", "AB", "B", "BA"]);
    }

    #[test]
    fn test_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert!(matches!(run_training(&config), Err(TrainError::DataDirMissing(_))));
    }

    #[test]
    fn test_spawn_training_reports_through_channel() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        populate(&config.data_dir, &[("A", 2, 0.0), ("B", 2, 10.0), ("C", 2, 20.0)]);

        let (tx, rx) = bounded(1);
        spawn_training(config, tx).join().unwrap();
        assert!(rx.recv().unwrap().is_ok());
    }
}
