//! Comandos entrantes y eventos salientes de la sesión, y el contexto que
//! los procesa: recolección de ventanas, progreso, predicción en vivo y
//! (re)entrenamiento del modelo.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gesture_classifier::GestureClassifier;
use crate::gesture_collector::{CompletedWindow, FeedOutcome, GestureCollector};
use crate::progress::ProgressCounters;
use crate::training::{run_training, spawn_training, TrainError, TrainedModel};
use crate::types::{Sample, Window};
use crate::window_store::WindowStore;

/// Valores de un paquete: una muestra o un pequeño buffer de muestras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketValues {
    Single(Sample),
    Batch(Vec<Sample>),
}

impl PacketValues {
    fn rows(&self) -> Vec<&[f32]> {
        match self {
            PacketValues::Single(sample) => vec![sample.as_slice()],
            PacketValues::Batch(rows) => rows.iter().map(Vec::as_slice).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    StartLabel {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    Packet {
        values: PacketValues,
    },
    GetSummary,
    ResetProgress,
    ReloadModel,
    Train,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Status { msg: String },
    Summary { counts: BTreeMap<String, u32> },
    Prediction { label: String, conf: f32, ts: i64 },
}

impl Event {
    pub fn status(msg: impl Into<String>) -> Self {
        Event::Status { msg: msg.into() }
    }
}

/// Estado único de la sesión. Toda mutación pasa por `handle`.
pub struct SessionContext {
    config: Config,
    store: WindowStore,
    progress: ProgressCounters,
    collector: GestureCollector,
    classifier: Option<GestureClassifier>,
    training_tx: Option<Sender<Result<TrainedModel, TrainError>>>,
    training_in_progress: bool,
}

impl SessionContext {
    pub fn new(config: Config) -> Self {
        let store = WindowStore::new(&config.data_dir);
        let progress = ProgressCounters::load(config.progress_path());
        let collector = GestureCollector::new(config.num_channels);

        let model_path = config.model_path();
        let classifier = if model_path.exists() {
            match GestureClassifier::load(&model_path, config.default_confidence) {
                Ok(classifier) => Some(classifier),
                Err(e) => {
                    warn!("⚠️  No se pudo cargar el modelo {:?}: {}", model_path, e);
                    None
                }
            }
        } else {
            info!("ℹ️  Sin modelo en {:?}; las predicciones se activan tras entrenar", model_path);
            None
        };

        Self {
            config,
            store,
            progress,
            collector,
            classifier,
            training_tx: None,
            training_in_progress: false,
        }
    }

    /// El comando `train` se ejecutará en segundo plano y su resultado
    /// llegará por este canal (ver `finish_training`)
    pub fn with_training_channel(mut self, tx: Sender<Result<TrainedModel, TrainError>>) -> Self {
        self.training_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn progress(&self) -> &ProgressCounters {
        &self.progress
    }

    pub fn collector(&self) -> &GestureCollector {
        &self.collector
    }

    pub fn is_training(&self) -> bool {
        self.training_in_progress
    }

    pub fn has_model(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn replace_model(&mut self, classifier: GestureClassifier) {
        info!("🧠 Modelo activo reemplazado ({:?})", classifier.policy());
        self.classifier = Some(classifier);
    }

    /// Interpreta una línea JSON. Los mensajes inválidos se registran y se ignoran.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Vec<Event> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Command>(line) {
            Ok(command) => self.handle(command, now),
            Err(e) => {
                warn!("⚠️  Mensaje inválido ignorado: {} ({})", e, line);
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Vec<Event> {
        match command {
            Command::StartLabel { label, duration_ms } => self.start_label(&label, duration_ms, now),
            Command::Packet { values } => self.handle_packet(&values, now),
            Command::GetSummary => vec![self.summary()],
            Command::ResetProgress => self.reset_progress(),
            Command::ReloadModel => self.reload_model(),
            Command::Train => self.start_training(),
        }
    }

    /// Evento de resumen: contadores guardados más las etiquetas base a cero
    pub fn summary(&self) -> Event {
        let mut counts = self.progress.counts().clone();
        for label in &self.config.base_labels {
            counts.entry(label.clone()).or_insert(0);
        }
        Event::Summary { counts }
    }

    fn start_label(&mut self, label: &str, duration_ms: Option<u64>, now: Instant) -> Vec<Event> {
        let duration_ms = duration_ms.unwrap_or(self.config.collect_duration_ms);
        match self.collector.start(label, Duration::from_millis(duration_ms), now) {
            Ok(()) => {
                info!("🎬 Recolectando '{}' durante {} ms", label, duration_ms);
                vec![Event::status(format!(
                    "🎬 Recolectando '{}' durante {} ms",
                    label, duration_ms
                ))]
            }
            Err(e) => {
                warn!("⚠️  start_label ignorado: {}", e);
                Vec::new()
            }
        }
    }

    fn handle_packet(&mut self, values: &PacketValues, now: Instant) -> Vec<Event> {
        let rows = values.rows();
        let expected = self.config.num_channels;
        if rows.is_empty() {
            warn!("⚠️  Paquete vacío ignorado");
            return Vec::new();
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != expected) {
            warn!(
                "⚠️  Paquete ignorado: muestra con {} valores (se esperaban {})",
                bad.len(),
                expected
            );
            return Vec::new();
        }

        if !self.collector.is_collecting() {
            return self.predict(&rows);
        }

        for (i, row) in rows.iter().enumerate() {
            match self.collector.feed(row, now) {
                Ok(FeedOutcome::Completed(done)) => {
                    let dropped = rows.len() - i - 1;
                    if dropped > 0 {
                        debug!("🗑️  {} muestra(s) tras cerrar la ventana descartadas", dropped);
                    }
                    return self.finalize(done);
                }
                Ok(FeedOutcome::Buffered { samples }) => {
                    debug!("📥 {} muestra(s) en buffer", samples);
                }
                Ok(FeedOutcome::NotCollecting) => break,
                Err(e) => {
                    warn!("⚠️  Muestra ignorada: {}", e);
                    break;
                }
            }
        }
        Vec::new()
    }

    /// Persiste la ventana terminada y actualiza el progreso
    fn finalize(&mut self, done: CompletedWindow) -> Vec<Event> {
        let CompletedWindow { label, window } = done;

        if let Err(e) = self.store.save_window(&label, &window) {
            warn!("⚠️  No se pudo guardar la ventana de '{}': {:#}", label, e);
            return vec![Event::status(format!(
                "❌ No se pudo guardar la ventana de '{}': {}",
                label, e
            ))];
        }

        let mut events = Vec::new();
        let count = self.progress.increment(&label);
        if let Err(e) = self.progress.save() {
            warn!("⚠️  No se pudo guardar el progreso: {:#}", e);
            events.push(Event::status(format!("❌ No se pudo guardar el progreso: {}", e)));
        }

        info!(
            "💾 Ventana '{}' guardada: {} muestras ({}/{})",
            label,
            window.len(),
            count,
            self.config.target_per_label
        );
        events.push(Event::status(format!(
            "✅ Ventana guardada para '{}' ({}/{})",
            label, count, self.config.target_per_label
        )));
        events.push(self.summary());
        events
    }

    /// Predicción en vivo. Sin modelo o con error de predicción no hay evento.
    fn predict(&mut self, rows: &[&[f32]]) -> Vec<Event> {
        let Some(classifier) = self.classifier.as_mut() else {
            return Vec::new();
        };

        let mut window = Window::new(self.config.num_channels);
        for row in rows {
            if let Err(e) = window.push(row) {
                debug!("Paquete no convertible en ventana: {}", e);
                return Vec::new();
            }
        }

        match classifier.predict_window(&window) {
            Ok((label, conf)) => {
                debug!("🎯 {} ({:.1}%)", label, conf * 100.0);
                vec![Event::Prediction {
                    label,
                    conf,
                    ts: chrono::Utc::now().timestamp_millis(),
                }]
            }
            Err(e) => {
                debug!("Predicción descartada: {}", e);
                Vec::new()
            }
        }
    }

    fn reset_progress(&mut self) -> Vec<Event> {
        self.progress.reset(&self.config.base_labels);
        let mut events = vec![self.summary()];
        match self.progress.save() {
            Ok(()) => {
                info!("🔄 Progreso reiniciado");
                events.push(Event::status("🔄 Progreso reiniciado"));
            }
            Err(e) => {
                warn!("⚠️  No se pudo guardar el progreso: {:#}", e);
                events.push(Event::status(format!("❌ No se pudo guardar el progreso: {}", e)));
            }
        }
        events
    }

    /// Recarga el artefacto desde disco; si falla se conserva el modelo actual
    pub fn reload_model(&mut self) -> Vec<Event> {
        let path = self.config.model_path();
        match GestureClassifier::load(&path, self.config.default_confidence) {
            Ok(classifier) => {
                let classes = classifier.get_labels().len();
                self.replace_model(classifier);
                vec![Event::status(format!("🧠 Modelo recargado ({} clases)", classes))]
            }
            Err(e) => {
                warn!("⚠️  No se pudo recargar el modelo {:?}: {}", path, e);
                vec![Event::status(format!("❌ No se pudo recargar el modelo: {}", e))]
            }
        }
    }

    fn start_training(&mut self) -> Vec<Event> {
        let Some(tx) = self.training_tx.clone() else {
            let result = run_training(&self.config);
            return self.finish_training(result);
        };

        if self.training_in_progress {
            return vec![Event::status("⏳ Ya hay un entrenamiento en curso")];
        }
        self.training_in_progress = true;
        spawn_training(self.config.clone(), tx);
        vec![Event::status("🏋️  Entrenamiento iniciado")]
    }

    /// Aplica el resultado de un entrenamiento: en caso de éxito el modelo
    /// nuevo sustituye entero al anterior
    pub fn finish_training(&mut self, result: Result<TrainedModel, TrainError>) -> Vec<Event> {
        self.training_in_progress = false;
        match result {
            Ok(trained) => {
                info!("📋 Reporte de entrenamiento:\n{}", trained.report);
                let accuracy = trained.report.classification.accuracy;
                let classifier =
                    GestureClassifier::from_artifact(trained.artifact, self.config.default_confidence);
                let classes = classifier.get_labels().len();
                self.replace_model(classifier);
                vec![Event::status(format!(
                    "✅ Modelo entrenado: {} clases, exactitud {:.2}",
                    classes, accuracy
                ))]
            }
            Err(e) => {
                error!("❌ Entrenamiento fallido: {}", e);
                vec![Event::status(format!("❌ Entrenamiento fallido: {}", e))]
            }
        }
    }
}
