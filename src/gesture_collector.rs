use std::time::{Duration, Instant};

use thiserror::Error;

use crate::types::{Window, WindowError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectorError {
    #[error("La etiqueta no puede estar vacía")]
    EmptyLabel,

    #[error("Etiqueta '{0}' no válida como nombre de carpeta")]
    InvalidLabel(String),

    #[error("La duración de captura debe ser positiva")]
    ZeroDuration,

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// La etiqueta se usa como carpeta bajo el directorio de datos
fn is_valid_label(label: &str) -> bool {
    label != "." && label != ".." && !label.contains(['/', '\\', '\0'])
}

/// Estados de la sesión de recolección
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Sin etiqueta, buffer vacío: los paquetes van a predicción
    Idle,
    /// Acumulando muestras para la etiqueta actual
    Collecting,
}

/// Ventana terminada, lista para persistir
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedWindow {
    pub label: String,
    pub window: Window,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    /// La sesión está inactiva; el paquete se interpreta como petición de predicción
    NotCollecting,
    /// Muestra añadida; la ventana sigue abierta
    Buffered { samples: usize },
    /// Se cumplió la duración: ventana cerrada y sesión de vuelta a Idle
    Completed(CompletedWindow),
}

/// Máquina de estados Idle → Collecting → Idle.
/// El tiempo se inyecta en cada llamada para poder probarla sin esperar.
pub struct GestureCollector {
    channels: usize,
    state: State,
    label: String,
    started_at: Option<Instant>,
    duration: Duration,
    buffer: Window,
}

impl GestureCollector {
    /// Crea un colector para muestras de `channels` canales
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            state: State::Idle,
            label: String::new(),
            started_at: None,
            duration: Duration::ZERO,
            buffer: Window::new(channels),
        }
    }

    /// Inicia una sesión. Descarta cualquier captura en curso.
    pub fn start(&mut self, label: &str, duration: Duration, now: Instant) -> Result<(), CollectorError> {
        if label.trim().is_empty() {
            return Err(CollectorError::EmptyLabel);
        }
        if !is_valid_label(label) {
            return Err(CollectorError::InvalidLabel(label.to_string()));
        }
        if duration.is_zero() {
            return Err(CollectorError::ZeroDuration);
        }

        self.label = label.to_string();
        self.duration = duration;
        self.started_at = Some(now);
        self.buffer = Window::new(self.channels);
        self.state = State::Collecting;
        Ok(())
    }

    /// Alimenta la sesión con una muestra. Tras añadirla comprueba si ya
    /// transcurrió la duración y, en ese caso, cierra la ventana.
    pub fn feed(&mut self, sample: &[f32], now: Instant) -> Result<FeedOutcome, CollectorError> {
        let started_at = match (self.state, self.started_at) {
            (State::Collecting, Some(started_at)) => started_at,
            _ => return Ok(FeedOutcome::NotCollecting),
        };

        self.buffer.push(sample)?;

        if now.saturating_duration_since(started_at) >= self.duration {
            return Ok(FeedOutcome::Completed(self.finish()));
        }

        Ok(FeedOutcome::Buffered {
            samples: self.buffer.len(),
        })
    }

    fn finish(&mut self) -> CompletedWindow {
        let window = std::mem::replace(&mut self.buffer, Window::new(self.channels));
        let label = std::mem::take(&mut self.label);
        self.state = State::Idle;
        self.started_at = None;
        self.duration = Duration::ZERO;
        CompletedWindow { label, window }
    }

    pub fn is_collecting(&self) -> bool {
        self.state == State::Collecting
    }

    /// Etiqueta en captura, si hay sesión activa
    pub fn current_label(&self) -> Option<&str> {
        match self.state {
            State::Collecting => Some(&self.label),
            State::Idle => None,
        }
    }

    /// Retorna el estado actual (para debugging)
    pub fn state(&self) -> &str {
        match self.state {
            State::Idle => "IDLE",
            State::Collecting => "COLLECTING",
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sample(v: f32) -> Vec<f32> {
        vec![v, v + 1.0, v + 2.0]
    }

    #[test]
    fn test_idle_until_started() {
        let mut collector = GestureCollector::new(3);
        assert_eq!(collector.state(), "IDLE");
        let outcome = collector.feed(&sample(1.0), Instant::now()).unwrap();
        assert_eq!(outcome, FeedOutcome::NotCollecting);
        assert_eq!(collector.buffered(), 0);
    }

    #[test]
    fn test_collect_until_duration_elapsed() {
        let mut collector = GestureCollector::new(3);
        let t0 = Instant::now();
        collector.start("A", ms(1000), t0).unwrap();
        assert_eq!(collector.state(), "COLLECTING");
        assert_eq!(collector.current_label(), Some("A"));

        for i in 0..9 {
            let outcome = collector.feed(&sample(i as f32), t0 + ms(100 * i)).unwrap();
            assert_eq!(outcome, FeedOutcome::Buffered { samples: i as usize + 1 });
        }

        match collector.feed(&sample(9.0), t0 + ms(1000)).unwrap() {
            FeedOutcome::Completed(done) => {
                assert_eq!(done.label, "A");
                assert_eq!(done.window.len(), 10);
                assert_eq!(done.window.channel(0)[9], 9.0);
            }
            other => panic!("se esperaba ventana completa, llegó {:?}", other),
        }

        assert_eq!(collector.state(), "IDLE");
        assert_eq!(collector.current_label(), None);
        assert_eq!(
            collector.feed(&sample(0.0), t0 + ms(1100)).unwrap(),
            FeedOutcome::NotCollecting
        );
    }

    #[test]
    fn test_restart_discards_buffer() {
        let mut collector = GestureCollector::new(3);
        let t0 = Instant::now();
        collector.start("A", ms(1000), t0).unwrap();
        collector.feed(&sample(1.0), t0).unwrap();
        collector.feed(&sample(2.0), t0 + ms(10)).unwrap();

        collector.start("B", ms(500), t0 + ms(20)).unwrap();
        assert_eq!(collector.buffered(), 0);
        assert_eq!(collector.current_label(), Some("B"));

        // La duración se mide desde el nuevo inicio
        let outcome = collector.feed(&sample(3.0), t0 + ms(510)).unwrap();
        assert_eq!(outcome, FeedOutcome::Buffered { samples: 1 });
        assert!(matches!(
            collector.feed(&sample(4.0), t0 + ms(520)).unwrap(),
            FeedOutcome::Completed(CompletedWindow { ref label, .. }) if label == "B"
        ));
    }

    #[test]
    fn test_invalid_start_keeps_state() {
        let mut collector = GestureCollector::new(3);
        let t0 = Instant::now();
        assert_eq!(collector.start("", ms(1000), t0), Err(CollectorError::EmptyLabel));
        assert_eq!(collector.start("A", ms(0), t0), Err(CollectorError::ZeroDuration));
        assert_eq!(collector.state(), "IDLE");

        collector.start("A", ms(1000), t0).unwrap();
        collector.feed(&sample(1.0), t0).unwrap();
        assert!(collector.start("  ", ms(1000), t0).is_err());
        assert_eq!(collector.current_label(), Some("A"));
        assert_eq!(collector.buffered(), 1);
    }

    #[test]
    fn test_path_like_labels_rejected() {
        let mut collector = GestureCollector::new(3);
        let t0 = Instant::now();
        for label in [".", "..", "a/b", "..\\x", "A\0"] {
            assert_eq!(
                collector.start(label, ms(1000), t0),
                Err(CollectorError::InvalidLabel(label.to_string()))
            );
        }
        assert_eq!(collector.state(), "IDLE");

        collector.start("AB.v2", ms(1000), t0).unwrap();
        assert_eq!(collector.current_label(), Some("AB.v2"));
    }

    #[test]
    fn test_wrong_width_sample_rejected() {
        let mut collector = GestureCollector::new(3);
        let t0 = Instant::now();
        collector.start("A", ms(1000), t0).unwrap();
        collector.feed(&sample(1.0), t0).unwrap();

        let err = collector.feed(&[1.0, 2.0], t0 + ms(2000)).unwrap_err();
        assert!(matches!(err, CollectorError::Window(WindowError::ChannelMismatch { .. })));
        assert!(collector.is_collecting());
        assert_eq!(collector.buffered(), 1);
    }
}
