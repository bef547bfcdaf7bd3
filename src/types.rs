use thiserror::Error;

/// Una lectura del guante: [flex0..flex4, pres0..pres4, ax, ay, az]
pub type Sample = Vec<f32>;

/// Constantes del sistema
pub const NUM_FLEX: usize = 5;
pub const NUM_PRESSURE: usize = 5;
pub const NUM_IMU: usize = 3;
pub const NUM_CHANNELS: usize = NUM_FLEX + NUM_PRESSURE + NUM_IMU; // 13
pub const SAMPLING_RATE: f32 = 10.0; // Hz (~10 paquetes/seg)
pub const DEFAULT_COLLECT_MS: u64 = 1000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("Muestra {index} con {actual} canales (se esperaban {expected})")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Una ventana necesita al menos un canal")]
    NoChannels,
}

/// Ventana de T muestras x C canales, almacenada fila a fila.
/// T puede ser 0: una ventana vacía es válida.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    channels: usize,
    data: Vec<f32>,
}

impl Window {
    /// Ventana vacía con `channels` canales
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            data: Vec::new(),
        }
    }

    /// Construye una ventana a partir de filas; todas deben tener el mismo ancho.
    /// `channels` se usa sólo cuando no hay filas.
    pub fn from_rows(rows: &[Sample], channels: usize) -> Result<Self, WindowError> {
        let width = rows.first().map(|r| r.len()).unwrap_or(channels);
        if width == 0 {
            return Err(WindowError::NoChannels);
        }

        let mut window = Self::new(width);
        for row in rows {
            window.push(row)?;
        }
        Ok(window)
    }

    /// Promueve una única muestra (1-D) a una ventana de 1 x C
    pub fn from_sample(sample: &[f32]) -> Result<Self, WindowError> {
        if sample.is_empty() {
            return Err(WindowError::NoChannels);
        }
        Ok(Self {
            channels: sample.len(),
            data: sample.to_vec(),
        })
    }

    /// Concatena ventanas a lo largo del eje temporal, en orden
    pub fn concat(parts: &[&Window]) -> Result<Self, WindowError> {
        let channels = parts.first().map(|w| w.channels).ok_or(WindowError::NoChannels)?;
        let mut merged = Self::new(channels);
        for part in parts {
            if part.channels != channels {
                return Err(WindowError::ChannelMismatch {
                    index: merged.len(),
                    expected: channels,
                    actual: part.channels,
                });
            }
            merged.data.extend_from_slice(&part.data);
        }
        Ok(merged)
    }

    pub fn push(&mut self, sample: &[f32]) -> Result<(), WindowError> {
        if sample.len() != self.channels {
            return Err(WindowError::ChannelMismatch {
                index: self.len(),
                expected: self.channels,
                actual: sample.len(),
            });
        }
        self.data.extend_from_slice(sample);
        Ok(())
    }

    /// Número de muestras (T)
    pub fn len(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Número de canales (C)
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Muestra `t`, o None si está fuera de la ventana
    pub fn row(&self, t: usize) -> Option<&[f32]> {
        self.data.get(t * self.channels..(t + 1) * self.channels)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Extrae la serie temporal de un canal
    pub fn channel(&self, ch: usize) -> Vec<f32> {
        self.rows().map(|row| row[ch]).collect()
    }
}

/// Etiqueta base: un único carácter ("A", "B", "C")
pub fn is_base_label(label: &str) -> bool {
    label.chars().count() == 1
}
