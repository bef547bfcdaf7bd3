use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::types::{Window, SAMPLING_RATE};

/// Bandas de frecuencia (Hz) para la energía espectral del canal 0,
/// pensadas para datos a ~10 Hz
const FREQUENCY_BANDS: [(f32, f32); 3] = [(0.0, 1.0), (1.0, 3.0), (3.0, 6.0)];

/// Resolución relativa por debajo de la cual la varianza se considera nula
const VARIANCE_RESOLUTION: f64 = 1e-6;

/// Política de extracción. Un modelo se entrena y se consulta siempre
/// con la misma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeaturePolicy {
    /// mean, std, min, max por canal, agrupados por estadístico (4*C)
    #[default]
    Simple,
    /// 6 estadísticos por canal + magnitud de la tríada 0..3 + 3 bandas (6*C [+3] + 3)
    Rich,
}

impl FeaturePolicy {
    /// Longitud del vector de características para `channels` canales
    pub fn feature_len(self, channels: usize) -> usize {
        match self {
            FeaturePolicy::Simple => 4 * channels,
            FeaturePolicy::Rich => {
                let triad = if channels >= 3 { 3 } else { 0 };
                6 * channels + triad + FREQUENCY_BANDS.len()
            }
        }
    }
}

pub struct FeatureExtractor {
    planner: FftPlanner<f32>,
    policy: FeaturePolicy,
    sample_rate: f32,
}

impl FeatureExtractor {
    pub fn new(policy: FeaturePolicy, sample_rate: f32) -> Self {
        Self {
            planner: FftPlanner::new(),
            policy,
            sample_rate,
        }
    }

    /// Extractor de momentos simples, el que usa el pipeline por defecto
    pub fn simple() -> Self {
        Self::new(FeaturePolicy::Simple, SAMPLING_RATE)
    }

    pub fn rich(sample_rate: f32) -> Self {
        Self::new(FeaturePolicy::Rich, sample_rate)
    }

    pub fn policy(&self) -> FeaturePolicy {
        self.policy
    }

    /// Extrae el vector de características de una ventana [T x C].
    /// Función pura del contenido numérico; T = 0 produce ceros.
    pub fn extract(&mut self, window: &Window) -> Vec<f32> {
        match self.policy {
            FeaturePolicy::Simple => self.simple_features(window),
            FeaturePolicy::Rich => self.rich_features(window),
        }
    }

    /// Extrae características de una única muestra (ventana 1 x C)
    pub fn extract_sample(&mut self, sample: &[f32]) -> Vec<f32> {
        match Window::from_sample(sample) {
            Ok(window) => self.extract(&window),
            Err(_) => Vec::new(),
        }
    }

    fn simple_features(&self, window: &Window) -> Vec<f32> {
        let channels = window.channels();
        let mut means = Vec::with_capacity(channels);
        let mut stds = Vec::with_capacity(channels);
        let mut mins = Vec::with_capacity(channels);
        let mut maxs = Vec::with_capacity(channels);

        for ch in 0..channels {
            let signal = window.channel(ch);
            means.push(mean(&signal));
            stds.push(std(&signal));
            mins.push(min(&signal));
            maxs.push(max(&signal));
        }

        // Agrupados por estadístico: todas las medias, luego std, min, max
        let mut features = Vec::with_capacity(4 * channels);
        features.extend(means);
        features.extend(stds);
        features.extend(mins);
        features.extend(maxs);
        features
    }

    fn rich_features(&mut self, window: &Window) -> Vec<f32> {
        let channels = window.channels();
        let mut features = Vec::with_capacity(self.policy.feature_len(channels));

        for ch in 0..channels {
            let signal = window.channel(ch);
            features.push(mean(&signal));
            features.push(std(&signal));
            features.push(range(&signal));
            features.push(rms(&signal));
            features.push(skewness(&signal));
            features.push(kurtosis(&signal));
        }

        // Magnitud de los 3 primeros canales como tríada tipo acelerómetro
        if channels >= 3 {
            let magnitude: Vec<f32> = window
                .rows()
                .map(|row| (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt())
                .collect();
            features.push(mean(&magnitude));
            features.push(std(&magnitude));
            features.push(max(&magnitude));
        }

        let first = if channels > 0 { window.channel(0) } else { Vec::new() };
        features.extend(self.band_energies(&first));
        features
    }

    /// Suma de |rfft| del canal 0 en cada banda. Con menos de 2 muestras
    /// la estimación espectral no tiene sentido y se devuelven ceros.
    fn band_energies(&mut self, signal: &[f32]) -> Vec<f32> {
        if signal.len() < 2 {
            return vec![0.0; FREQUENCY_BANDS.len()];
        }

        let mut spectrum: Vec<Complex<f32>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(spectrum.len());
        fft.process(&mut spectrum);

        // Sólo frecuencias positivas, como rfft
        let n = signal.len() as f32;
        let bins = signal.len() / 2 + 1;
        let magnitudes: Vec<f32> = spectrum.iter().take(bins).map(|c| c.norm()).collect();
        let freqs: Vec<f32> = (0..bins).map(|k| k as f32 * self.sample_rate / n).collect();

        FREQUENCY_BANDS
            .iter()
            .map(|&(fmin, fmax)| {
                freqs
                    .iter()
                    .zip(&magnitudes)
                    .filter(|(f, _)| **f >= fmin && **f < fmax)
                    .map(|(_, &m)| m)
                    .sum()
            })
            .collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::simple()
    }
}

// ========== Funciones estadísticas ==========

fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

/// Desviación estándar poblacional (ddof = 0)
fn std(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = mean(data);
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / data.len() as f32;
    variance.sqrt()
}

fn min(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().fold(f32::INFINITY, |a, &b| a.min(b))
}

fn max(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
}

fn range(data: &[f32]) -> f32 {
    max(data) - min(data)
}

fn rms(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|x| x * x).sum::<f32>() / data.len() as f32).sqrt()
}

/// Momentos centrales (m2, m3, m4) en f64, o None si no están definidos
/// (T < 2 o varianza nula)
fn central_moments(data: &[f32]) -> Option<(f64, f64, f64)> {
    if data.len() < 2 {
        return None;
    }
    let n = data.len() as f64;
    let mean = data.iter().map(|&x| x as f64).sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in data {
        let d = x as f64 - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    if m2 <= (VARIANCE_RESOLUTION * mean.abs()).powi(2) || m2 == 0.0 {
        return None;
    }
    Some((m2, m3, m4))
}

/// Asimetría sesgada m3 / m2^1.5; 0.0 si no está definida
fn skewness(data: &[f32]) -> f32 {
    central_moments(data)
        .map(|(m2, m3, _)| (m3 / m2.powf(1.5)) as f32)
        .unwrap_or(0.0)
}

/// Curtosis en exceso (Fisher, sesgada) m4 / m2^2 - 3; 0.0 si no está definida
fn kurtosis(data: &[f32]) -> f32 {
    central_moments(data)
        .map(|(m2, _, m4)| (m4 / (m2 * m2) - 3.0) as f32)
        .unwrap_or(0.0)
}
