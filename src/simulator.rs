//! Simulador de paquetes del guante: 5 flex + 5 presión + 3 IMU, con ruido
//! y lecturas inestables ocasionales. Útil para demos y pruebas de punta a punta.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Sample, NUM_FLEX, NUM_PRESSURE};

/// Niveles base de un gesto simulado
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureProfile {
    pub flex: i32,
    pub pressure: i32,
    /// Probabilidad de que un paquete sea estable (sin lectura atípica)
    pub stability: f64,
    /// Amplitud del ruido uniforme alrededor del nivel base
    pub noise: i32,
}

impl GestureProfile {
    /// Perfiles conocidos (A, B, C); cualquier otro gesto usa uno genérico
    pub fn for_gesture(gesture: &str) -> Self {
        let (flex, pressure, stability, noise) = match gesture {
            "A" => (85, 65, 0.85, 10),
            "B" => (55, 40, 0.7, 12),
            "C" => (75, 80, 0.9, 9),
            _ => (60, 50, 0.8, 10),
        };
        Self {
            flex,
            pressure,
            stability,
            noise,
        }
    }
}

pub struct GloveSimulator<R: Rng = StdRng> {
    profile: GestureProfile,
    rng: R,
}

impl GloveSimulator<StdRng> {
    /// Simulador reproducible
    pub fn seeded(gesture: &str, seed: u64) -> Self {
        Self::with_rng(GestureProfile::for_gesture(gesture), StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(gesture: &str) -> Self {
        Self::with_rng(GestureProfile::for_gesture(gesture), StdRng::from_entropy())
    }
}

impl<R: Rng> GloveSimulator<R> {
    pub fn with_rng(profile: GestureProfile, rng: R) -> Self {
        Self { profile, rng }
    }

    /// Genera un paquete [flex0..4, pres0..4, ax, ay, az]
    pub fn next_packet(&mut self) -> Sample {
        let p = self.profile;
        let mut flex: Vec<i32> = (0..NUM_FLEX)
            .map(|_| self.rng.gen_range(p.flex - p.noise..=p.flex + p.noise))
            .collect();
        let mut pressure: Vec<i32> = (0..NUM_PRESSURE)
            .map(|_| self.rng.gen_range(p.pressure - p.noise..=p.pressure + p.noise))
            .collect();

        // Lectura atípica: un dedo mal doblado y mal presionado
        let unstable = self.rng.gen::<f64>() > p.stability;
        if unstable {
            let i = self.rng.gen_range(0..NUM_FLEX.min(NUM_PRESSURE));
            flex[i] = self.rng.gen_range(40..=100);
            pressure[i] = self.rng.gen_range(30..=90);
        }

        let ax = round2(self.rng.gen_range(-0.3..0.3));
        let ay = round2(self.rng.gen_range(-0.3..0.3));
        let az = round2(self.rng.gen_range(0.9..1.0));

        flex.into_iter()
            .chain(pressure)
            .map(|v| v as f32)
            .chain([ax, ay, az])
            .collect()
    }

    pub fn packets(&mut self, count: usize) -> Vec<Sample> {
        (0..count).map(|_| self.next_packet()).collect()
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}
