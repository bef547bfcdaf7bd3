//! Combos de gestos: secuencias ordenadas de etiquetas base sin repetición
//! inmediata ("AB", "ABA", nunca "AA"), y síntesis de ventanas combo
//! concatenando ventanas reales elegidas al azar.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::feature_extractor::FeatureExtractor;
use crate::types::Window;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combo {
    parts: Vec<String>,
}

impl Combo {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Etiqueta del combo: concatenación de sus partes
    pub fn label(&self) -> String {
        self.parts.concat()
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Enumera todos los combos de longitud 1..=max_len sin etiquetas
/// idénticas consecutivas, ordenados por longitud y luego por etiqueta.
pub fn enumerate_combos(base_labels: &[String], max_len: usize) -> Vec<Combo> {
    let mut labels: Vec<&String> = base_labels.iter().collect();
    labels.sort();
    labels.dedup();

    let mut combos = Vec::new();
    let mut prefix: Vec<String> = Vec::with_capacity(max_len);
    extend_prefix(&labels, max_len, &mut prefix, &mut combos);

    combos.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.label().cmp(&b.label())));
    combos
}

fn extend_prefix(labels: &[&String], max_len: usize, prefix: &mut Vec<String>, out: &mut Vec<Combo>) {
    if !prefix.is_empty() {
        out.push(Combo::new(prefix.clone()));
    }
    if prefix.len() == max_len {
        return;
    }
    for &label in labels {
        if prefix.last() == Some(label) {
            continue;
        }
        prefix.push(label.clone());
        extend_prefix(labels, max_len, prefix, out);
        prefix.pop();
    }
}

/// Una ventana sintética con sus características y la etiqueta del combo
#[derive(Debug, Clone)]
pub struct SyntheticSample {
    pub label: String,
    pub window: Window,
    pub features: Vec<f32>,
    /// Índice del intento que la produjo (para nombres de archivo únicos)
    pub attempt: usize,
}

/// Genera hasta `count` muestras sintéticas para un combo de longitud > 1.
/// En cada intento se elige una ventana real al azar (con reemplazo) por
/// cada parte y se concatenan en orden. Si alguna parte no tiene ventanas
/// reales el intento se omite; los combos de longitud 1 no producen nada.
pub fn synthesize<R: Rng + ?Sized>(
    combo: &Combo,
    windows_by_label: &BTreeMap<String, Vec<Window>>,
    count: usize,
    extractor: &mut FeatureExtractor,
    rng: &mut R,
) -> Vec<SyntheticSample> {
    if combo.len() <= 1 {
        return Vec::new();
    }

    let label = combo.label();
    let mut samples = Vec::with_capacity(count);

    for attempt in 0..count {
        let mut parts: Vec<&Window> = Vec::with_capacity(combo.len());
        for part in combo.parts() {
            match windows_by_label.get(part).and_then(|pool| pool.choose(rng)) {
                Some(window) => parts.push(window),
                None => break,
            }
        }
        if parts.len() != combo.len() {
            continue;
        }

        // Ventanas con distinto número de canales no se pueden concatenar
        let window = match Window::concat(&parts) {
            Ok(window) => window,
            Err(_) => continue,
        };
        let features = extractor.extract(&window);
        samples.push(SyntheticSample {
            label: label.clone(),
            window,
            features,
            attempt,
        });
    }

    samples
}
