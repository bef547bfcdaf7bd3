//! Conjunto etiquetado de vectores de características y partición
//! entrenamiento/prueba con salvaguardas para distribuciones degeneradas.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tracing::warn;

/// Por debajo de este total no se parte: se entrena y evalúa con todo
pub const MIN_SPLIT_SAMPLES: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("La clase {label:?} tiene sólo {count} muestra(s); se necesitan al menos 2")]
    ClassTooSmall { label: String, count: usize },

    #[error("{slots} muestra(s) de {part} para {classes} clases")]
    TooFewSlots {
        part: &'static str,
        slots: usize,
        classes: usize,
    },

    #[error("Conjunto vacío")]
    Empty,
}

/// Vectores de características y sus etiquetas, en paralelo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSet {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

impl LabeledSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, features: Vec<f32>, label: impl Into<String>) {
        self.features.push(features);
        self.labels.push(label.into());
    }

    /// Concatena otro conjunto al final
    pub fn extend(&mut self, other: LabeledSet) {
        self.features.extend(other.features);
        self.labels.extend(other.labels);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Muestras por clase, ordenadas por etiqueta
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn subset(&self, indices: &[usize]) -> LabeledSet {
        LabeledSet {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }
}

/// Cómo se obtuvo la partición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Conjunto demasiado pequeño: entrenamiento = prueba = todo (métricas optimistas)
    Full,
    Stratified,
    /// La estratificación no era posible
    Shuffled,
}

#[derive(Debug, Clone)]
pub struct Split {
    pub train: LabeledSet,
    pub test: LabeledSet,
    pub kind: SplitKind,
}

fn test_size(n: usize, test_fraction: f32) -> usize {
    // 0.2f32 en f64 es 0.2000000029...: sin el margen, ceil(25 * 0.2) daría 6
    let exact = n as f64 * test_fraction as f64 - 1e-6;
    (exact.ceil() as usize).clamp(1, n.saturating_sub(1).max(1))
}

/// Partición estratificada: cada clase conserva su proporción en ambos lados.
/// Falla si alguna clase tiene menos de 2 muestras o no hay sitio para
/// todas las clases en entrenamiento y prueba.
pub fn stratified_split(
    set: &LabeledSet,
    test_fraction: f32,
    rng: &mut StdRng,
) -> Result<(LabeledSet, LabeledSet), SplitError> {
    let n = set.len();
    if n == 0 {
        return Err(SplitError::Empty);
    }

    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in set.labels.iter().enumerate() {
        by_class.entry(label.as_str()).or_default().push(i);
    }

    if let Some((label, idx)) = by_class.iter().find(|(_, idx)| idx.len() < 2) {
        return Err(SplitError::ClassTooSmall {
            label: label.to_string(),
            count: idx.len(),
        });
    }

    let n_test = test_size(n, test_fraction);
    let n_train = n - n_test;
    let classes = by_class.len();
    if n_test < classes {
        return Err(SplitError::TooFewSlots {
            part: "prueba",
            slots: n_test,
            classes,
        });
    }
    if n_train < classes {
        return Err(SplitError::TooFewSlots {
            part: "entrenamiento",
            slots: n_train,
            classes,
        });
    }

    // Reparto proporcional con restos mayores; cada clase queda con al
    // menos una muestra de cada lado
    let mut alloc: Vec<(usize, f64)> = by_class
        .values()
        .map(|idx| {
            let exact = idx.len() as f64 * n_test as f64 / n as f64;
            let base = (exact.floor() as usize).clamp(1, idx.len() - 1);
            (base, exact - exact.floor())
        })
        .collect();
    let caps: Vec<usize> = by_class.values().map(|idx| idx.len() - 1).collect();

    let mut assigned: usize = alloc.iter().map(|(a, _)| a).sum();
    let mut order: Vec<usize> = (0..alloc.len()).collect();
    order.sort_by(|&a, &b| alloc[b].1.partial_cmp(&alloc[a].1).unwrap_or(std::cmp::Ordering::Equal));
    while assigned < n_test {
        let Some(&c) = order.iter().find(|&&c| alloc[c].0 < caps[c]) else {
            break;
        };
        alloc[c].0 += 1;
        alloc[c].1 = -1.0;
        order.sort_by(|&a, &b| alloc[b].1.partial_cmp(&alloc[a].1).unwrap_or(std::cmp::Ordering::Equal));
        assigned += 1;
    }
    while assigned > n_test {
        let Some(c) = (0..alloc.len()).filter(|&c| alloc[c].0 > 1).max_by_key(|&c| alloc[c].0) else {
            break;
        };
        alloc[c].0 -= 1;
        assigned -= 1;
    }

    let mut train_idx = Vec::with_capacity(n_train);
    let mut test_idx = Vec::with_capacity(n_test);
    for (indices, (take, _)) in by_class.values().zip(&alloc) {
        let mut shuffled = indices.clone();
        shuffled.shuffle(rng);
        test_idx.extend_from_slice(&shuffled[..*take]);
        train_idx.extend_from_slice(&shuffled[*take..]);
    }
    train_idx.shuffle(rng);
    test_idx.shuffle(rng);

    Ok((set.subset(&train_idx), set.subset(&test_idx)))
}

/// Partición aleatoria sin estratificar
pub fn shuffled_split(set: &LabeledSet, test_fraction: f32, rng: &mut StdRng) -> (LabeledSet, LabeledSet) {
    let n = set.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let n_test = if n == 0 { 0 } else { test_size(n, test_fraction) };
    let (test_idx, train_idx) = indices.split_at(n_test);
    (set.subset(train_idx), set.subset(test_idx))
}

/// Partición con salvaguardas: con menos de 4 muestras usa todo el conjunto
/// en ambos lados; si la estratificación no es posible, cae a una partición
/// aleatoria en lugar de fallar.
pub fn split_dataset(set: &LabeledSet, test_fraction: f32, seed: u64) -> Split {
    if set.len() < MIN_SPLIT_SAMPLES {
        warn!(
            "⚠️  Conjunto pequeño ({} < {} muestras): se entrena y evalúa con todo, métricas optimistas",
            set.len(),
            MIN_SPLIT_SAMPLES
        );
        return Split {
            train: set.clone(),
            test: set.clone(),
            kind: SplitKind::Full,
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    match stratified_split(set, test_fraction, &mut rng) {
        Ok((train, test)) => Split {
            train,
            test,
            kind: SplitKind::Stratified,
        },
        Err(e) => {
            warn!("⚠️  Partición estratificada imposible: {}. Usando partición aleatoria.", e);
            let (train, test) = shuffled_split(set, test_fraction, &mut rng);
            Split {
                train,
                test,
                kind: SplitKind::Shuffled,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(counts: &[(&str, usize)]) -> LabeledSet {
        let mut set = LabeledSet::new();
        let mut k = 0.0;
        for (label, count) in counts {
            for _ in 0..*count {
                set.push(vec![k, k * 2.0], *label);
                k += 1.0;
            }
        }
        set
    }

    #[test]
    fn test_tiny_set_uses_everything() {
        let set = set_with(&[("A", 2), ("B", 1)]);
        let split = split_dataset(&set, 0.2, 42);
        assert_eq!(split.kind, SplitKind::Full);
        assert_eq!(split.train, set);
        assert_eq!(split.test, set);
    }

    #[test]
    fn test_stratified_keeps_every_class_on_both_sides() {
        let set = set_with(&[("A", 10), ("B", 10), ("AB", 5)]);
        let split = split_dataset(&set, 0.2, 42);
        assert_eq!(split.kind, SplitKind::Stratified);
        assert_eq!(split.train.len() + split.test.len(), 25);
        assert_eq!(split.test.len(), 5);

        let test_counts = split.test.class_counts();
        let train_counts = split.train.class_counts();
        for label in ["A", "B", "AB"] {
            assert!(test_counts.get(label).copied().unwrap_or(0) >= 1, "{} sin prueba", label);
            assert!(train_counts.get(label).copied().unwrap_or(0) >= 1, "{} sin entrenamiento", label);
        }
        assert_eq!(test_counts["A"], 2);
        assert_eq!(test_counts["B"], 2);
        assert_eq!(test_counts["AB"], 1);
    }

    #[test]
    fn test_singleton_class_makes_stratification_infeasible() {
        let set = set_with(&[("A", 5), ("B", 5), ("C", 1)]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            stratified_split(&set, 0.2, &mut rng).unwrap_err(),
            SplitError::ClassTooSmall {
                label: "C".to_string(),
                count: 1
            }
        );

        let split = split_dataset(&set, 0.2, 42);
        assert_eq!(split.kind, SplitKind::Shuffled);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_too_few_test_slots() {
        // 6 muestras, 3 clases: ceil(0.2 * 6) = 2 < 3
        let set = set_with(&[("A", 2), ("B", 2), ("C", 2)]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            stratified_split(&set, 0.2, &mut rng),
            Err(SplitError::TooFewSlots { part: "prueba", .. })
        ));
    }

    #[test]
    fn test_split_is_reproducible_and_disjoint() {
        let set = set_with(&[("A", 8), ("B", 8)]);
        let a = split_dataset(&set, 0.25, 7);
        let b = split_dataset(&set, 0.25, 7);
        assert_eq!(a.test, b.test);

        for features in &a.test.features {
            assert!(!a.train.features.contains(features));
        }
    }
}
