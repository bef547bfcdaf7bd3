use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::feature_extractor::{FeatureExtractor, FeaturePolicy};
use crate::types::Window;

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid feature size: expected {expected}, got {actual}")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("Conjunto de entrenamiento vacío")]
    EmptyTrainingSet,

    #[error("{features} vectores de características para {labels} etiquetas")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Versión de artefacto {found} no soportada (se esperaba {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("El modelo no tiene clases")]
    NoClasses,

    #[error("Artefacto corrupto: {0}")]
    CorruptArtifact(String),
}

/// Capacidad mínima de un clasificador ya entrenado: predecir una etiqueta
/// y, opcionalmente, estimar probabilidades por clase.
pub trait GestureModel {
    /// Clases conocidas, en el orden de `predict_proba`
    fn classes(&self) -> &[String];

    /// Longitud de vector de características que espera el modelo
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f32]) -> Result<String, ClassifierError>;

    /// Probabilidades alineadas con `classes()`. `None` si el modelo no
    /// expone esta capacidad.
    fn predict_proba(&self, _features: &[f32]) -> Option<Result<Vec<f32>, ClassifierError>> {
        None
    }
}

/// Hiperparámetros del bosque aleatorio
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Distribución de clases normalizada en la hoja
    Leaf { distribution: Vec<f32> },
    /// x[feature] <= threshold → left
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Hijos siempre posteriores al nodo y dentro del vector: sin ciclos
    /// ni índices colgantes al recorrer el árbol
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("árbol sin nodos".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } if distribution.len() != n_classes => {
                    return Err(format!(
                        "hoja {} con {} probabilidades para {} clases",
                        idx,
                        distribution.len(),
                        n_classes
                    ));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature, left, right, ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("nodo {} corta en la característica {} de {}", idx, feature, n_features));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("nodo {} apunta a un hijo inválido {}", idx, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_distribution(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Datos compartidos durante la construcción de un árbol
struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize]) -> usize {
        let total: usize = counts.iter().sum();
        let distribution = counts
            .iter()
            .map(|&c| if total == 0 { 0.0 } else { c as f32 / total as f32 })
            .collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn grow<R: Rng>(&mut self, indices: &mut [usize], depth: usize, rng: &mut R) -> usize {
        let counts = self.class_counts(indices);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.map(|d| depth >= d).unwrap_or(false);

        if pure || depth_reached || indices.len() < self.params.min_samples_split {
            return self.leaf(&counts);
        }

        let Some((feature, threshold)) = self.best_split(indices, &counts, rng) else {
            return self.leaf(&counts);
        };

        // Partición in situ: primero los que van a la izquierda
        let mut boundary = 0;
        for i in 0..indices.len() {
            if self.x[indices[i]][feature] <= threshold {
                indices.swap(i, boundary);
                boundary += 1;
            }
        }

        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { distribution: Vec::new() });
        let (left_idx, right_idx) = indices.split_at_mut(boundary);
        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);
        self.nodes[node] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node
    }

    /// Mejor corte por impureza de Gini sobre un subconjunto aleatorio de
    /// características. None si ningún corte separa las muestras.
    fn best_split<R: Rng>(&self, indices: &[usize], counts: &[usize], rng: &mut R) -> Option<(usize, f32)> {
        let n = indices.len() as f32;
        let parent = gini(counts, indices.len());
        let n_features = self.x[indices[0]].len();

        let mut best: Option<(usize, f32)> = None;
        let mut best_impurity = parent;

        // Se prueban al menos max_features; si ninguna separa, se sigue con
        // las restantes en orden aleatorio
        for (visited, feature) in sample(rng, n_features, n_features).into_iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let mut column: Vec<(f32, usize)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..column.len() - 1 {
                let (value, class) = column[k];
                left[class] += 1;
                right[class] -= 1;

                let next = column[k + 1].0;
                if value >= next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = column.len() - n_left;
                let impurity = (n_left as f32 * gini(&left, n_left)
                    + n_right as f32 * gini(&right, n_right))
                    / n;

                if impurity < best_impurity - 1e-7 {
                    best_impurity = impurity;
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid >= next { value } else { mid };
                    best = Some((feature, threshold));
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}

/// Bosque aleatorio: árboles CART sobre muestras bootstrap, √features por
/// corte. Las probabilidades son el promedio de las distribuciones de hoja.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f32>], y: &[String], params: &ForestParams) -> Result<Self, ClassifierError> {
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                features: x.len(),
                labels: y.len(),
            });
        }
        if x.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        let n_features = x[0].len();
        if n_features == 0 {
            return Err(ClassifierError::InvalidFeatureSize {
                expected: 1,
                actual: 0,
            });
        }
        if let Some(bad) = x.iter().find(|row| row.len() != n_features) {
            return Err(ClassifierError::InvalidFeatureSize {
                expected: n_features,
                actual: bad.len(),
            });
        }

        let classes: Vec<String> = y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        let max_features = ((n_features as f32).sqrt() as usize).clamp(1, n_features);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators.max(1) {
            let mut bootstrap: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
            let mut builder = TreeBuilder {
                x,
                y: &encoded,
                n_classes: classes.len(),
                max_features,
                params,
                nodes: Vec::new(),
            };
            builder.grow(&mut bootstrap, 0, &mut rng);
            trees.push(DecisionTree { nodes: builder.nodes });
        }

        Ok(Self {
            classes,
            n_features,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Comprueba la estructura de un bosque leído de disco
    fn validate(&self) -> Result<(), ClassifierError> {
        if self.classes.is_empty() {
            return Err(ClassifierError::NoClasses);
        }
        if self.n_features == 0 {
            return Err(ClassifierError::CorruptArtifact("cero características".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::CorruptArtifact("bosque sin árboles".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| ClassifierError::CorruptArtifact(format!("árbol {}: {}", i, e)))?;
        }
        Ok(())
    }

    fn check_size(&self, features: &[f32]) -> Result<(), ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::InvalidFeatureSize {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(())
    }

    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        self.check_size(features)?;
        let mut proba = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            for (p, d) in proba.iter_mut().zip(tree.leaf_distribution(features)) {
                *p += d;
            }
        }
        let n = self.trees.len().max(1) as f32;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}

impl GestureModel for RandomForest {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f32]) -> Result<String, ClassifierError> {
        let proba = self.probabilities(features)?;
        let (best, _) = argmax(&proba).ok_or(ClassifierError::NoClasses)?;
        Ok(self.classes[best].clone())
    }

    fn predict_proba(&self, features: &[f32]) -> Option<Result<Vec<f32>, ClassifierError>> {
        Some(self.probabilities(features))
    }
}

/// Índice y valor máximos; en empate gana el primero
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values.iter().copied().enumerate().fold(None, |best, (i, v)| match best {
        Some((_, bv)) if bv >= v => best,
        _ => Some((i, v)),
    })
}

/// Artefacto persistido: el bosque más la política de características con
/// la que se entrenó, para que la inferencia use exactamente la misma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub policy: FeaturePolicy,
    pub sample_rate_hz: f32,
    pub forest: RandomForest,
}

impl ModelArtifact {
    pub fn new(policy: FeaturePolicy, sample_rate_hz: f32, forest: RandomForest) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            policy,
            sample_rate_hz,
            forest,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Escribir a un temporal y renombrar: el modelo anterior se sustituye entero
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(ClassifierError::UnsupportedVersion {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        artifact.forest.validate()?;
        Ok(artifact)
    }
}

/// Clasificador listo para inferencia: modelo + extractor con la política
/// con la que fue entrenado
pub struct GestureClassifier {
    model: Box<dyn GestureModel + Send>,
    feature_extractor: FeatureExtractor,
    default_confidence: f32,
}

impl GestureClassifier {
    pub fn new(
        model: Box<dyn GestureModel + Send>,
        feature_extractor: FeatureExtractor,
        default_confidence: f32,
    ) -> Self {
        Self {
            model,
            feature_extractor,
            default_confidence,
        }
    }

    pub fn from_artifact(artifact: ModelArtifact, default_confidence: f32) -> Self {
        let extractor = FeatureExtractor::new(artifact.policy, artifact.sample_rate_hz);
        Self::new(Box::new(artifact.forest), extractor, default_confidence)
    }

    pub fn load(model_path: &Path, default_confidence: f32) -> Result<Self, ClassifierError> {
        let artifact = ModelArtifact::load(model_path)?;
        info!("🧠 Modelo cargado: {:?}", model_path);
        info!("🧠 Clases: {:?}", artifact.forest.classes());
        info!("🧠 Política: {:?}, árboles: {}", artifact.policy, artifact.forest.n_trees());
        Ok(Self::from_artifact(artifact, default_confidence))
    }

    /// Predice el gesto de una ventana: (etiqueta, confianza).
    /// La confianza es la probabilidad máxima si el modelo la expone;
    /// si no, la confianza por defecto.
    pub fn predict_window(&mut self, window: &Window) -> Result<(String, f32), ClassifierError> {
        let features = self.feature_extractor.extract(window);
        self.predict_features(&features)
    }

    pub fn predict_features(&self, features: &[f32]) -> Result<(String, f32), ClassifierError> {
        let expected = self.model.n_features();
        if features.len() != expected {
            return Err(ClassifierError::InvalidFeatureSize {
                expected,
                actual: features.len(),
            });
        }

        let label = self.model.predict(features)?;
        let confidence = match self.model.predict_proba(features) {
            Some(proba) => proba?.into_iter().fold(0.0f32, f32::max),
            None => self.default_confidence,
        };
        Ok((label, confidence))
    }

    /// Probabilidades por clase, si el modelo las expone
    pub fn predict_scores(&mut self, window: &Window) -> Option<Result<Vec<(String, f32)>, ClassifierError>> {
        let features = self.feature_extractor.extract(window);
        let proba = self.model.predict_proba(&features)?;
        Some(proba.map(|p| self.model.classes().iter().cloned().zip(p).collect()))
    }

    pub fn extract(&mut self, window: &Window) -> Vec<f32> {
        self.feature_extractor.extract(window)
    }

    pub fn policy(&self) -> FeaturePolicy {
        self.feature_extractor.policy()
    }

    /// Obtiene las etiquetas de clases
    pub fn get_labels(&self) -> &[String] {
        self.model.classes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dos nubes separadas en la característica 0
    fn two_clusters() -> (Vec<Vec<f32>>, Vec<String>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            x.push(vec![0.0 + jitter, 5.0, 1.0 - jitter]);
            y.push("A".to_string());
            x.push(vec![10.0 + jitter, 5.0, 1.0 + jitter]);
            y.push("B".to_string());
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    struct NoProbaModel;

    impl GestureModel for NoProbaModel {
        fn classes(&self) -> &[String] {
            &[]
        }
        fn n_features(&self) -> usize {
            4
        }
        fn predict(&self, _features: &[f32]) -> Result<String, ClassifierError> {
            Ok("A".to_string())
        }
    }

    #[test]
    fn test_forest_separates_clusters() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(forest.classes(), &["A".to_string(), "B".to_string()]);
        assert_eq!(forest.n_trees(), 15);

        assert_eq!(forest.predict(&[0.05, 5.0, 0.9]).unwrap(), "A");
        assert_eq!(forest.predict(&[9.9, 5.0, 1.1]).unwrap(), "B");

        let proba = forest.predict_proba(&[9.9, 5.0, 1.1]).unwrap().unwrap();
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = two_clusters();
        let a = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let query = [5.0, 5.0, 1.0];
        assert_eq!(
            a.predict_proba(&query).unwrap().unwrap(),
            b.predict_proba(&query).unwrap().unwrap()
        );
    }

    #[test]
    fn test_single_class_forest() {
        let x = vec![vec![1.0, 2.0], vec![1.5, 2.5]];
        let y = vec!["A".to_string(), "A".to_string()];
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(forest.predict(&[100.0, -4.0]).unwrap(), "A");
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(matches!(
            RandomForest::fit(&[], &[], &small_params()),
            Err(ClassifierError::EmptyTrainingSet)
        ));

        let x = vec![vec![1.0, 2.0], vec![1.0]];
        let y = vec!["A".to_string(), "B".to_string()];
        assert!(matches!(
            RandomForest::fit(&x, &y, &small_params()),
            Err(ClassifierError::InvalidFeatureSize { expected: 2, actual: 1 })
        ));

        assert!(matches!(
            RandomForest::fit(&x, &y[..1], &small_params()),
            Err(ClassifierError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_predict_rejects_wrong_feature_size() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ClassifierError::InvalidFeatureSize { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_artifact_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("gesture_model.json");

        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let expected = forest.predict_proba(&[3.0, 5.0, 1.0]).unwrap().unwrap();
        ModelArtifact::new(FeaturePolicy::Rich, 10.0, forest).save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.policy, FeaturePolicy::Rich);
        assert_eq!(loaded.forest.predict_proba(&[3.0, 5.0, 1.0]).unwrap().unwrap(), expected);
        assert!(!path.with_extension("json.tmp").exists());
    }

    fn write_artifact(path: &Path, forest: RandomForest) {
        let artifact = ModelArtifact::new(FeaturePolicy::Simple, 10.0, forest);
        fs::write(path, serde_json::to_vec(&artifact).unwrap()).unwrap();
    }

    fn one_split_forest(feature: usize, left: usize, right: usize) -> RandomForest {
        RandomForest {
            classes: vec!["A".to_string(), "B".to_string()],
            n_features: 12,
            trees: vec![DecisionTree {
                nodes: vec![
                    Node::Split {
                        feature,
                        threshold: 0.5,
                        left,
                        right,
                    },
                    Node::Leaf { distribution: vec![1.0, 0.0] },
                    Node::Leaf { distribution: vec![0.0, 1.0] },
                ],
            }],
        }
    }

    #[test]
    fn test_load_rejects_corrupt_forest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gesture_model.json");

        write_artifact(&path, one_split_forest(1, 1, 2));
        assert!(ModelArtifact::load(&path).is_ok());

        // Característica fuera de rango
        write_artifact(&path, one_split_forest(999, 1, 2));
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ClassifierError::CorruptArtifact(_))
        ));

        // Hijo que apunta hacia atrás (ciclo) y hijo colgante
        write_artifact(&path, one_split_forest(1, 0, 2));
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ClassifierError::CorruptArtifact(_))
        ));
        write_artifact(&path, one_split_forest(1, 1, 7));
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ClassifierError::CorruptArtifact(_))
        ));

        // Hoja con una distribución que no cuadra con las clases
        let mut forest = one_split_forest(1, 1, 2);
        forest.trees[0].nodes[2] = Node::Leaf { distribution: vec![1.0] };
        write_artifact(&path, forest);
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ClassifierError::CorruptArtifact(_))
        ));

        // Árbol vacío
        let mut forest = one_split_forest(1, 1, 2);
        forest.trees[0].nodes.clear();
        write_artifact(&path, forest);
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ClassifierError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_trained_forest_passes_validation() {
        let (x, y) = two_clusters();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_classifier_uses_default_confidence_without_proba() {
        let classifier = GestureClassifier::new(Box::new(NoProbaModel), FeatureExtractor::simple(), 0.8);
        let (label, conf) = classifier.predict_features(&[0.0; 4]).unwrap();
        assert_eq!(label, "A");
        assert_eq!(conf, 0.8);
    }

    #[test]
    fn test_classifier_on_window() {
        // Ventanas de 1 canal: simple → [mean, std, min, max]
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut extractor = FeatureExtractor::simple();
        for i in 0..8 {
            let low = Window::from_rows(&[vec![i as f32 * 0.1], vec![1.0]], 1).unwrap();
            let high = Window::from_rows(&[vec![50.0 + i as f32], vec![60.0]], 1).unwrap();
            x.push(extractor.extract(&low));
            y.push("A".to_string());
            x.push(extractor.extract(&high));
            y.push("B".to_string());
        }
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let mut classifier = GestureClassifier::from_artifact(
            ModelArtifact::new(FeaturePolicy::Simple, 10.0, forest),
            0.8,
        );

        let probe = Window::from_sample(&[55.0]).unwrap();
        let (label, conf) = classifier.predict_window(&probe).unwrap();
        assert_eq!(label, "B");
        assert!(conf > 0.5 && conf <= 1.0);

        let scores = classifier.predict_scores(&probe).unwrap().unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(classifier.get_labels(), &["A".to_string(), "B".to_string()]);

        let wrong = Window::from_sample(&[1.0, 2.0]).unwrap();
        assert!(classifier.predict_window(&wrong).is_err());
    }
}
