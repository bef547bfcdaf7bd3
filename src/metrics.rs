//! Reporte de clasificación (precision / recall / F1 por clase) y matriz
//! de confusión. Una división por cero se reporta como 0.0.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f32,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: usize,
}

/// Matriz de confusión: filas = clase real, columnas = clase predicha
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

fn f1(precision: f32, recall: f32) -> f32 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Etiquetas presentes en y_true ∪ y_pred, ordenadas
fn label_set(y_true: &[String], y_pred: &[String]) -> Vec<String> {
    y_true
        .iter()
        .chain(y_pred)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl ConfusionMatrix {
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let labels = label_set(y_true, y_pred);
        let index: BTreeMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
        for (truth, pred) in y_true.iter().zip(y_pred) {
            matrix[index[truth.as_str()]][index[pred.as_str()]] += 1;
        }
        Self { labels, matrix }
    }
}

impl ClassificationReport {
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let confusion = ConfusionMatrix::new(y_true, y_pred);
        let n = confusion.labels.len();
        let total: usize = y_true.len().min(y_pred.len());

        let mut classes = Vec::with_capacity(n);
        for (i, label) in confusion.labels.iter().enumerate() {
            let tp = confusion.matrix[i][i];
            let predicted: usize = (0..n).map(|r| confusion.matrix[r][i]).sum();
            let support: usize = confusion.matrix[i].iter().sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            classes.push(ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1: f1(precision, recall),
                support,
            });
        }

        let correct: usize = (0..n).map(|i| confusion.matrix[i][i]).sum();
        let accuracy = ratio(correct, total);

        let count = classes.len().max(1) as f32;
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f32>() / count,
            recall: classes.iter().map(|c| c.recall).sum::<f32>() / count,
            f1: classes.iter().map(|c| c.f1).sum::<f32>() / count,
            support: total,
        };

        let weight = |f: fn(&ClassMetrics) -> f32| -> f32 {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f32).sum::<f32>() / total as f32
            }
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            total,
        }
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total)?;
        for c in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.labels.iter().map(|l| l.len()).max().unwrap_or(1).max(3);
        write!(f, "{:>width$}", "", width = width)?;
        for label in &self.labels {
            write!(f, " {:>width$}", label, width = width)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(&self.matrix) {
            write!(f, "{:>width$}", label, width = width)?;
            for value in row {
                write!(f, " {:>width$}", value, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_predictions() {
        let y = labels(&["A", "B", "A", "AB"]);
        let report = ClassificationReport::new(&y, &y);
        assert_eq!(report.accuracy, 1.0);
        for class in &report.classes {
            assert_eq!(class.precision, 1.0);
            assert_eq!(class.recall, 1.0);
            assert_eq!(class.f1, 1.0);
        }
        assert_eq!(report.class("A").unwrap().support, 2);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let y_true = labels(&["A", "A", "B", "B", "B"]);
        let y_pred = labels(&["A", "B", "B", "B", "A"]);
        let cm = ConfusionMatrix::new(&y_true, &y_pred);
        assert_eq!(cm.labels, vec!["A", "B"]);
        assert_eq!(cm.matrix, vec![vec![1, 1], vec![1, 2]]);

        let report = ClassificationReport::new(&y_true, &y_pred);
        let b = report.class("B").unwrap();
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((b.recall - 2.0 / 3.0).abs() < 1e-6);
        assert!((report.accuracy - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_class_only_in_predictions_scores_zero() {
        let y_true = labels(&["A", "A"]);
        let y_pred = labels(&["A", "C"]);
        let report = ClassificationReport::new(&y_true, &y_pred);

        let c = report.class("C").unwrap();
        assert_eq!(c.support, 0);
        assert_eq!(c.precision, 0.0);
        assert_eq!(c.recall, 0.0);
        assert_eq!(c.f1, 0.0);
        assert!(format!("{}", report).contains("accuracy"));
    }

    #[test]
    fn test_empty_inputs() {
        let report = ClassificationReport::new(&[], &[]);
        assert_eq!(report.accuracy, 0.0);
        assert!(report.classes.is_empty());
        assert_eq!(report.weighted_avg.f1, 0.0);
    }
}
