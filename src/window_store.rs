use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, warn};

use crate::types::Window;

/// Prefijo de las ventanas sintéticas guardadas para auditoría.
/// Nunca se cargan de vuelta como datos reales.
pub const SYNTHETIC_PREFIX: &str = "synthetic_";
const REAL_PREFIX: &str = "win_";

/// Carga una ventana desde un CSV con formato sample,c0,c1,...,cN
/// ordenado (o no) por sample. Un CSV sólo con encabezado es una ventana vacía.
pub fn load_window_from_csv(path: impl AsRef<Path>) -> Result<Window> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Encabezado inválido en {:?}", path))?
        .clone();
    ensure!(
        headers.len() >= 2 && &headers[0] == "sample",
        "El CSV {:?} debe empezar con 'sample' y al menos un canal",
        path
    );
    let channels = headers.len() - 1;

    let mut rows: BTreeMap<usize, Vec<f32>> = BTreeMap::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;

        let sample: usize = record[0]
            .parse()
            .with_context(|| format!("sample inválido en fila {}", row_idx + 1))?;
        let values = record
            .iter()
            .skip(1)
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .with_context(|| format!("Valor no numérico en fila {}", row_idx + 1))?;

        if rows.insert(sample, values).is_some() {
            bail!("sample {} duplicado (fila {})", sample, row_idx + 1);
        }
    }

    let rows: Vec<Vec<f32>> = rows.into_values().collect();
    Window::from_rows(&rows, channels).with_context(|| format!("Ventana inconsistente en {:?}", path))
}

/// Escribe la ventana en formato CSV (sample,c0..cN)
pub fn write_window_csv(path: impl AsRef<Path>, window: &Window) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("No se pudo crear {:?}", path))?;

    let mut header = vec!["sample".to_string()];
    header.extend((0..window.channels()).map(|c| format!("c{}", c)));
    writer.write_record(&header)?;

    for (t, row) in window.rows().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(t.to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Directorio raíz con una carpeta por etiqueta: data/A, data/B, data/AB, ...
#[derive(Debug, Clone)]
pub struct WindowStore {
    root: PathBuf,
}

impl WindowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn label_dir(&self, label: &str) -> PathBuf {
        self.root.join(label)
    }

    /// Etiquetas presentes (subcarpetas), ordenadas
    pub fn discover_labels(&self) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("No se pudo leer el directorio de datos {:?}", self.root))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    labels.push(name.to_string());
                }
            }
        }
        labels.sort();
        Ok(labels)
    }

    /// Guarda una ventana real: <root>/<label>/win_<label>_<ts>.csv
    pub fn save_window(&self, label: &str, window: &Window) -> Result<PathBuf> {
        let ts = chrono::Utc::now().timestamp_millis();
        self.save_unique(label, &format!("{}{}_{}", REAL_PREFIX, label, ts), window)
    }

    /// Guarda una ventana sintética: <root>/<combo>/synthetic_<combo>_<ts>_<intento>.csv
    pub fn save_synthetic(&self, combo: &str, window: &Window, attempt: usize) -> Result<PathBuf> {
        let ts = chrono::Utc::now().timestamp_millis();
        self.save_unique(
            combo,
            &format!("{}{}_{}_{}", SYNTHETIC_PREFIX, combo, ts, attempt),
            window,
        )
    }

    fn save_unique(&self, label: &str, stem: &str, window: &Window) -> Result<PathBuf> {
        let dir = self.label_dir(label);
        fs::create_dir_all(&dir).with_context(|| format!("No se pudo crear {:?}", dir))?;

        // Dos capturas en el mismo milisegundo no deben pisarse
        let mut path = dir.join(format!("{}.csv", stem));
        let mut suffix = 1;
        while path.exists() {
            path = dir.join(format!("{}-{}.csv", stem, suffix));
            suffix += 1;
        }

        write_window_csv(&path, window)?;
        debug!("💾 Ventana guardada en {:?}", path);
        Ok(path)
    }

    /// Carga todas las ventanas reales de una etiqueta. Los archivos ilegibles
    /// se omiten con un aviso; una carpeta inexistente no tiene ventanas.
    pub fn load_label(&self, label: &str) -> Vec<Window> {
        let dir = self.label_dir(label);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| !n.starts_with(SYNTHETIC_PREFIX))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut windows = Vec::with_capacity(paths.len());
        for path in paths {
            match load_window_from_csv(&path) {
                Ok(window) => windows.push(window),
                Err(e) => warn!("⚠️  Omitiendo archivo ilegible {:?}: {:#}", path, e),
            }
        }
        windows
    }

    /// Carga las ventanas reales de cada etiqueta
    pub fn load_all(&self, labels: &[String]) -> BTreeMap<String, Vec<Window>> {
        labels
            .iter()
            .map(|label| (label.clone(), self.load_label(label)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_window() -> Window {
        Window::from_rows(&[vec![1.5, -2.0, 3.25], vec![4.0, 5.0, 6.0]], 3).unwrap()
    }

    #[test]
    fn test_save_and_load_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());

        let path = store.save_window("A", &sample_window()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("win_A_"));
        assert!(name.ends_with(".csv"));

        let loaded = load_window_from_csv(&path).unwrap();
        assert_eq!(loaded, sample_window());
    }

    #[test]
    fn test_same_millisecond_saves_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());
        for _ in 0..5 {
            store.save_window("B", &sample_window()).unwrap();
        }
        assert_eq!(store.load_label("B").len(), 5);
    }

    #[test]
    fn test_empty_window_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());
        let path = store.save_window("A", &Window::new(13)).unwrap();

        let loaded = load_window_from_csv(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.channels(), 13);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());
        store.save_window("A", &sample_window()).unwrap();

        fs::write(store.label_dir("A").join("win_A_roto.csv"), "sample,c0\n0,abc\n").unwrap();
        fs::write(store.label_dir("A").join("notas.txt"), "no es una ventana").unwrap();

        assert_eq!(store.load_label("A").len(), 1);
    }

    #[test]
    fn test_synthetic_windows_not_loaded_as_real() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());
        store.save_synthetic("AB", &sample_window(), 0).unwrap();
        store.save_window("AB", &sample_window()).unwrap();

        assert_eq!(store.load_label("AB").len(), 1);
        assert!(store.load_label("ZZ").is_empty());
    }

    #[test]
    fn test_discover_labels_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path());
        for label in ["C", "A", "AB"] {
            fs::create_dir_all(store.label_dir(label)).unwrap();
        }
        fs::write(dir.path().join("suelto.csv"), "").unwrap();

        assert_eq!(store.discover_labels().unwrap(), vec!["A", "AB", "C"]);
    }

    #[test]
    fn test_rows_reordered_by_sample_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.csv");
        fs::write(&path, "sample,c0,c1\n1,3,4\n0,1,2\n").unwrap();

        let window = load_window_from_csv(&path).unwrap();
        assert_eq!(window.channel(0), vec![1.0, 3.0]);
    }
}
