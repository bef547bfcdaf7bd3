use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use guante::config::Config;
use guante::gesture_classifier::GestureClassifier;
use guante::window_store::load_window_from_csv;

const USAGE: &str = "Uso: replay_window [--dump-features] [--model <gesture_model.json>] <ventana.csv>";

struct ReplayOptions {
    dump_features: bool,
    model_path: PathBuf,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut dump_features = false;
    let mut model_path: Option<PathBuf> = None;
    let mut csv_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-features" => dump_features = true,
            "--model" => {
                let path = args.next().ok_or_else(|| anyhow!("--model necesita una ruta\n{}", USAGE))?;
                model_path = Some(PathBuf::from(path));
            }
            _ => {
                if csv_path.is_some() {
                    bail!(USAGE);
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV\n{}", USAGE))?;
    Ok((
        csv_path,
        ReplayOptions {
            dump_features,
            model_path: model_path.unwrap_or_else(|| Config::default().model_path()),
        },
    ))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo ventana desde {:?}", csv_path);

    let window = load_window_from_csv(&csv_path)?;
    println!("ℹ️  {} muestras x {} canales", window.len(), window.channels());

    let config = Config::default();
    let mut classifier = GestureClassifier::load(&opts.model_path, config.default_confidence)?;

    let (label, conf) = classifier.predict_window(&window)?;
    println!("\n🥇 Predicción: {} ({:.1}%)", label, conf * 100.0);

    if let Some(scores) = classifier.predict_scores(&window) {
        let mut scores = scores?;
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        println!("\nTop-5 probabilidades:");
        for (idx, (label, score)) in scores.iter().take(5).enumerate() {
            println!("  {:>2}. {:<25} {:>6.2}%", idx + 1, label, score * 100.0);
        }
    }

    if opts.dump_features {
        let features = classifier.extract(&window);
        println!(
            "\n📊 {} features ({:?}, orden exacto):",
            features.len(),
            classifier.policy()
        );
        for (idx, value) in features.iter().enumerate() {
            println!("  {:03}: {:>12.6}", idx, value);
        }
    }

    Ok(())
}
