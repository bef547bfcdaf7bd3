/*
Guante - recolección, entrenamiento y reconocimiento de gestos del guante

Protocolo: una línea JSON por comando en stdin, una línea JSON por evento en
stdout. Los logs van a stderr (RUST_LOG=debug para más detalle).

Flujo típico:
     guante simulate --gesture A --collect | guante serve
     guante train
     guante simulate --gesture B --packets 5 | guante serve
*/

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, select, unbounded};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guante::config::Config;
use guante::dispatcher::{Command, Event, PacketValues, SessionContext};
use guante::simulator::GloveSimulator;
use guante::training::run_training;

#[derive(Parser, Debug)]
#[command(name = "guante", version, about = "Recolección y reconocimiento de gestos del guante")]
struct Cli {
    /// Archivo JSON de configuración (opcional)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Sobrescribe el directorio de datos
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Sobrescribe el directorio de modelos
    #[arg(long, value_name = "DIR", global = true)]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Atiende comandos JSON por stdin y emite eventos por stdout
    Serve,
    /// Ejecuta el pipeline de entrenamiento una vez
    Train,
    /// Genera paquetes simulados como comandos JSON
    Simulate {
        #[arg(long, default_value = "A")]
        gesture: String,
        /// Antepone un start_label con el mismo gesto
        #[arg(long, default_value_t = false)]
        collect: bool,
        /// 11 paquetes a 100 ms cubren una ventana de 1000 ms
        #[arg(long, default_value_t = 11)]
        packets: usize,
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        #[arg(long)]
        duration_ms: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("⚙️  Configuración desde {:?}", path);
            Config::from_json(path)?
        }
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.models_dir {
        config.models_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn emit(out: &mut impl Write, events: &[Event]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut *out, event).context("No se pudo serializar el evento")?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn serve(config: Config) -> Result<()> {
    log_banner(&config);

    // Lector de stdin en su propio hilo → canal acotado
    let (tx_line, rx_line) = bounded::<String>(100);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx_line.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("❌ Error leyendo stdin: {}", e);
                    break;
                }
            }
        }
    });

    let (tx_train, rx_train) = unbounded();
    let mut ctx = SessionContext::new(config).with_training_channel(tx_train);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, &[ctx.summary()])?;

    loop {
        select! {
            recv(rx_line) -> msg => {
                match msg {
                    Ok(line) => {
                        let events = ctx.handle_line(&line, Instant::now());
                        emit(&mut out, &events)?;
                    }
                    Err(_) => {
                        if ctx.is_training() {
                            info!("⏳ Entrada cerrada; esperando el entrenamiento en curso");
                            if let Ok(result) = rx_train.recv() {
                                let events = ctx.finish_training(result);
                                emit(&mut out, &events)?;
                            }
                        }
                        info!("👋 Entrada cerrada, saliendo");
                        break;
                    }
                }
            }
            recv(rx_train) -> result => {
                if let Ok(result) = result {
                    let events = ctx.finish_training(result);
                    emit(&mut out, &events)?;
                }
            }
        }
    }

    Ok(())
}

fn log_banner(config: &Config) {
    info!("🎯 Guante - servicio de gestos");
    info!("📂 Datos: {:?}", config.data_dir);
    info!("🧠 Modelo: {:?}", config.model_path());
    info!(
        "🔧 {} canales, {} ms por ventana, meta {} por etiqueta",
        config.num_channels, config.collect_duration_ms, config.target_per_label
    );
}

fn train(config: Config) -> Result<()> {
    let trained = run_training(&config)?;
    println!("{}", trained.report);
    Ok(())
}

fn simulate(
    gesture: &str,
    collect: bool,
    packets: usize,
    interval_ms: u64,
    duration_ms: Option<u64>,
    seed: Option<u64>,
) -> Result<()> {
    let mut simulator = match seed {
        Some(seed) => GloveSimulator::seeded(gesture, seed),
        None => GloveSimulator::from_entropy(gesture),
    };
    info!("🎬 Simulando gesto {} ({} paquetes)", gesture, packets);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut send = |command: &Command| -> Result<()> {
        serde_json::to_writer(&mut out, command)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    };

    if collect {
        send(&Command::StartLabel {
            label: gesture.to_string(),
            duration_ms,
        })?;
    }

    for i in 0..packets {
        send(&Command::Packet {
            values: PacketValues::Single(simulator.next_packet()),
        })?;
        if interval_ms > 0 && i + 1 < packets {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    info!("🛑 Simulación de {} completa", gesture);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match &cli.command {
        Commands::Serve => serve(load_config(&cli)?),
        Commands::Train => train(load_config(&cli)?),
        Commands::Simulate {
            gesture,
            collect,
            packets,
            interval_ms,
            duration_ms,
            seed,
        } => simulate(gesture, *collect, *packets, *interval_ms, *duration_ms, *seed),
    }
}
