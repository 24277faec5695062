mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cli::Cli;
use tonesteer::audio::decode::FileCapture;
use tonesteer::classify::ScriptedClassifier;
use tonesteer::config::{self, Config};
use tonesteer::eq::{ApoConfigBackend, Equalizer, EqualizerBackend, NullBackend, ParametricEqState, ProfileCatalog};
use tonesteer::AdaptiveEq;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect tonesteer.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("tonesteer.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("tonesteer").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("tonesteer").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let mut cfg = Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Merge: CLI values apply only when moved off their defaults
    if cli.analysis_window != 4.0 { cfg.adaptive.analysis_window = cli.analysis_window; }
    if cli.hysteresis != 10.0 { cfg.decision.hysteresis_delay = cli.hysteresis; }
    if cli.cooldown != 12.0 { cfg.decision.cooldown_period = cli.cooldown; }
    if cli.poll_ms != 100 { cfg.adaptive.poll_interval_ms = cli.poll_ms; }
    if cli.eq_output.is_some() {
        cfg.engine.config_path = cli.eq_output.clone();
    }
    if cli.catalog.is_some() {
        cfg.engine.catalog = cli.catalog.clone();
    }
    cfg.validate().context("Invalid configuration")?;

    let catalog = match cfg.engine.catalog {
        Some(ref path) => Arc::new(ProfileCatalog::load(path)?),
        None => ProfileCatalog::builtin(),
    };

    // List profiles mode
    if cli.list_profiles {
        println!("Available profiles:");
        for profile in catalog.profiles() {
            println!("  {:<12} {}", profile.key, profile.name);
        }
        return Ok(());
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let script = cli
        .detections
        .as_ref()
        .context("A detection script is required (--detections)")?;

    log::info!("tonesteer - adaptive equalizer");
    log::info!("Input: {}", input.display());
    log::info!("Detections: {}", script.display());
    log::info!(
        "Window {:.1}s, hysteresis {:.1}s, cooldown {:.1}s",
        cfg.adaptive.analysis_window,
        cfg.decision.hysteresis_delay,
        cfg.decision.cooldown_period
    );

    let baseline = match cli.baseline {
        Some(ref path) => load_state(path)?,
        None => ParametricEqState::flat_ten_band(),
    };
    let backend: Box<dyn EqualizerBackend> = match cfg.engine.config_path {
        Some(ref path) => {
            let backend = ApoConfigBackend::new(path.clone());
            log::info!("EQ output: {}", backend.path().display());
            Box::new(backend)
        }
        None => {
            log::info!("No EQ output configured, state stays in memory");
            Box::new(NullBackend)
        }
    };
    let equalizer = Arc::new(Equalizer::new(baseline, backend));
    equalizer
        .write(equalizer.snapshot())
        .context("Failed to write initial EQ")?;

    let capture = FileCapture::open(input)?;
    log::info!("Loop length: {:.1}s", capture.duration());
    let classifier = ScriptedClassifier::load(script)?;

    let adaptive = AdaptiveEq::new(cfg, catalog, equalizer.clone());
    adaptive.enable(Box::new(classifier), Box::new(capture))?;

    std::thread::sleep(Duration::from_secs_f32(cli.run_for.max(0.0)));

    log::info!("Final profile: {}", adaptive.current_profile());
    adaptive.disable();
    adaptive.wait_for_transition();

    if cli.print_state {
        println!("{}", serde_json::to_string_pretty(&equalizer.snapshot())?);
    }

    log::info!("Done");
    Ok(())
}

fn load_state(path: &Path) -> Result<ParametricEqState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline EQ: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse baseline EQ: {}", path.display()))
}
