//! gearbox CLI: plays a demo song on the default device or renders it to
//! a WAV file.
//!
//! Usage:
//!   gearbox
//!   gearbox --wav out.wav --seconds 20 --bpm 140

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use std::{fs, io};

use clap::Parser;
use gb_engine::machines::{oscillator, passthrough};
use gb_engine::{AudioWire, EngineConfig, EngineError, ParamGroup, Player, WireParams, AMP_MAX};
use gb_master::{Controller, ControllerError};
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gearbox")]
#[command(author, version, about = "Machine-graph tracker engine", long_about = None)]
struct Cli {
    /// Engine settings in TOML; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render to this WAV file instead of playing
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Beats per minute
    #[arg(long)]
    bpm: Option<u16>,

    /// Ticks per beat
    #[arg(long)]
    tpb: Option<u16>,

    /// Sample rate for WAV rendering
    #[arg(long, default_value_t = 44_100, value_parser = clap::value_parser!(u32).range(8_000..=384_000))]
    rate: u32,

    /// Longest playback or render, in seconds
    #[arg(long, default_value_t = 8)]
    seconds: u32,

    /// Stop at the end of the song instead of looping
    #[arg(long)]
    once: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let mut ctrl = Controller::new(&config)?;
    build_demo(ctrl.player())?;

    match &cli.wav {
        Some(path) => render_to_wav(&ctrl, path, cli.rate, cli.seconds),
        None => play_audio(&mut ctrl, cli.seconds),
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| CliError::Io { path: path.clone(), source })?;
            EngineConfig::from_toml_str(&text)?
        }
        None => EngineConfig::default(),
    };
    if let Some(bpm) = cli.bpm {
        config.beats_per_minute = bpm;
    }
    if let Some(tpb) = cli.tpb {
        config.ticks_per_beat = tpb;
    }
    if cli.once {
        config.loop_enabled = false;
    }
    config.sample_rate = cli.rate;
    Ok(config)
}

/// Two oscillators, one through a passthrough, playing a 16-tick
/// arpeggio over a held bass note.
fn build_demo(p: &Player) -> Result<(), EngineError> {
    let lead = p.create_machine(oscillator::INFO.uri, "Lead", &[])?;
    let bass = p.create_machine(oscillator::INFO.uri, "Bass", &[])?;
    let fx = p.create_machine(passthrough::INFO.uri, "Fx", &[])?;
    p.connect(lead, fx, WireParams::Audio(AudioWire::new(AMP_MAX / 2, 0x3000)))?;
    p.connect(fx, p.master(), WireParams::Audio(AudioWire::default()))?;
    p.connect(bass, p.master(), WireParams::Audio(AudioWire::new(AMP_MAX / 2, 0x5000)))?;
    p.set_parameter(bass, ParamGroup::Global, 0, oscillator::WAVE, 1)?;

    let arp = p.add_pattern(lead, "arp", 16)?;
    for (row, note) in [60, 64, 67, 72].iter().cycle().take(16).enumerate() {
        p.set_pattern_value(lead, arp, row as u16, ParamGroup::Track, 0, oscillator::NOTE, *note)?;
    }
    let hold = p.add_pattern(bass, "hold", 16)?;
    p.set_pattern_value(bass, hold, 0, ParamGroup::Track, 0, oscillator::NOTE, 36)?;
    p.set_pattern_value(bass, hold, 12, ParamGroup::Track, 0, oscillator::NOTE, 0)?;

    for (machine, pattern) in [(lead, arp), (bass, hold)] {
        let track = p.add_sequence_track(machine)?;
        p.set_sequence_event(track, 0, Some(pattern as u16))?;
    }
    info!(machines = p.machines().len(), "demo song ready");
    Ok(())
}

fn play_audio(ctrl: &mut Controller, seconds: u32) -> Result<(), CliError> {
    ctrl.play()?;
    let started = Instant::now();
    let limit = Duration::from_secs(seconds as u64);

    while ctrl.is_playing() && started.elapsed() < limit {
        ctrl.player().drain_notifications(|n| debug!(?n, "notification"));
        std::thread::sleep(Duration::from_millis(50));
    }
    info!(
        position = ctrl.player().position(),
        cpu_load = ctrl.player().cpu_load(),
        "done"
    );
    ctrl.stop();
    Ok(())
}

fn render_to_wav(ctrl: &Controller, path: &Path, rate: u32, seconds: u32) -> Result<(), CliError> {
    info!(path = %path.display(), rate, "rendering");
    let wav = ctrl.render_to_wav(rate, seconds)?;
    fs::write(path, &wav).map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    info!(bytes = wav.len(), "done");
    Ok(())
}
