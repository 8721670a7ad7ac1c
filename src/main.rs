//! trackplay: play a tracker module on the default audio device or
//! render it to a WAV file.
//!
//! Usage:
//!   trackplay path/to/file.mod
//!   trackplay path/to/file.mod --wav output.wav

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{fs, process::ExitCode};

use clap::Parser;
use tp_master::{Controller, Module, Notification, RenderOptions, Subscription};

#[derive(Parser, Debug)]
#[command(name = "trackplay", version, about = "Play or render a tracker module")]
struct Cli {
    /// Module file to load
    path: PathBuf,

    /// Render to this WAV file instead of playing
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Longest offline render, in seconds
    #[arg(long, default_value_t = 300)]
    seconds: u32,

    /// Offline render sample rate
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Repeat the first pattern forever
    #[arg(long)]
    loop_pattern: bool,

    /// Mute a channel (0-based); repeatable
    #[arg(long = "mute", value_name = "CHANNEL")]
    mute: Vec<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&cli.path)?;
    let mut ctrl = Controller::default();
    ctrl.load_mod(&data)?;
    if let Some(module) = ctrl.module() {
        print_info(module);
    }

    match &cli.wav {
        Some(path) => render_to_wav(&ctrl, cli, path),
        None => play_audio(&mut ctrl, cli),
    }
}

fn print_info(module: &Module) {
    println!("Title:    {}", module.name);
    println!("Channels: {}", module.num_channels());
    println!("Patterns: {}", module.patterns.len());
    println!("Orders:   {}", module.song_length());
    println!("Tempo:    {} BPM, Speed: {}", module.initial_tempo, module.initial_speed);

    let samples_with_data = module.samples.values().filter(|s| !s.is_empty()).count();
    println!("Samples:  {} (with data)", samples_with_data);
    println!();
}

fn play_audio(ctrl: &mut Controller, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    ctrl.events().subscribe(Subscription::All, move |n| {
        if matches!(n, Notification::SongEnded | Notification::PlayStopped) {
            flag.store(true, Ordering::Relaxed);
        }
    });

    ctrl.play()?;
    ctrl.set_pattern_loop(cli.loop_pattern)?;
    for &channel in &cli.mute {
        ctrl.set_mute(channel, true)?;
    }
    println!("Playing...");
    println!();

    while !finished.load(Ordering::Relaxed) {
        ctrl.poll_notifications();
        let pos = ctrl.status();
        print!(
            "\rOrd: {:02X} | Pat: {} | Row: {:02X} | BPM: {:3}",
            pos.order,
            pos.pattern.map_or_else(|| "--".to_string(), |p| format!("{p:02X}")),
            pos.row,
            pos.bpm
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.shutdown();
    println!("\rDone.                                  ");
    Ok(())
}

fn render_to_wav(ctrl: &Controller, cli: &Cli, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Rendering to {} at {} Hz...", path.display(), cli.sample_rate);

    let mut options = RenderOptions::new(cli.sample_rate, cli.seconds);
    options.pattern_loop = cli.loop_pattern;
    options.muted = cli.mute.clone();
    let wav = ctrl.render_to_wav(&options)?;
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav)?;
    println!("Done.");
    Ok(())
}
