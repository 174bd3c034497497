use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pcm_stream_player::audio::CpalDevice;
use pcm_stream_player::{default_player, PlaybackState, PlayerConfiguration, PlayerHandle};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play a raw PCM stream from a WebSocket endpoint")]
struct Args {
    /// JSON settings file; defaults are used if it does not exist
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the endpoint from the settings file
    #[arg(long)]
    endpoint: Option<String>,

    /// Linear volume between 0 and 1
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// Write the effective settings to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print a spectrum meter while playing
    #[arg(long)]
    meter: bool,
}

const METER_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn meter_line(spectrum: &[f32]) -> String {
    spectrum
        .iter()
        .map(|&v| {
            let idx = (v.clamp(0.0, 1.0) * (METER_GLYPHS.len() - 1) as f32).round() as usize;
            METER_GLYPHS[idx]
        })
        .collect()
}

/// Stop the driver once the stream ends or fails. Returns true on failure.
async fn watch_status(handle: PlayerHandle) -> bool {
    let mut status = handle.subscribe_status();
    let mut started = false;
    while status.changed().await.is_ok() {
        let state = *status.borrow_and_update();
        log::info!("status: {:?}", state);
        match state {
            PlaybackState::Connecting | PlaybackState::Connected => started = true,
            PlaybackState::Error => {
                let _ = handle.shutdown();
                return true;
            }
            PlaybackState::NotConnected if started => {
                let _ = handle.shutdown();
                return false;
            }
            _ => {}
        }
    }
    false
}

async fn print_meter(handle: PlayerHandle) {
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    loop {
        tick.tick().await;
        eprint!("\r{}", meter_line(&handle.spectrum()));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        for name in CpalDevice::list_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => PlayerConfiguration::load(path)
            .with_context(|| format!("failed to load settings from {:?}", path))?,
        None => PlayerConfiguration::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save(path).context("failed to write settings")?;
        return Ok(());
    }

    let (driver, handle) = default_player(config)?;
    handle.set_volume(args.volume)?;
    handle.connect()?;

    let status_task = tokio::spawn(watch_status(handle.clone()));
    let meter = args.meter.then(|| tokio::spawn(print_meter(handle.clone())));

    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_handle.shutdown();
        }
    });

    driver.run().await;

    if let Some(meter) = meter {
        meter.abort();
        eprintln!();
    }
    if status_task.await.unwrap_or(false) {
        anyhow::bail!("stream ended with an error");
    }
    Ok(())
}
