use std::path::PathBuf;

use anyhow::Context;
use bevy::{
    diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin},
    log::LogPlugin,
    prelude::*,
    window::WindowResolution,
};
use bitrain_bevy::{
    camera::CamPlugin, config::BitMatrixConfig, prelude::*, rain::RainPlugin, state::RainState,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bitrain")]
#[command(about = "Fading binary digits as an ambient background", long_about = None)]
struct Args {
    /// Matrix configuration (.ron or .json)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured frames per second
    #[arg(long)]
    fps: Option<f64>,

    /// Override the configured RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop and exit after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = BitMatrixConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let config = config.validate().context("invalid command line override")?;

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(LogPlugin {
                    filter: LOG_FILTER.into(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: WINDOW_TITLE.into(),
                        resizable: true,
                        focused: true,
                        mode: bevy::window::WindowMode::Windowed,
                        resolution: WindowResolution::new(WINDOW_SIZE.0, WINDOW_SIZE.1),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins((FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin::default()))
        .init_state::<RainState>()
        .add_plugins((
            RainPlugin {
                config,
                frame_limit: args.frames,
            },
            CamPlugin,
        ))
        .run();

    Ok(())
}
