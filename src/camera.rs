use bevy::prelude::*;

use crate::{config::BitMatrixConfig, state::RainState};

pub struct CamPlugin;

impl Plugin for CamPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(RainState::Load), (set_clear_color, spawn_cam));
    }
}

// Init
fn set_clear_color(mut commands: Commands, config: Res<BitMatrixConfig>) {
    commands.insert_resource(ClearColor(config.background_color()));
}

fn spawn_cam(mut commands: Commands) {
    // one world unit per logical pixel, so surface coordinates map 1:1
    commands.spawn((
        Camera2d,
        OrthographicProjection {
            scaling_mode: bevy::render::camera::ScalingMode::WindowSize,
            scale: 1.0,
            ..OrthographicProjection::default_2d()
        },
        Msaa::Off,
    ));
}
