pub mod bit;
pub mod camera;
pub mod config;
pub mod matrix;
pub mod rain;
pub mod state;
pub mod surface;

pub mod prelude {
    pub const DEFAULT_CONFIG_PATH: &str = "assets/bitmatrix.ron";
    pub const WINDOW_TITLE: &str = "bitrain";
    pub const WINDOW_SIZE: (f32, f32) = (1000., 700.);
    pub const LOG_FILTER: &str = "info,bitrain_bevy=debug,wgpu=error,naga=warn";
}
