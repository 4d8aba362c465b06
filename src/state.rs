use bevy::prelude::*;

#[derive(States, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RainState {
    #[default]
    Load,
    Running,
    /// the frame loop was not re-armed
    Stopped,
}
