/// Play states shared by every plugin.
use bevy::prelude::*;

/// Prompts, crystals and the player only run while `Playing`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum Sections {
    #[default]
    Playing,
    Paused,
}
