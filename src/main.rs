// Main
mod crystal;
mod player;
mod prompt;
mod room;
mod sections;

use bevy::prelude::*;
use crystal::CrystalPlugin;
use player::PlayerPlugin;
use prompt::PromptPlugin;
use room::RoomPlugin;
use sections::Sections;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .init_state::<Sections>()
        .add_plugins((RoomPlugin, PlayerPlugin, CrystalPlugin, PromptPlugin::default()))
        .run();
}
