// The vault room: floor, lights, and the named props that prompts refer to.
use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::player::Player;
use crate::prompt::PromptSignal;
use crate::sections::Sections;

pub struct RoomPlugin;

impl Plugin for RoomPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GlobalAmbientLight {
            color: Color::srgb(0.6, 0.65, 0.8),
            brightness: 40.0,
            affects_lightmapped_meshes: false,
        })
        .add_systems(Startup, setup_room)
        .add_systems(Update, use_switches.run_if(in_state(Sections::Playing)))
        .add_observer(lights_out);
    }
}

/// How close the player must stand to use a switch.
const REACH: f32 = 2.5;
const ROOM_SIZE: f32 = 16.0;
const LIGHTS_OUT: &str = "lights_out";
const DARK_BRIGHTNESS: f32 = 5.0;

/// A prop that toggles another named entity on and off.
#[derive(Component)]
struct Switch {
    target: &'static str,
}

fn setup_room(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Floor"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(ROOM_SIZE, ROOM_SIZE))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.22, 0.22, 0.26),
            perceptual_roughness: 0.9,
            ..default()
        })),
    ));

    // Off until the breaker is thrown.
    commands.spawn((
        Name::new("Lamp"),
        PointLight {
            color: Color::srgb(1.0, 0.9, 0.7),
            intensity: 150_000.0,
            range: 20.0,
            ..default()
        },
        Transform::from_xyz(0.0, 3.5, 0.0),
        Visibility::Hidden,
    ));

    // Revealed by the script.
    commands.spawn((
        Name::new("Breaker"),
        Switch { target: "Lamp" },
        Mesh3d(meshes.add(Cuboid::new(0.6, 0.8, 0.1))),
        MeshMaterial3d(materials.add(Color::srgb(0.8, 0.2, 0.1))),
        Transform::from_xyz(4.0, 1.3, -2.0).with_rotation(Quat::from_rotation_y(-FRAC_PI_2)),
        Visibility::Hidden,
    ));

    commands.spawn((
        Name::new("Door"),
        Mesh3d(meshes.add(Cuboid::new(2.0, 3.0, 0.2))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.3, 0.25))),
        Transform::from_xyz(0.0, 1.5, -7.5),
    ));

    commands.spawn((
        Name::new("Door control"),
        Switch { target: "Door" },
        Mesh3d(meshes.add(Cuboid::new(0.3, 0.3, 0.1))),
        MeshMaterial3d(materials.add(Color::srgb(0.2, 0.7, 0.3))),
        Transform::from_xyz(1.8, 1.3, -7.3),
    ));
}

fn use_switches(
    keyboard: Res<ButtonInput<KeyCode>>,
    player: Query<&GlobalTransform, With<Player>>,
    switches: Query<(&Switch, &GlobalTransform, &Visibility)>,
    mut targets: Query<(&Name, &mut Visibility), Without<Switch>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyF) {
        return;
    }
    let Ok(player) = player.single() else {
        return;
    };

    let usable = switches
        .iter()
        .filter(|(_, _, visibility)| **visibility != Visibility::Hidden)
        .map(|(switch, transform, _)| (switch.target, transform.translation()));
    let Some(target) = nearest_switch(player.translation(), usable) else {
        return;
    };

    for (name, mut visibility) in &mut targets {
        if name.as_str() == target {
            *visibility = toggled(*visibility);
            info!("switched {target} to {:?}", *visibility);
        }
    }
}

/// The last shift ends with the room going dark.
fn lights_out(signal: On<PromptSignal>, mut ambient: ResMut<GlobalAmbientLight>) {
    if signal.event().name == LIGHTS_OUT {
        ambient.brightness = DARK_BRIGHTNESS;
    }
}

/// Target of the closest switch within reach.
fn nearest_switch<'a>(
    from: Vec3,
    switches: impl IntoIterator<Item = (&'a str, Vec3)>,
) -> Option<&'a str> {
    switches
        .into_iter()
        .map(|(target, at)| (target, at.distance(from)))
        .filter(|(_, distance)| *distance <= REACH)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(target, _)| target)
}

fn toggled(visibility: Visibility) -> Visibility {
    if visibility == Visibility::Hidden {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}
