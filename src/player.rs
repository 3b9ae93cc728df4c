// First-person camera controller with mouse look and keyboard movement.
use bevy::input::mouse::MouseMotion;
use bevy::post_process::bloom::Bloom;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};

use crate::sections::Sections;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerSettings>()
            .insert_resource(ClearColor(Color::BLACK))
            .add_systems(Startup, spawn_player)
            .add_systems(Update, toggle_pause)
            .add_systems(
                Update,
                (mouse_look, player_movement).run_if(in_state(Sections::Playing)),
            )
            .add_systems(OnEnter(Sections::Playing), grab_cursor)
            .add_systems(OnExit(Sections::Playing), release_cursor);
    }
}

/// Inclusive range a value is held to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub min: f32,
    pub max: f32,
}

impl Constraint {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct PlayerSettings {
    pub move_speed: f32,
    pub normalize_input: bool,
    /// Degrees of rotation per pixel of mouse motion.
    pub sensitivity: f32,
    /// Pitch limits in degrees, positive looks up.
    pub vertical: Constraint,
    pub disable_cursor: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            move_speed: 10.0,
            normalize_input: true,
            sensitivity: 0.2,
            vertical: Constraint::new(-90.0, 70.0),
            disable_cursor: true,
        }
    }
}

#[derive(Component)]
pub struct Player;

/// Tracks the player's yaw and pitch, in degrees, for composed camera rotation.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
pub struct PlayerLook {
    pub yaw: f32,
    pub pitch: f32,
}

impl PlayerLook {
    fn apply(&mut self, delta: Vec2, settings: &PlayerSettings) {
        let scaled = delta * settings.sensitivity;
        self.yaw -= scaled.x;
        self.pitch = settings.vertical.clamp(self.pitch - scaled.y);
    }

    fn rotation(self) -> Quat {
        Quat::from_rotation_y(self.yaw.to_radians()) * Quat::from_rotation_x(self.pitch.to_radians())
    }

    /// Heading only, so movement stays on the ground plane.
    fn heading(self) -> Quat {
        Quat::from_rotation_y(self.yaw.to_radians())
    }
}

const EYE_HEIGHT: f32 = 1.6;

/// Local movement direction from a WASD style input vector, `y` forward.
fn move_direction(input: Vec2, normalize: bool) -> Vec3 {
    let direction = Vec3::new(input.x, 0.0, -input.y);
    if normalize {
        direction.normalize_or_zero()
    } else {
        direction
    }
}

fn spawn_player(mut commands: Commands) {
    commands.spawn((
        Player,
        PlayerLook::default(),
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_2 * 0.8,
            near: 0.01,
            ..default()
        }),
        Bloom::NATURAL,
        Transform::from_xyz(0.0, EYE_HEIGHT, 2.0),
    ));
}

fn toggle_pause(
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    section: Res<State<Sections>>,
    mut next_section: ResMut<NextState<Sections>>,
) {
    match **section {
        Sections::Playing if keyboard.just_pressed(KeyCode::Escape) => {
            next_section.set(Sections::Paused);
        }
        Sections::Paused if mouse.just_pressed(MouseButton::Left) => {
            next_section.set(Sections::Playing);
        }
        _ => {}
    }
}

fn grab_cursor(settings: Res<PlayerSettings>, mut cursor: Query<&mut CursorOptions>) {
    if !settings.disable_cursor {
        return;
    }
    let Ok(mut cursor) = cursor.single_mut() else {
        return;
    };
    cursor.grab_mode = CursorGrabMode::Locked;
    cursor.visible = false;
}

fn release_cursor(mut cursor: Query<&mut CursorOptions>) {
    let Ok(mut cursor) = cursor.single_mut() else {
        return;
    };
    cursor.grab_mode = CursorGrabMode::None;
    cursor.visible = true;
}

fn mouse_look(
    mut motion: MessageReader<MouseMotion>,
    settings: Res<PlayerSettings>,
    mut query: Query<(&mut Transform, &mut PlayerLook), With<Player>>,
) {
    let mut delta = Vec2::ZERO;
    for ev in motion.read() {
        delta += ev.delta;
    }
    if delta == Vec2::ZERO {
        return;
    }

    let Ok((mut transform, mut look)) = query.single_mut() else {
        return;
    };
    look.apply(delta, &settings);
    transform.rotation = look.rotation();
}

fn player_movement(
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<PlayerSettings>,
    mut query: Query<(&mut Transform, &PlayerLook), With<Player>>,
    time: Res<Time>,
) {
    let Ok((mut transform, look)) = query.single_mut() else {
        return;
    };

    let mut input = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        input.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        input.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }

    let direction = look.heading() * move_direction(input, settings.normalize_input);
    transform.translation += direction * settings.move_speed * time.delta_secs();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_clamps_both_ends() {
        let constraint = Constraint::new(-90.0, 70.0);
        assert_eq!(constraint.clamp(-120.0), -90.0);
        assert_eq!(constraint.clamp(80.0), 70.0);
        assert_eq!(constraint.clamp(12.5), 12.5);
    }

    #[test]
    fn look_pitch_is_held_to_the_vertical_constraint() {
        let settings = PlayerSettings::default();
        let mut look = PlayerLook::default();

        // Mouse up is negative y in window space.
        look.apply(Vec2::new(0.0, -1000.0), &settings);
        assert_eq!(look.pitch, 70.0);

        look.apply(Vec2::new(0.0, 2000.0), &settings);
        assert_eq!(look.pitch, -90.0);
    }

    #[test]
    fn look_yaw_follows_horizontal_motion() {
        let settings = PlayerSettings::default();
        let mut look = PlayerLook::default();
        look.apply(Vec2::new(100.0, 0.0), &settings);
        assert_eq!(look.yaw, -20.0);
        assert_eq!(look.pitch, 0.0);
    }

    #[test]
    fn diagonal_input_is_normalized_when_asked() {
        let diagonal = move_direction(Vec2::new(1.0, 1.0), true);
        assert!((diagonal.length() - 1.0).abs() < 1e-6);
        assert_eq!(diagonal.y, 0.0);

        let raw = move_direction(Vec2::new(1.0, 1.0), false);
        assert_eq!(raw, Vec3::new(1.0, 0.0, -1.0));

        assert_eq!(move_direction(Vec2::ZERO, true), Vec3::ZERO);
    }

    #[test]
    fn forward_input_moves_along_heading() {
        let look = PlayerLook {
            yaw: 90.0,
            pitch: 45.0,
        };
        let world = look.heading() * move_direction(Vec2::new(0.0, 1.0), true);
        assert!((world - Vec3::NEG_X).length() < 1e-5);
    }
}
