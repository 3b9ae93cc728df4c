// Crystals that tumble about randomly re-rolled axes.
use bevy::prelude::*;
use rand::Rng;

use crate::prompt::{PromptHook, PromptShown};
use crate::sections::Sections;

pub struct CrystalPlugin;

impl Plugin for CrystalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CrystalRoll>()
            .add_systems(Startup, spawn_crystal)
            .add_systems(
                Update,
                (roll_crystals, spin_crystals)
                    .chain()
                    .run_if(in_state(Sections::Playing)),
            )
            .add_observer(crystal_prompt_hooks);
    }
}

/// Seconds between spin re-rolls.
const ROLL_INTERVAL: f32 = 0.2;
/// Degrees per second added or removed by each speed change.
const SPEED_STEP: f32 = 20.0;
const START_SPEED: f32 = 90.0;
const CRYSTAL_POSITION: Vec3 = Vec3::new(0.0, 1.4, -4.0);

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Crystal {
    /// Degrees per second, scaled by the spin factors.
    pub rotate_speed: f32,
    spin: Vec3,
}

impl Crystal {
    pub fn new(rotate_speed: f32, rng: &mut impl Rng) -> Self {
        let mut crystal = Self {
            rotate_speed,
            spin: Vec3::ZERO,
        };
        crystal.roll(rng);
        crystal
    }

    pub fn accelerate(&mut self) {
        self.rotate_speed += SPEED_STEP;
    }

    pub fn decelerate(&mut self) {
        self.rotate_speed -= SPEED_STEP;
    }

    /// Pick new per-axis spin factors, biased toward forward tumbling on X and Y.
    fn roll(&mut self, rng: &mut impl Rng) {
        self.spin = Vec3::new(
            rng.random_range(-0.5..1.0),
            rng.random_range(-0.5..1.0),
            rng.random_range(-0.5..0.5),
        );
    }

    /// Local X, Y, Z rotation in degrees for a frame of `dt` seconds.
    fn frame_angles(&self, dt: f32) -> Vec3 {
        self.spin * self.rotate_speed * dt
    }
}

#[derive(Resource)]
struct CrystalRoll(Timer);

impl Default for CrystalRoll {
    fn default() -> Self {
        Self(Timer::from_seconds(ROLL_INTERVAL, TimerMode::Repeating))
    }
}

fn spawn_crystal(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut rng = rand::rng();
    commands.spawn((
        Name::new("Crystal"),
        Crystal::new(START_SPEED, &mut rng),
        Mesh3d(meshes.add(Cuboid::new(0.4, 0.9, 0.4))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.55, 0.85, 1.0, 0.8),
            emissive: LinearRgba::rgb(0.4, 1.2, 2.0),
            alpha_mode: AlphaMode::Blend,
            perceptual_roughness: 0.1,
            ..default()
        })),
        Transform::from_translation(CRYSTAL_POSITION),
        PointLight {
            color: Color::srgb(0.6, 0.85, 1.0),
            intensity: 20_000.0,
            range: 8.0,
            ..default()
        },
    ));
}

fn roll_crystals(time: Res<Time>, mut roll: ResMut<CrystalRoll>, mut crystals: Query<&mut Crystal>) {
    if !roll.0.tick(time.delta()).just_finished() {
        return;
    }
    let mut rng = rand::rng();
    for mut crystal in &mut crystals {
        crystal.roll(&mut rng);
    }
}

fn spin_crystals(time: Res<Time>, mut crystals: Query<(&Crystal, &mut Transform)>) {
    let dt = time.delta_secs();
    for (crystal, mut transform) in &mut crystals {
        let angles = crystal.frame_angles(dt);
        transform.rotate_local_x(angles.x.to_radians());
        transform.rotate_local_y(angles.y.to_radians());
        transform.rotate_local_z(angles.z.to_radians());
    }
}

fn crystal_prompt_hooks(shown: On<PromptShown>, mut crystals: Query<&mut Crystal>) {
    for hook in &shown.event().hooks {
        for mut crystal in &mut crystals {
            match hook {
                PromptHook::Accelerate => crystal.accelerate(),
                PromptHook::Decelerate => crystal.decelerate(),
                _ => {}
            }
        }
    }
}
