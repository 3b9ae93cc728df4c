// Scripted prompts: shift dialogue revealed one character at a time in a UI text node.
mod reveal;
mod script;
mod sequencer;

use std::collections::HashSet;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::sections::Sections;
use reveal::RevealSink;
use script::{SCRIPT_SOURCE, Script};
use sequencer::{PromptHost, PromptSequencer, ShiftAdvance};

pub use script::PromptHook;

pub struct PromptPlugin {
    source: &'static str,
}

impl Default for PromptPlugin {
    fn default() -> Self {
        Self {
            source: SCRIPT_SOURCE,
        }
    }
}

impl Plugin for PromptPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ScriptSource(self.source))
            .init_resource::<MissingTargets>()
            .add_systems(Startup, (spawn_prompt_text, load_script))
            .add_systems(OnEnter(Sections::Playing), subscribe_buttons)
            .add_systems(
                Update,
                (
                    start_sequencer.run_if(resource_added::<PromptSequencer>),
                    read_buttons,
                    tick_sequencer,
                )
                    .chain()
                    .run_if(in_state(Sections::Playing).and(resource_exists::<PromptSequencer>)),
            )
            .add_observer(on_advance_shift)
            .add_observer(apply_visibility_hooks)
            .add_observer(forward_shift_hooks);

        #[cfg(debug_assertions)]
        app.add_systems(Startup, spawn_sequencer_display).add_systems(
            Update,
            (debug_advance_shift, update_sequencer_display)
                .run_if(resource_exists::<PromptSequencer>),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Continue,
    Yes,
    No,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ButtonPressed {
    pub kind: ButtonKind,
}

/// Triggered once when a prompt starts revealing.
#[derive(Event, Debug, Clone)]
pub struct PromptShown {
    pub shift: usize,
    pub prompt: usize,
    pub hooks: Vec<PromptHook>,
}

/// A named signal raised by a prompt's `emit` hook.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct PromptSignal {
    pub name: String,
}

/// Ask the sequencer to move on to the next shift.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct AdvanceShift;

#[derive(Component)]
pub struct PromptText;

#[derive(Resource)]
struct PromptCue(Handle<AudioSource>);

#[derive(Resource)]
struct ScriptSource(&'static str);

/// Condition targets already warned about.
#[derive(Resource, Default)]
struct MissingTargets(HashSet<String>);

/// The sequencer's view of the world for one system run.
#[derive(SystemParam)]
struct PromptIo<'w, 's> {
    commands: Commands<'w, 's>,
    text: Query<'w, 's, &'static mut Text, With<PromptText>>,
    targets: Query<'w, 's, (&'static Name, &'static Visibility)>,
    cue: Option<Res<'w, PromptCue>>,
    missing: ResMut<'w, MissingTargets>,
}

impl RevealSink for PromptIo<'_, '_> {
    fn push_char(&mut self, c: char) {
        for mut text in &mut self.text {
            text.0.push(c);
        }
    }

    fn play_cue(&mut self) {
        if let Some(cue) = &self.cue {
            self.commands
                .spawn((AudioPlayer::new(cue.0.clone()), PlaybackSettings::DESPAWN));
        }
    }
}

impl PromptHost for PromptIo<'_, '_> {
    fn clear_text(&mut self) {
        for mut text in &mut self.text {
            text.0.clear();
        }
    }

    fn show_prompt(&mut self, shift: usize, prompt: usize, hooks: &[PromptHook]) {
        self.commands.trigger(PromptShown {
            shift,
            prompt,
            hooks: hooks.to_vec(),
        });
    }

    /// Active means the named entity exists and is not hidden.
    fn is_active(&mut self, target: &str) -> bool {
        let visibility = self
            .targets
            .iter()
            .find_map(|(name, visibility)| (name.as_str() == target).then_some(*visibility));

        match visibility {
            Some(visibility) => visibility != Visibility::Hidden,
            None => {
                if self.missing.0.insert(target.to_string()) {
                    warn!("prompt condition target `{target}` not found, treating as inactive");
                }
                false
            }
        }
    }
}

fn spawn_prompt_text(mut commands: Commands) {
    commands.spawn((
        PromptText,
        Text::new(""),
        TextFont {
            font_size: 24.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(48.0),
            left: Val::Percent(15.0),
            right: Val::Percent(15.0),
            ..default()
        },
    ));
}

fn load_script(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    source: Res<ScriptSource>,
) -> Result {
    let script = Script::from_toml(source.0)?;
    info!(
        "loaded prompt script with {} shifts",
        script.shifts.shift_count()
    );

    if let Some(path) = script.cue {
        commands.insert_resource(PromptCue(asset_server.load(path)));
    }
    commands.insert_resource(PromptSequencer::new(script.shifts, script.reveal));
    Ok(())
}

/// The first prompt plays without waiting for a press.
fn start_sequencer(mut sequencer: ResMut<PromptSequencer>, mut io: PromptIo) {
    sequencer.on_button_pressed(&mut io);
}

/// Listen for button presses while playing. The observer goes away with the state.
fn subscribe_buttons(mut commands: Commands) {
    commands.spawn((
        Name::new("Button subscription"),
        Observer::new(on_button_pressed),
        DespawnOnExit(Sections::Playing),
    ));
}

fn on_button_pressed(
    press: On<ButtonPressed>,
    sequencer: Option<ResMut<PromptSequencer>>,
    mut io: PromptIo,
) {
    let Some(mut sequencer) = sequencer else {
        return;
    };
    debug!("{:?} button pressed", press.event().kind);
    sequencer.on_button_pressed(&mut io);
}

fn read_buttons(keyboard: Res<ButtonInput<KeyCode>>, mut commands: Commands) {
    for key in keyboard.get_just_pressed() {
        let kind = match key {
            KeyCode::Space | KeyCode::Enter | KeyCode::KeyE => ButtonKind::Continue,
            KeyCode::KeyY => ButtonKind::Yes,
            KeyCode::KeyN => ButtonKind::No,
            _ => continue,
        };
        commands.trigger(ButtonPressed { kind });
    }
}

fn tick_sequencer(time: Res<Time>, mut sequencer: ResMut<PromptSequencer>, mut io: PromptIo) {
    let was_finished = sequencer.is_shift_finished();
    sequencer.tick(time.delta_secs(), &mut io);
    if !was_finished && sequencer.is_shift_finished() {
        info!("shift {} finished", sequencer.current_shift());
    }
}

fn on_advance_shift(_trigger: On<AdvanceShift>, sequencer: Option<ResMut<PromptSequencer>>) {
    let Some(mut sequencer) = sequencer else {
        return;
    };
    match sequencer.advance_shift() {
        ShiftAdvance::Advanced => {}
        ShiftAdvance::Deferred => debug!("shift advance waits for the current prompt"),
        ShiftAdvance::AtLastShift => debug!("already on the last shift"),
    }
}

fn apply_visibility_hooks(shown: On<PromptShown>, mut targets: Query<(&Name, &mut Visibility)>) {
    for hook in &shown.event().hooks {
        let (target, visibility) = match hook {
            PromptHook::Show { target } => (target, Visibility::Inherited),
            PromptHook::Hide { target } => (target, Visibility::Hidden),
            _ => continue,
        };

        let mut found = false;
        for (name, mut current) in &mut targets {
            if name.as_str() == target {
                *current = visibility;
                found = true;
            }
        }
        if !found {
            warn!("prompt hook target `{target}` not found");
        }
    }
}

fn forward_shift_hooks(shown: On<PromptShown>, mut commands: Commands) {
    let shown = shown.event();
    debug!("shift {} prompt {} shown", shown.shift, shown.prompt);
    for hook in &shown.hooks {
        match hook {
            PromptHook::AdvanceShift => commands.trigger(AdvanceShift),
            PromptHook::Emit { signal } => commands.trigger(PromptSignal {
                name: signal.clone(),
            }),
            _ => {}
        }
    }
}

#[cfg(debug_assertions)]
#[derive(Component)]
struct SequencerDisplay;

#[cfg(debug_assertions)]
fn spawn_sequencer_display(mut commands: Commands) {
    commands.spawn((
        SequencerDisplay,
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgba(1.0, 1.0, 1.0, 0.6)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
    ));
}

#[cfg(debug_assertions)]
fn update_sequencer_display(
    sequencer: Res<PromptSequencer>,
    mut text: Query<&mut Text, With<SequencerDisplay>>,
) {
    if !sequencer.is_changed() {
        return;
    }
    let Ok(mut text) = text.single_mut() else {
        return;
    };
    **text = format!(
        "Shift {} prompt {}/{}{}{}{}",
        sequencer.current_shift(),
        sequencer.current_prompt(),
        sequencer.prompt_count(),
        if sequencer.is_advancing() { " running" } else { "" },
        if sequencer.is_revealing() { " revealing" } else { "" },
        if sequencer.is_shift_finished() { " finished" } else { "" },
    );
}

#[cfg(debug_assertions)]
fn debug_advance_shift(keyboard: Res<ButtonInput<KeyCode>>, mut commands: Commands) {
    if keyboard.just_pressed(KeyCode::PageDown) {
        commands.trigger(AdvanceShift);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::input::InputPlugin;
    use bevy::state::app::StatesPlugin;
    use bevy::time::TimeUpdateStrategy;

    use super::*;

    const TWO_PROMPTS: &str = r#"
[[shift]]

[[shift.prompt]]
kind = "continue"
text = "One."
on_show = [{ action = "hide", target = "Lamp" }, { action = "emit", signal = "first" }]

[[shift.prompt]]
kind = "continue"
text = "Two."
on_show = [{ action = "show", target = "Lamp" }]
"#;

    const GATED: &str = r#"
[[shift]]

[[shift.prompt]]
kind = "continue"
text = "Find it."

[[shift.prompt.condition]]
kind = "is_active"
target = "Ghost"

[[shift.prompt]]
kind = "continue"
text = "Found."
"#;

    #[derive(Resource, Default)]
    struct Signals(Vec<String>);

    fn app(source: &'static str) -> App {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            StatesPlugin,
            InputPlugin,
            AssetPlugin::default(),
        ))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
        .init_state::<Sections>()
        .init_resource::<Signals>()
        .add_observer(|signal: On<PromptSignal>, mut signals: ResMut<Signals>| {
            signals.0.push(signal.event().name.clone());
        })
        .add_plugins(PromptPlugin { source });
        app
    }

    fn sequencer(app: &App) -> &PromptSequencer {
        app.world().resource::<PromptSequencer>()
    }

    fn update_until_idle(app: &mut App) {
        for _ in 0..200 {
            app.update();
            if !sequencer(app).is_advancing() {
                return;
            }
        }
        panic!("prompt never released");
    }

    fn prompt_text(app: &mut App) -> String {
        let world = app.world_mut();
        let mut query = world.query_filtered::<&Text, With<PromptText>>();
        query.single(world).unwrap().0.clone()
    }

    fn set_section(app: &mut App, section: Sections) {
        app.world_mut()
            .resource_mut::<NextState<Sections>>()
            .set(section);
        app.update();
    }

    fn press(app: &mut App) {
        app.world_mut().trigger(ButtonPressed {
            kind: ButtonKind::Continue,
        });
    }

    #[test]
    fn first_prompt_starts_on_load() {
        let mut app = app(TWO_PROMPTS);
        app.update();
        assert!(sequencer(&app).is_advancing());

        update_until_idle(&mut app);
        assert_eq!(prompt_text(&mut app), "One.");
        assert_eq!(sequencer(&app).current_prompt(), 1);
        assert_eq!(app.world().resource::<Signals>().0, vec!["first".to_string()]);
    }

    #[test]
    fn presses_while_paused_are_dropped_until_playing_again() {
        let mut app = app(TWO_PROMPTS);
        app.update();
        update_until_idle(&mut app);

        set_section(&mut app, Sections::Paused);
        press(&mut app);
        assert!(!sequencer(&app).is_advancing());
        assert_eq!(sequencer(&app).current_prompt(), 1);

        set_section(&mut app, Sections::Playing);
        press(&mut app);
        assert!(sequencer(&app).is_advancing());

        update_until_idle(&mut app);
        assert_eq!(prompt_text(&mut app), "Two.");
        assert!(sequencer(&app).is_shift_finished());
    }

    #[test]
    fn hide_and_show_hooks_toggle_the_named_entity() {
        let mut app = app(TWO_PROMPTS);
        let lamp = app
            .world_mut()
            .spawn((Name::new("Lamp"), Visibility::Inherited))
            .id();

        app.update();
        update_until_idle(&mut app);
        assert_eq!(app.world().get::<Visibility>(lamp), Some(&Visibility::Hidden));

        press(&mut app);
        update_until_idle(&mut app);
        assert_eq!(
            app.world().get::<Visibility>(lamp),
            Some(&Visibility::Inherited)
        );
    }

    #[test]
    fn missing_condition_target_never_releases() {
        let mut app = app(GATED);
        for _ in 0..50 {
            app.update();
        }
        assert!(sequencer(&app).is_advancing());
        assert_eq!(prompt_text(&mut app), "Find it.");
        assert!(app.world().resource::<MissingTargets>().0.contains("Ghost"));

        // Present but hidden is still inactive.
        let ghost = app
            .world_mut()
            .spawn((Name::new("Ghost"), Visibility::Hidden))
            .id();
        for _ in 0..10 {
            app.update();
        }
        assert!(sequencer(&app).is_advancing());

        *app.world_mut().get_mut::<Visibility>(ghost).unwrap() = Visibility::Visible;
        app.update();
        assert!(!sequencer(&app).is_advancing());
        assert_eq!(sequencer(&app).current_prompt(), 1);
    }
}
