/// Prompt script data: shifts of prompts, authored in TOML and validated once at load.
use std::str::FromStr;

use serde::Deserialize;
use strum::{EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use super::reveal::RevealSettings;

/// The shipped dialogue script.
pub const SCRIPT_SOURCE: &str = include_str!("../../assets/prompts/shifts.toml");

const DEFAULT_CHAR_DELAY: f32 = 0.05;
const DEFAULT_PAUSE: f32 = 1.0;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to parse prompt script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("prompt script has no shifts")]
    NoShifts,

    #[error("shift {shift} has no prompts")]
    EmptyShift { shift: usize },

    #[error("shift {shift} prompt {prompt}: unknown prompt kind `{value}`")]
    UnknownPromptKind {
        shift: usize,
        prompt: usize,
        value: String,
    },

    #[error("shift {shift} prompt {prompt}: unknown condition kind `{value}`")]
    UnknownConditionKind {
        shift: usize,
        prompt: usize,
        value: String,
    },

    #[error("shift {shift} prompt {prompt}: condition has an empty target")]
    EmptyConditionTarget { shift: usize, prompt: usize },

    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: String, value: f32 },
}

/// Which hint is appended after a prompt's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PromptKind {
    Continue,
    YesNo,
}

impl PromptKind {
    pub fn hint(self) -> &'static str {
        match self {
            PromptKind::Continue => "\n \n[Press any button to continue]",
            PromptKind::YesNo => "\n \n[Y/N]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConditionKind {
    IsActive,
    IsInactive,
}

/// Gate on the active state of a named entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub target: String,
}

impl Condition {
    pub fn is_complete(&self, target_active: bool) -> bool {
        match self.kind {
            ConditionKind::IsActive => target_active,
            ConditionKind::IsInactive => !target_active,
        }
    }
}

/// Side effects fired when a prompt starts showing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PromptHook {
    Show { target: String },
    Hide { target: String },
    Accelerate,
    Decelerate,
    AdvanceShift,
    /// Broadcast a named signal for level logic to pick up.
    Emit { signal: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    /// May embed `\d` for a one second pause.
    pub text: String,
    pub hint: bool,
    pub on_show: Vec<PromptHook>,
    pub conditions: Vec<Condition>,
    /// Wait before the prompt starts revealing.
    pub delay_seconds: f32,
    /// Wait after the reveal starts, before conditions are polled.
    pub pause_seconds: f32,
}

/// Ordered, non-empty run of prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    prompts: Vec<Prompt>,
}

/// Read-only store of every shift in play order.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftStore {
    shifts: Vec<Shift>,
}

impl ShiftStore {
    pub fn new(shifts: Vec<Vec<Prompt>>) -> Result<Self, ScriptError> {
        if shifts.is_empty() {
            return Err(ScriptError::NoShifts);
        }
        let shifts = shifts
            .into_iter()
            .enumerate()
            .map(|(shift, prompts)| {
                if prompts.is_empty() {
                    Err(ScriptError::EmptyShift { shift })
                } else {
                    Ok(Shift { prompts })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { shifts })
    }

    pub fn shift_count(&self) -> usize {
        self.shifts.len()
    }

    /// Prompts of a shift, empty for an index past the end.
    pub fn prompts_of(&self, shift: usize) -> &[Prompt] {
        self.shifts
            .get(shift)
            .map_or(&[], |shift| shift.prompts.as_slice())
    }
}

/// A fully validated script, ready for the sequencer.
#[derive(Debug, Clone)]
pub struct Script {
    pub shifts: ShiftStore,
    pub reveal: RevealSettings,
    /// Asset path of the per-character audio cue.
    pub cue: Option<String>,
}

impl Script {
    pub fn from_toml(source: &str) -> Result<Self, ScriptError> {
        let config: ScriptConfig = toml::from_str(source)?;
        config.validate()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    #[serde(default = "default_char_delay")]
    pub char_delay_seconds: f32,
    #[serde(default = "default_pause")]
    pub directive_pause_seconds: f32,
    #[serde(default)]
    pub cue: Option<String>,
    #[serde(default, rename = "shift")]
    pub shifts: Vec<ShiftConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftConfig {
    #[serde(default, rename = "prompt")]
    pub prompts: Vec<PromptConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub hint: bool,
    #[serde(default)]
    pub on_show: Vec<PromptHook>,
    #[serde(default, rename = "condition")]
    pub conditions: Vec<ConditionConfig>,
    #[serde(default)]
    pub delay_seconds: f32,
    #[serde(default)]
    pub pause_seconds: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionConfig {
    pub kind: String,
    pub target: String,
}

fn default_char_delay() -> f32 {
    DEFAULT_CHAR_DELAY
}

fn default_pause() -> f32 {
    DEFAULT_PAUSE
}

fn check_duration(field: impl FnOnce() -> String, value: f32) -> Result<f32, ScriptError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ScriptError::InvalidDuration {
            field: field(),
            value,
        })
    }
}

impl ScriptConfig {
    pub fn validate(self) -> Result<Script, ScriptError> {
        let reveal = RevealSettings {
            char_delay_seconds: check_duration(
                || "char_delay_seconds".to_string(),
                self.char_delay_seconds,
            )?,
            directive_pause_seconds: check_duration(
                || "directive_pause_seconds".to_string(),
                self.directive_pause_seconds,
            )?,
        };

        let shifts = self
            .shifts
            .into_iter()
            .enumerate()
            .map(|(shift, config)| {
                config
                    .prompts
                    .into_iter()
                    .enumerate()
                    .map(|(prompt, config)| config.validate(shift, prompt))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Script {
            shifts: ShiftStore::new(shifts)?,
            reveal,
            cue: self.cue,
        })
    }
}

impl PromptConfig {
    fn validate(self, shift: usize, prompt: usize) -> Result<Prompt, ScriptError> {
        let kind =
            PromptKind::from_str(&self.kind).map_err(|_| ScriptError::UnknownPromptKind {
                shift,
                prompt,
                value: self.kind.clone(),
            })?;

        let conditions = self
            .conditions
            .into_iter()
            .map(|condition| {
                let kind = ConditionKind::from_str(&condition.kind).map_err(|_| {
                    ScriptError::UnknownConditionKind {
                        shift,
                        prompt,
                        value: condition.kind.clone(),
                    }
                })?;
                if condition.target.trim().is_empty() {
                    return Err(ScriptError::EmptyConditionTarget { shift, prompt });
                }
                Ok(Condition {
                    kind,
                    target: condition.target,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Prompt {
            kind,
            text: self.text,
            hint: self.hint,
            on_show: self.on_show,
            conditions,
            delay_seconds: check_duration(
                || format!("shift {shift} prompt {prompt} delay_seconds"),
                self.delay_seconds,
            )?,
            pause_seconds: check_duration(
                || format!("shift {shift} prompt {prompt} pause_seconds"),
                self.pause_seconds,
            )?,
        })
    }
}
