// Shift and prompt progression as resumable tasks, ticked once per frame.
use bevy::prelude::*;

use super::reveal::{RevealSettings, RevealSink, TextReveal};
use super::script::{PromptHook, ShiftStore};

/// Everything the sequencer needs from the outside world.
pub trait PromptHost: RevealSink {
    fn clear_text(&mut self);
    /// Fired exactly once per prompt, when it starts revealing.
    fn show_prompt(&mut self, shift: usize, prompt: usize, hooks: &[PromptHook]);
    fn is_active(&mut self, target: &str) -> bool;
}

/// Outcome of a shift advance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftAdvance {
    Advanced,
    /// Applied once the running prompt releases.
    Deferred,
    AtLastShift,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AdvanceStep {
    RevealDelay(f32),
    PostPause(f32),
    AwaitConditions,
    AwaitReveal,
}

#[derive(Debug)]
struct AdvanceTask {
    prompt: usize,
    step: AdvanceStep,
}

#[derive(Resource, Debug)]
pub struct PromptSequencer {
    store: ShiftStore,
    settings: RevealSettings,
    current_shift: usize,
    current_prompt: usize,
    shift_finished: bool,
    advance: Option<AdvanceTask>,
    reveal: Option<TextReveal>,
    pending_shift_advances: usize,
}

impl PromptSequencer {
    pub fn new(store: ShiftStore, settings: RevealSettings) -> Self {
        Self {
            store,
            settings,
            current_shift: 0,
            current_prompt: 0,
            shift_finished: false,
            advance: None,
            reveal: None,
            pending_shift_advances: 0,
        }
    }

    pub fn current_shift(&self) -> usize {
        self.current_shift
    }

    #[cfg(any(debug_assertions, test))]
    pub fn current_prompt(&self) -> usize {
        self.current_prompt
    }

    /// Prompts in the current shift.
    #[cfg(any(debug_assertions, test))]
    pub fn prompt_count(&self) -> usize {
        self.store.prompts_of(self.current_shift).len()
    }

    pub fn is_shift_finished(&self) -> bool {
        self.shift_finished
    }

    #[cfg(any(debug_assertions, test))]
    pub fn is_advancing(&self) -> bool {
        self.advance.is_some()
    }

    #[cfg(any(debug_assertions, test))]
    pub fn is_revealing(&self) -> bool {
        self.reveal.is_some()
    }

    /// Move to the next shift. While a prompt is running the request waits for it to release.
    pub fn advance_shift(&mut self) -> ShiftAdvance {
        if self.current_shift + 1 + self.pending_shift_advances >= self.store.shift_count() {
            return ShiftAdvance::AtLastShift;
        }
        if self.advance.is_some() {
            self.pending_shift_advances += 1;
            return ShiftAdvance::Deferred;
        }
        self.apply_shift_advance();
        ShiftAdvance::Advanced
    }

    fn apply_shift_advance(&mut self) {
        if self.current_shift + 1 < self.store.shift_count() {
            self.current_shift += 1;
            self.current_prompt = 0;
            self.shift_finished = false;
            info!("advanced to shift {}", self.current_shift);
        }
    }

    /// Button presses are ignored while a prompt is running. Returns whether one started.
    pub fn on_button_pressed(&mut self, host: &mut impl PromptHost) -> bool {
        if self.advance.is_some() {
            debug!("prompt still running, ignoring button press");
            return false;
        }
        self.begin_advance(host)
    }

    fn begin_advance(&mut self, host: &mut impl PromptHost) -> bool {
        let prompts = self.store.prompts_of(self.current_shift);
        let Some(prompt) = prompts.get(self.current_prompt) else {
            return false;
        };

        debug!(
            "showing shift {} prompt {}",
            self.current_shift, self.current_prompt
        );
        let step = AdvanceStep::RevealDelay(prompt.delay_seconds);
        self.advance = Some(AdvanceTask {
            prompt: self.current_prompt,
            step,
        });
        self.start_reveal(None);
        host.clear_text();
        true
    }

    /// Replace the running reveal. The old one emits nothing further.
    fn start_reveal(&mut self, reveal: Option<TextReveal>) {
        if self.reveal.is_some() {
            debug!("cancelling unfinished reveal");
        }
        self.reveal = reveal;
    }

    pub fn tick(&mut self, dt: f32, host: &mut impl PromptHost) {
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.tick(dt, host);
            if reveal.is_finished() {
                self.reveal = None;
            }
        }
        self.tick_advance(dt, host);
    }

    fn tick_advance(&mut self, dt: f32, host: &mut impl PromptHost) {
        let Some(task) = self.advance.as_ref() else {
            return;
        };
        let index = task.prompt;
        let prompts = self.store.prompts_of(self.current_shift);
        let Some(prompt) = prompts.get(index) else {
            self.release();
            return;
        };
        let last = prompts.len() - 1;
        let count = prompts.len();

        let mut step = match task.step {
            AdvanceStep::RevealDelay(remaining) => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    AdvanceStep::RevealDelay(remaining)
                } else {
                    host.show_prompt(self.current_shift, index, &prompt.on_show);
                    let show_hint = prompt.hint && index != last;
                    self.reveal = TextReveal::start(prompt, show_hint, self.settings);
                    self.current_prompt += 1;
                    AdvanceStep::PostPause(prompt.pause_seconds)
                }
            }
            AdvanceStep::PostPause(remaining) => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    AdvanceStep::PostPause(remaining)
                } else {
                    if self.current_prompt >= count {
                        self.shift_finished = true;
                    }
                    AdvanceStep::AwaitConditions
                }
            }
            step => step,
        };

        if step == AdvanceStep::AwaitConditions
            && prompt
                .conditions
                .iter()
                .all(|condition| condition.is_complete(host.is_active(&condition.target)))
        {
            step = AdvanceStep::AwaitReveal;
        }

        if step == AdvanceStep::AwaitReveal && self.reveal.is_none() {
            self.release();
        } else if let Some(task) = self.advance.as_mut() {
            task.step = step;
        }
    }

    fn release(&mut self) {
        self.advance = None;
        while self.pending_shift_advances > 0 {
            self.pending_shift_advances -= 1;
            self.apply_shift_advance();
        }
    }
}
