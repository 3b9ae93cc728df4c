// Typewriter reveal of one prompt, advanced by frame delta.
use super::script::Prompt;

/// Receives the characters and audio cues a reveal produces.
pub trait RevealSink {
    fn push_char(&mut self, c: char);
    /// Best effort; sinks without audio ignore it.
    fn play_cue(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealSettings {
    pub char_delay_seconds: f32,
    /// Length of the `\d` pause directive.
    pub directive_pause_seconds: f32,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            char_delay_seconds: 0.05,
            directive_pause_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Glyph {
    Pause,
    Space,
    Char(char),
}

/// Split a buffer into glyphs. A backslash not followed by `d` is literal.
fn glyphs(buffer: &str) -> Vec<Glyph> {
    let mut glyphs = Vec::with_capacity(buffer.len());
    let mut chars = buffer.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'d') => {
                chars.next();
                glyphs.push(Glyph::Pause);
            }
            ' ' => glyphs.push(Glyph::Space),
            c => glyphs.push(Glyph::Char(c)),
        }
    }
    glyphs
}

/// Prompt text plus the kind's hint when requested.
pub fn compose(prompt: &Prompt, show_hint: bool) -> String {
    let mut buffer = prompt.text.clone();
    if show_hint {
        buffer.push_str(prompt.kind.hint());
    }
    buffer
}

/// A running reveal. Each glyph waits its delay, then emits.
#[derive(Debug, Clone)]
pub struct TextReveal {
    glyphs: Vec<Glyph>,
    next: usize,
    remaining: f32,
    settings: RevealSettings,
}

impl TextReveal {
    /// Returns `None` when there is nothing to reveal.
    pub fn start(prompt: &Prompt, show_hint: bool, settings: RevealSettings) -> Option<Self> {
        Self::from_buffer(&compose(prompt, show_hint), settings)
    }

    pub fn from_buffer(buffer: &str, settings: RevealSettings) -> Option<Self> {
        let glyphs = glyphs(buffer);
        let first = *glyphs.first()?;
        let mut reveal = Self {
            glyphs,
            next: 0,
            remaining: 0.0,
            settings,
        };
        reveal.remaining = reveal.delay_of(first);
        Some(reveal)
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.glyphs.len()
    }

    fn delay_of(&self, glyph: Glyph) -> f32 {
        match glyph {
            Glyph::Pause => self.settings.directive_pause_seconds,
            Glyph::Space | Glyph::Char(_) => self.settings.char_delay_seconds,
        }
    }

    /// At most one glyph completes per tick.
    pub fn tick(&mut self, dt: f32, sink: &mut impl RevealSink) {
        let Some(&glyph) = self.glyphs.get(self.next) else {
            return;
        };

        self.remaining -= dt;
        if self.remaining > 0.0 {
            return;
        }

        match glyph {
            Glyph::Pause => {}
            Glyph::Space => sink.push_char(' '),
            Glyph::Char(c) => {
                sink.play_cue();
                sink.push_char(c);
            }
        }

        self.next += 1;
        if let Some(&next) = self.glyphs.get(self.next) {
            self.remaining = self.delay_of(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::script::PromptKind;

    #[derive(Default)]
    struct Screen {
        text: String,
        cues: usize,
    }

    impl RevealSink for Screen {
        fn push_char(&mut self, c: char) {
            self.text.push(c);
        }

        fn play_cue(&mut self) {
            self.cues += 1;
        }
    }

    fn prompt(kind: PromptKind, text: &str) -> Prompt {
        Prompt {
            kind,
            text: text.to_string(),
            hint: true,
            on_show: Vec::new(),
            conditions: Vec::new(),
            delay_seconds: 0.0,
            pause_seconds: 0.0,
        }
    }

    fn run(reveal: &mut TextReveal, dt: f32, ticks: usize, screen: &mut Screen) {
        for _ in 0..ticks {
            reveal.tick(dt, screen);
        }
    }

    #[test]
    fn hint_follows_prompt_kind() {
        let continue_prompt = prompt(PromptKind::Continue, "Go on");
        assert_eq!(
            compose(&continue_prompt, true),
            "Go on\n \n[Press any button to continue]"
        );
        assert_eq!(compose(&continue_prompt, false), "Go on");

        let yes_no = prompt(PromptKind::YesNo, "Well?");
        assert_eq!(compose(&yes_no, true), "Well?\n \n[Y/N]");
    }

    #[test]
    fn pause_directive_waits_without_output() {
        let settings = RevealSettings {
            char_delay_seconds: 0.05,
            directive_pause_seconds: 1.0,
        };
        let mut reveal = TextReveal::from_buffer("Hi\\d!", settings).unwrap();
        let mut screen = Screen::default();

        run(&mut reveal, 0.05, 1, &mut screen);
        assert_eq!(screen.text, "H");
        run(&mut reveal, 0.05, 1, &mut screen);
        assert_eq!(screen.text, "Hi");

        // Most of the one second pause.
        run(&mut reveal, 0.05, 19, &mut screen);
        assert_eq!(screen.text, "Hi");
        assert!(!reveal.is_finished());

        run(&mut reveal, 0.05, 4, &mut screen);
        assert_eq!(screen.text, "Hi!");
        assert_eq!(screen.cues, 3);
        assert!(reveal.is_finished());
    }

    #[test]
    fn spaces_wait_but_play_no_cue() {
        let settings = RevealSettings {
            char_delay_seconds: 0.25,
            directive_pause_seconds: 1.0,
        };
        let mut reveal = TextReveal::from_buffer("a b", settings).unwrap();
        let mut screen = Screen::default();

        run(&mut reveal, 0.25, 2, &mut screen);
        assert_eq!(screen.text, "a ");
        assert_eq!(screen.cues, 1);

        run(&mut reveal, 0.25, 1, &mut screen);
        assert_eq!(screen.text, "a b");
        assert_eq!(screen.cues, 2);
    }

    #[test]
    fn one_glyph_per_tick_even_with_long_frames() {
        let mut reveal = TextReveal::from_buffer("abc", RevealSettings::default()).unwrap();
        let mut screen = Screen::default();

        reveal.tick(10.0, &mut screen);
        assert_eq!(screen.text, "a");
        reveal.tick(10.0, &mut screen);
        reveal.tick(10.0, &mut screen);
        assert_eq!(screen.text, "abc");
        assert!(reveal.is_finished());

        // Finished reveals stay quiet.
        reveal.tick(10.0, &mut screen);
        assert_eq!(screen.text, "abc");
    }

    #[test]
    fn lone_backslash_is_literal() {
        let settings = RevealSettings {
            char_delay_seconds: 0.25,
            directive_pause_seconds: 1.0,
        };
        let mut reveal = TextReveal::from_buffer("a\\", settings).unwrap();
        let mut screen = Screen::default();

        run(&mut reveal, 0.25, 2, &mut screen);
        assert_eq!(screen.text, "a\\");
        assert!(reveal.is_finished());

        let mut reveal = TextReveal::from_buffer("\\x", settings).unwrap();
        let mut screen = Screen::default();
        run(&mut reveal, 0.25, 2, &mut screen);
        assert_eq!(screen.text, "\\x");
    }

    #[test]
    fn empty_buffer_has_nothing_to_reveal() {
        assert!(TextReveal::from_buffer("", RevealSettings::default()).is_none());
        let empty = prompt(PromptKind::Continue, "");
        assert!(TextReveal::start(&empty, false, RevealSettings::default()).is_none());
        assert!(TextReveal::start(&empty, true, RevealSettings::default()).is_some());
    }
}
