//! Display backends and line-2 scrolling.
//!
//! The target hardware is a 16x2 character module; development machines get
//! [`ConsoleDisplay`], which renders the same two lines through the logger.
//! Scrolling is pull-based: the controller ticks [`ScrollState`] on its own
//! interval and pushes each window to the display, so backends stay dumb.

use super::DisplayPort;

// ---------------------------------------------------------------------------
// ConsoleDisplay
// ---------------------------------------------------------------------------

/// Log-backed display for development without the LCD attached.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl DisplayPort for ConsoleDisplay {
    fn write(&self, line1: &str, line2: &str) {
        log::info!("display: [{line1}] [{line2}]");
    }
}

// ---------------------------------------------------------------------------
// ScrollState
// ---------------------------------------------------------------------------

/// Marquee state for one overflowing line.
///
/// Text wider than the window scrolls one character per
/// [`step`](Self::step), with a 3-space gap before it wraps around.  Text
/// that fits is returned as-is and never moves.
#[derive(Debug, Clone)]
pub struct ScrollState {
    /// Original text plus the wrap gap, as a char vector (the display is
    /// addressed in characters, not bytes).
    chars: Vec<char>,
    fits: bool,
    offset: usize,
}

const WRAP_GAP: &str = "   ";

impl ScrollState {
    pub fn new(text: &str, cols: usize) -> Self {
        let fits = text.chars().count() <= cols;
        let padded: Vec<char> = if fits {
            text.chars().collect()
        } else {
            text.chars().chain(WRAP_GAP.chars()).collect()
        };
        Self {
            chars: padded,
            fits,
            offset: 0,
        }
    }

    /// The currently visible window, `cols` characters wide.
    pub fn window(&self, cols: usize) -> String {
        if self.fits {
            return self.chars.iter().collect();
        }
        self.chars
            .iter()
            .cycle()
            .skip(self.offset)
            .take(cols)
            .collect()
    }

    /// Advance one character.  No-op when the text fits.
    pub fn step(&mut self) {
        if !self.fits {
            self.offset = (self.offset + 1) % self.chars.len();
        }
    }

    pub fn needs_scrolling(&self) -> bool {
        !self.fits
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_never_moves() {
        let mut s = ScrollState::new("ciao", 16);
        assert!(!s.needs_scrolling());
        assert_eq!(s.window(16), "ciao");
        s.step();
        assert_eq!(s.window(16), "ciao");
    }

    #[test]
    fn long_text_scrolls_one_char_per_step() {
        let mut s = ScrollState::new("hello wide world", 8);
        assert!(s.needs_scrolling());
        assert_eq!(s.window(8), "hello wi");
        s.step();
        assert_eq!(s.window(8), "ello wid");
    }

    #[test]
    fn scrolling_wraps_through_the_gap() {
        let text = "abcdef";
        let mut s = ScrollState::new(text, 4);

        // Cycle length is text + 3-space gap.
        let cycle = text.chars().count() + 3;
        for _ in 0..cycle {
            s.step();
        }
        assert_eq!(s.window(4), "abcd");
    }

    #[test]
    fn window_is_measured_in_chars_not_bytes() {
        let s = ScrollState::new("perché no", 6);
        assert_eq!(s.window(6), "perch\u{e9}");
    }
}
