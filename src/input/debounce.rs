//! Software debouncing and press classification.
//!
//! A mechanical switch bounces: the raw line flaps for a few milliseconds
//! around every genuine transition.  [`Debouncer`] accepts a state change
//! only after `K` consecutive identical raw readings, so bounce shorter
//! than `K` ticks can never produce a spurious event.
//!
//! Encoder detents are independent of button debouncing: quadrature
//! quarter-steps accumulate and one [`InputEvent::EncoderStep`] is emitted
//! per full detent crossed.

use std::time::{Duration, Instant};

use crate::config::InputConfig;

use super::{Button, InputEvent, RawInputSample, StepDirection};

// ---------------------------------------------------------------------------
// LevelFilter
// ---------------------------------------------------------------------------

/// K-consecutive-sample filter for one button line.
#[derive(Debug)]
struct LevelFilter {
    k: u32,
    stable: bool,
    candidate: bool,
    run: u32,
}

impl LevelFilter {
    fn new(k: u32) -> Self {
        Self {
            k: k.max(1),
            stable: false,
            candidate: false,
            run: 0,
        }
    }

    /// Feed one raw reading.  Returns `Some(new_state)` on a debounced edge.
    fn update(&mut self, raw: bool) -> Option<bool> {
        if raw == self.candidate {
            self.run = self.run.saturating_add(1);
        } else {
            self.candidate = raw;
            self.run = 1;
        }

        if self.run >= self.k && self.candidate != self.stable {
            self.stable = self.candidate;
            return Some(self.stable);
        }
        None
    }

    fn is_pressed(&self) -> bool {
        self.stable
    }
}

// ---------------------------------------------------------------------------
// ButtonChannel
// ---------------------------------------------------------------------------

/// Filter plus press timer for one button.
#[derive(Debug)]
struct ButtonChannel {
    filter: LevelFilter,
    pressed_at: Option<Instant>,
    long_fired: bool,
}

impl ButtonChannel {
    fn new(k: u32) -> Self {
        Self {
            filter: LevelFilter::new(k),
            pressed_at: None,
            long_fired: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Turns raw input samples into debounced [`InputEvent`]s.
///
/// Call [`poll`](Self::poll) once per tick.  The call does no I/O and never
/// blocks; a single tick can yield several events (e.g. a release edge on
/// one button and an encoder detent in the same sample).
pub struct Debouncer {
    a: ButtonChannel,
    b: ButtonChannel,
    long_press: Duration,
    detent_steps: i16,
    encoder_accum: i16,
}

impl Debouncer {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            a: ButtonChannel::new(config.debounce_ticks),
            b: ButtonChannel::new(config.debounce_ticks),
            long_press: Duration::from_millis(config.long_press_ms),
            detent_steps: config.encoder_detent_steps.max(1),
            encoder_accum: 0,
        }
    }

    /// Process one raw sample and emit zero or more events.
    pub fn poll(&mut self, sample: RawInputSample) -> Vec<InputEvent> {
        let mut events = Vec::new();

        Self::poll_button(&mut self.a, Button::A, sample.button_a, sample.at, self.long_press, &mut events);
        Self::poll_button(&mut self.b, Button::B, sample.button_b, sample.at, self.long_press, &mut events);

        self.encoder_accum = self.encoder_accum.saturating_add(sample.encoder_delta as i16);
        while self.encoder_accum >= self.detent_steps {
            self.encoder_accum -= self.detent_steps;
            events.push(InputEvent::EncoderStep(StepDirection::Cw));
        }
        while self.encoder_accum <= -self.detent_steps {
            self.encoder_accum += self.detent_steps;
            events.push(InputEvent::EncoderStep(StepDirection::Ccw));
        }

        events
    }

    fn poll_button(
        ch: &mut ButtonChannel,
        which: Button,
        raw: bool,
        at: Instant,
        long_press: Duration,
        events: &mut Vec<InputEvent>,
    ) {
        match ch.filter.update(raw) {
            Some(true) => {
                ch.pressed_at = Some(at);
                ch.long_fired = false;
                events.push(InputEvent::ShortPress(which));
            }
            Some(false) => {
                ch.pressed_at = None;
                events.push(InputEvent::Release(which));
            }
            None => {
                // Long-press fires at threshold crossing, not at release.
                if let Some(t0) = ch.pressed_at {
                    if ch.filter.is_pressed()
                        && !ch.long_fired
                        && at.duration_since(t0) >= long_press
                    {
                        ch.long_fired = true;
                        events.push(InputEvent::LongPress(which));
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InputConfig {
        InputConfig {
            poll_interval_ms: 10,
            debounce_ticks: 5,
            long_press_ms: 2_000,
            encoder_detent_steps: 4,
            ..InputConfig::default()
        }
    }

    fn sample(a: bool, at: Instant) -> RawInputSample {
        RawInputSample {
            button_a: a,
            button_b: false,
            encoder_delta: 0,
            at,
        }
    }

    fn encoder_sample(delta: i8, at: Instant) -> RawInputSample {
        RawInputSample {
            button_a: false,
            button_b: false,
            encoder_delta: delta,
            at,
        }
    }

    /// Feed `ticks` identical samples starting at `base`, 10 ms apart.
    fn feed(d: &mut Debouncer, a: bool, ticks: u32, base: Instant, start_tick: u32) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for i in 0..ticks {
            let at = base + Duration::from_millis(((start_tick + i) * 10) as u64);
            events.extend(d.poll(sample(a, at)));
        }
        events
    }

    // ---- Debounce -------------------------------------------------------

    #[test]
    fn clean_press_emits_exactly_one_short_press() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        let events = feed(&mut d, true, 5, base, 0);
        assert_eq!(events, vec![InputEvent::ShortPress(Button::A)]);

        // Staying pressed emits nothing further (below the long threshold).
        let events = feed(&mut d, true, 10, base, 5);
        assert!(events.is_empty());
    }

    #[test]
    fn bounce_shorter_than_k_ticks_is_filtered() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        // Rapid alternation never reaches 5 consecutive identical readings.
        let mut events = Vec::new();
        for i in 0..40u32 {
            let at = base + Duration::from_millis((i * 10) as u64);
            events.extend(d.poll(sample(i % 2 == 0, at)));
        }
        assert!(events.is_empty(), "bounce produced events: {events:?}");
    }

    #[test]
    fn bouncy_edge_then_stable_press_is_one_transition() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        // 4 ticks of bounce followed by a solid press.
        let pattern = [true, false, true, false, true, true, true, true, true, true];
        let mut events = Vec::new();
        for (i, &raw) in pattern.iter().enumerate() {
            let at = base + Duration::from_millis((i * 10) as u64);
            events.extend(d.poll(sample(raw, at)));
        }
        assert_eq!(events, vec![InputEvent::ShortPress(Button::A)]);
    }

    #[test]
    fn release_after_press_emits_release() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        let mut events = feed(&mut d, true, 5, base, 0);
        events.extend(feed(&mut d, false, 5, base, 5));

        assert_eq!(
            events,
            vec![
                InputEvent::ShortPress(Button::A),
                InputEvent::Release(Button::A)
            ]
        );
    }

    // ---- Long press -----------------------------------------------------

    #[test]
    fn long_hold_fires_long_press_at_threshold_not_release() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        // Debounced press after 5 ticks (50 ms).
        let events = feed(&mut d, true, 5, base, 0);
        assert_eq!(events, vec![InputEvent::ShortPress(Button::A)]);

        // Still held at threshold + one tick: LongPress fires while held.
        let at = base + Duration::from_millis(40 + 2_000);
        let events = d.poll(sample(true, at));
        assert_eq!(events, vec![InputEvent::LongPress(Button::A)]);

        // Holding further does not repeat it.
        let at = base + Duration::from_millis(40 + 3_000);
        assert!(d.poll(sample(true, at)).is_empty());

        // Release afterwards emits only Release.
        let events = feed(&mut d, false, 5, base + Duration::from_secs(4), 0);
        assert_eq!(events, vec![InputEvent::Release(Button::A)]);
    }

    #[test]
    fn short_hold_never_fires_long_press() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        let mut events = feed(&mut d, true, 5, base, 0);
        // Held for 1 s total, then released — well under the 2 s threshold.
        events.extend(feed(&mut d, true, 95, base, 5));
        events.extend(feed(&mut d, false, 5, base, 100));

        assert_eq!(
            events,
            vec![
                InputEvent::ShortPress(Button::A),
                InputEvent::Release(Button::A)
            ]
        );
    }

    #[test]
    fn buttons_are_tracked_independently() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        let mut events = Vec::new();
        for i in 0..5u32 {
            let at = base + Duration::from_millis((i * 10) as u64);
            events.extend(d.poll(RawInputSample {
                button_a: true,
                button_b: true,
                encoder_delta: 0,
                at,
            }));
        }

        assert_eq!(
            events,
            vec![
                InputEvent::ShortPress(Button::A),
                InputEvent::ShortPress(Button::B)
            ]
        );
    }

    // ---- Encoder --------------------------------------------------------

    #[test]
    fn full_detent_emits_one_step() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        // 3 quarter-steps: nothing yet.
        assert!(d.poll(encoder_sample(3, base)).is_empty());
        // 4th quarter-step completes the detent.
        assert_eq!(
            d.poll(encoder_sample(1, base)),
            vec![InputEvent::EncoderStep(StepDirection::Cw)]
        );
    }

    #[test]
    fn reverse_rotation_emits_ccw() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        assert_eq!(
            d.poll(encoder_sample(-4, base)),
            vec![InputEvent::EncoderStep(StepDirection::Ccw)]
        );
    }

    #[test]
    fn fast_spin_emits_multiple_steps_in_one_tick() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        let events = d.poll(encoder_sample(9, base));
        assert_eq!(
            events,
            vec![
                InputEvent::EncoderStep(StepDirection::Cw),
                InputEvent::EncoderStep(StepDirection::Cw)
            ]
        );
        // One quarter-step remains accumulated.
        assert_eq!(
            d.poll(encoder_sample(3, base)),
            vec![InputEvent::EncoderStep(StepDirection::Cw)]
        );
    }

    #[test]
    fn encoder_is_independent_of_button_bounce() {
        let mut d = Debouncer::new(&config());
        let base = Instant::now();

        // Button bouncing in the same sample as a full detent.
        let events = d.poll(RawInputSample {
            button_a: true,
            button_b: false,
            encoder_delta: 4,
            at: base,
        });
        assert_eq!(events, vec![InputEvent::EncoderStep(StepDirection::Cw)]);
    }
}
