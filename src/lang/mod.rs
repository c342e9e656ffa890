//! Translation direction state and the language table.
//!
//! The appliance has exactly two languages ([`LangConfig`]) and two
//! directions between them.  [`DirectionSelector`] is the single writer of
//! the current [`Direction`]; every other component reads it through a
//! cheap atomic snapshot ([`DirectionHandle`]) — no locks, no ad-hoc
//! globals.
//!
//! An [`EncoderStep`](crate::input::InputEvent::EncoderStep) in either
//! rotation flips the direction: with only two languages the choice is
//! binary, so the rotation sense carries no information.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::{LangConfig, LangSpec};
use crate::input::StepDirection;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way the next session translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Language A is spoken, language B is synthesized.
    AtoB,
    /// Language B is spoken, language A is synthesized.
    BtoA,
}

impl Direction {
    /// The opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            Direction::AtoB => Direction::BtoA,
            Direction::BtoA => Direction::AtoB,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Direction::AtoB => 0,
            Direction::BtoA => 1,
        }
    }

    fn from_u8(v: u8) -> Self {
        if v == 0 {
            Direction::AtoB
        } else {
            Direction::BtoA
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::AtoB
    }
}

// ---------------------------------------------------------------------------
// DirectionHandle
// ---------------------------------------------------------------------------

/// Lock-free read access to the current direction.
///
/// Cheap to clone (`Arc` clone).  Reads never block; writes happen only
/// through [`DirectionSelector::apply`].
#[derive(Debug, Clone)]
pub struct DirectionHandle {
    inner: Arc<AtomicU8>,
}

impl DirectionHandle {
    fn new(initial: Direction) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(initial.as_u8())),
        }
    }

    /// Snapshot the current direction.
    pub fn get(&self) -> Direction {
        Direction::from_u8(self.inner.load(Ordering::Acquire))
    }
}

// ---------------------------------------------------------------------------
// DirectionSelector
// ---------------------------------------------------------------------------

/// Single writer of the current [`Direction`].
///
/// Lives on the input poller thread; consumes `EncoderStep` events.
pub struct DirectionSelector {
    handle: DirectionHandle,
}

impl DirectionSelector {
    pub fn new(initial: Direction) -> Self {
        Self {
            handle: DirectionHandle::new(initial),
        }
    }

    /// A read handle for other components.
    pub fn handle(&self) -> DirectionHandle {
        self.handle.clone()
    }

    /// Flip the direction on an encoder detent and return the new value.
    ///
    /// Rotation sense is ignored — two languages make the choice binary.
    pub fn apply(&self, _step: StepDirection) -> Direction {
        let next = self.handle.get().flipped();
        self.handle.inner.store(next.as_u8(), Ordering::Release);
        next
    }
}

// ---------------------------------------------------------------------------
// Route / LanguageTable
// ---------------------------------------------------------------------------

/// Everything the pipeline needs to know about one direction: what the
/// speaker is saying, what to produce, and which voice speaks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub src: LangSpec,
    pub tgt: LangSpec,
}

impl Route {
    /// Short `eng→ita` style header for the display.
    pub fn header(&self) -> String {
        let src: String = self.src.code.chars().take(3).collect();
        let tgt: String = self.tgt.code.chars().take(3).collect();
        format!("{src}\u{2192}{tgt}")
    }
}

/// The configured language pair, resolved per direction.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    config: LangConfig,
}

impl LanguageTable {
    pub fn new(config: LangConfig) -> Self {
        Self { config }
    }

    /// Source/target pair for one session.
    pub fn route(&self, direction: Direction) -> Route {
        match direction {
            Direction::AtoB => Route {
                src: self.config.a.clone(),
                tgt: self.config.b.clone(),
            },
            Direction::BtoA => Route {
                src: self.config.b.clone(),
                tgt: self.config.a.clone(),
            },
        }
    }

    /// `"English>Italian"` banner for the ready screen.
    pub fn banner(&self, direction: Direction) -> String {
        let r = self.route(direction);
        format!("{}>{}", r.src.name, r.tgt.name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
