//! One-slot handshake inter-stage channel.
//!
//! Every stage evaluates against the channel state committed by the previous
//! tick, then records what it wants to happen (`Keep`/`Clear`/`Push`) in a
//! shadow write; [`PipeChannel::apply_tick`] commits that write atomically
//! alongside every other channel, next-cell, and scoreboard update for the
//! tick. This mirrors the fetch stage's `mem::take`-a-shadow, write-once-at-
//! the-end idiom used for the IF/ID latch.

/// A pending write recorded during a tick's evaluate phase.
enum Write<T> {
    /// No stage touched this channel's authoritative slot this tick.
    Keep,
    /// The consuming stage popped the entry and produced nothing to replace it.
    Clear,
    /// The producing stage pushed a new bundle.
    Push(T),
}

/// A single-slot channel between two pipeline stages.
pub struct PipeChannel<T> {
    slot: Option<T>,
    write: Write<T>,
    /// Set by [`PipeChannel::flush`], cleared by `apply_tick`. A stage that
    /// evaluates later in the same tick as a flush (fetch, after writeback)
    /// would otherwise see `can_accept() == true` and push a wrong-path
    /// bundle that survives the flush it should have been squashed by.
    flushed_this_tick: bool,
}

impl<T> Default for PipeChannel<T> {
    fn default() -> Self {
        Self {
            slot: None,
            write: Write::Keep,
            flushed_this_tick: false,
        }
    }
}

impl<T> PipeChannel<T> {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bundle committed at the start of this tick, if any.
    pub fn peek(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    /// True if the channel held nothing at the start of this tick — i.e. a
    /// producer may push into it and have that push observed next tick.
    pub fn can_accept(&self) -> bool {
        self.slot.is_none()
    }

    /// Records that the consuming stage took this tick's entry and produced
    /// nothing to replace it (a structural stall downstream of an empty
    /// channel, or a one-shot stage with no output this tick).
    pub fn clear(&mut self) {
        self.write = Write::Clear;
    }

    /// Records a new bundle to commit at the next `apply_tick`. A no-op if
    /// this channel was flushed earlier in the same tick — the producing
    /// stage evaluated against a pre-redirect world and has nothing valid
    /// to offer until the redirect itself commits.
    pub fn push(&mut self, value: T) {
        if self.flushed_this_tick {
            return;
        }
        self.write = Write::Push(value);
    }

    /// Commits this tick's recorded write. Idempotent if no stage wrote.
    pub fn apply_tick(&mut self) {
        match std::mem::replace(&mut self.write, Write::Keep) {
            Write::Keep => {}
            Write::Clear => self.slot = None,
            Write::Push(value) => self.slot = Some(value),
        }
        self.flushed_this_tick = false;
    }

    /// True if this tick's slot currently holds a bundle.
    pub fn has_value(&self) -> bool {
        self.slot.is_some()
    }

    /// Immediately discards the channel's contents and any pending write —
    /// used by a pipeline flush, which takes effect at the same `apply_tick`
    /// as the redirect that caused it. Also gates out any `push` still to
    /// come later this tick, since the redirect it depends on (`pc`) won't
    /// be visible until that same `apply_tick`.
    pub fn flush(&mut self) {
        self.slot = None;
        self.write = Write::Keep;
        self.flushed_this_tick = true;
    }
}
