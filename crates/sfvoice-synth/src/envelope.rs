//! Segment-table envelope shared by the volume and modulation envelopes.
//!
//! Each phase is described by an [`EnvelopeSegment`]. Per step:
//!
//! ```text
//! while counter >= count: next phase
//! value = coeff * value + incr
//! if value < min or value > max: clamp, next phase
//! else counter += 1
//! ```
//!
//! Sustain and Finished use the constant segments [`SUSTAIN_SEGMENT`] and
//! [`FINISHED_SEGMENT`]; the other five are computed per voice from its
//! generators.

/// Envelope phases, in the order they run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopePhase {
    /// Silent wait before the attack
    #[default]
    Delay,
    /// Linear rise to 1.0
    Attack,
    /// Held at peak
    Hold,
    /// Fall to the sustain level
    Decay,
    /// Held at the sustain level until note-off
    Sustain,
    /// Fall to 0.0 after note-off
    Release,
    /// Done; the voice turns off
    Finished,
}

impl EnvelopePhase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Delay => Self::Attack,
            Self::Attack => Self::Hold,
            Self::Hold => Self::Decay,
            Self::Decay => Self::Sustain,
            Self::Sustain => Self::Release,
            Self::Release | Self::Finished => Self::Finished,
        }
    }
}

/// Step rule for one envelope phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeSegment {
    /// Steps before the phase ends on its own
    pub count: u32,
    /// Multiplier applied to the current value
    pub coeff: f32,
    /// Added after the multiply
    pub incr: f32,
    /// Leaving this bound ends the phase
    pub min: f32,
    /// Leaving this bound ends the phase
    pub max: f32,
}

impl EnvelopeSegment {
    /// Creates a segment.
    pub const fn new(count: u32, coeff: f32, incr: f32, min: f32, max: f32) -> Self {
        Self {
            count,
            coeff,
            incr,
            min,
            max,
        }
    }
}

/// Sustain: holds the value indefinitely.
pub const SUSTAIN_SEGMENT: EnvelopeSegment = EnvelopeSegment::new(u32::MAX, 1.0, 0.0, -1.0, 2.0);

/// Finished: forces the value to zero indefinitely.
pub const FINISHED_SEGMENT: EnvelopeSegment = EnvelopeSegment::new(u32::MAX, 0.0, 0.0, -1.0, 1.0);

const IDLE_SEGMENT: EnvelopeSegment = EnvelopeSegment::new(0, 1.0, 0.0, -1.0, 1.0);

/// Per-voice envelope state plus its five variable segments.
///
/// # Example
///
/// ```rust
/// use sfvoice_synth::{Envelope, EnvelopePhase};
///
/// let mut env = Envelope::default();
/// env.set_delay(0);
/// env.set_attack(4);
/// env.set_hold(0);
/// env.set_decay(0, 1.0);
/// env.set_release(4);
///
/// for _ in 0..4 {
///     env.step();
/// }
/// assert_eq!(env.value(), 1.0);
///
/// env.release();
/// assert_eq!(env.phase(), EnvelopePhase::Release);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Delay, Attack, Hold, Decay, Release
    segments: [EnvelopeSegment; 5],
    phase: EnvelopePhase,
    counter: u32,
    value: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            segments: [IDLE_SEGMENT; 5],
            phase: EnvelopePhase::Delay,
            counter: 0,
            value: 0.0,
        }
    }
}

impl Envelope {
    /// Returns to the start of the delay phase at value 0.
    pub fn reset(&mut self) {
        self.phase = EnvelopePhase::Delay;
        self.counter = 0;
        self.value = 0.0;
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Overrides the current value (used by the note-off attack correction).
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    /// Steps taken in the current phase.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Jumps to `phase`, resetting the step counter.
    pub fn set_phase(&mut self, phase: EnvelopePhase) {
        self.phase = phase;
        self.counter = 0;
    }

    /// Jumps to the release phase.
    pub fn release(&mut self) {
        if self.phase < EnvelopePhase::Release {
            self.set_phase(EnvelopePhase::Release);
        }
    }

    /// Segment in effect for `phase`.
    pub fn segment(&self, phase: EnvelopePhase) -> &EnvelopeSegment {
        match phase {
            EnvelopePhase::Delay => &self.segments[0],
            EnvelopePhase::Attack => &self.segments[1],
            EnvelopePhase::Hold => &self.segments[2],
            EnvelopePhase::Decay => &self.segments[3],
            EnvelopePhase::Sustain => &SUSTAIN_SEGMENT,
            EnvelopePhase::Release => &self.segments[4],
            EnvelopePhase::Finished => &FINISHED_SEGMENT,
        }
    }

    /// Delay of `count` steps producing 0.
    pub fn set_delay(&mut self, count: u32) {
        self.segments[0] = EnvelopeSegment::new(count, 0.0, 0.0, -1.0, 1.0);
    }

    /// Linear rise to 1.0 over `count` steps.
    pub fn set_attack(&mut self, count: u32) {
        self.segments[1] = EnvelopeSegment::new(count, 1.0, step_size(count), -1.0, 1.0);
    }

    /// Hold at the current value for `count` steps.
    pub fn set_hold(&mut self, count: u32) {
        self.segments[2] = EnvelopeSegment::new(count, 1.0, 0.0, -1.0, 2.0);
    }

    /// Linear fall at a full-scale rate of `count` steps, ending at `sustain`.
    pub fn set_decay(&mut self, count: u32, sustain: f32) {
        self.segments[3] =
            EnvelopeSegment::new(count, 1.0, -step_size(count), sustain.clamp(0.0, 1.0), 2.0);
    }

    /// Linear fall at a full-scale rate of `count` steps, ending at 0.
    pub fn set_release(&mut self, count: u32) {
        self.segments[4] = EnvelopeSegment::new(count, 1.0, -step_size(count), 0.0, 1.0);
    }

    /// Advances one step.
    #[inline]
    pub fn step(&mut self) {
        let mut seg = *self.segment(self.phase);
        while self.counter >= seg.count && self.phase != EnvelopePhase::Finished {
            self.set_phase(self.phase.next());
            seg = *self.segment(self.phase);
        }

        let x = seg.coeff * self.value + seg.incr;
        if x < seg.min {
            self.value = seg.min;
            self.set_phase(self.phase.next());
        } else if x > seg.max {
            self.value = seg.max;
            self.set_phase(self.phase.next());
        } else {
            self.value = x;
            self.counter = self.counter.saturating_add(1);
        }
    }
}

#[inline]
fn step_size(count: u32) -> f32 {
    if count > 0 { 1.0 / count as f32 } else { 0.0 }
}
