//! Fixed-size voice pool with priority-based stealing.

extern crate alloc;

use crate::envelope::EnvelopePhase;
use crate::settings::EngineSettings;
use crate::voice::{Voice, VoiceStatus};
use alloc::vec::Vec;

/// Base priority every playing voice starts from.
const BASE_PRIORITY: f32 = 10000.0;
/// Bonus for voices on the drum channel.
const DRUM_BONUS: f32 = 4000.0;
/// Penalty for voices already in release.
const RELEASED_PENALTY: f32 = 2000.0;
/// Penalty for voices held only by the sustain pedal.
const SUSTAINED_PENALTY: f32 = 1000.0;
/// Bonus per unit of volume envelope level outside the attack.
const LEVEL_BONUS: f32 = 1000.0;

/// All voices of an engine, allocated once up front.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    next_id: u32,
    drum_channel: u8,
}

impl VoicePool {
    /// Preallocates `settings.polyphony` voices.
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            voices: (0..settings.polyphony).map(|_| Voice::new(settings)).collect(),
            next_id: 0,
            drum_channel: settings.drum_channel,
        }
    }

    /// Number of voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether the pool has no voices at all.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Number of voices currently playing.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }

    /// Read access to all voices.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Mutable access to all voices.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Voice at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Hands out the next voice id. Ids increase with every note-on.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Stealing priority of `voice`; lower is stolen first.
    ///
    /// Released and sustained voices rank below held ones, older voices
    /// below newer ones, quiet voices below loud ones, and the drum channel
    /// is protected.
    pub fn priority(&self, voice: &Voice) -> f32 {
        let mut p = BASE_PRIORITY;
        if voice.channel() == self.drum_channel {
            p += DRUM_BONUS;
        }
        if voice.is_released() {
            p -= RELEASED_PENALTY;
        } else if voice.status() == VoiceStatus::Sustained {
            p -= SUSTAINED_PENALTY;
        }
        p -= self.next_id.wrapping_sub(voice.id()) as f32;
        let env = voice.volume_envelope();
        if env.phase() != EnvelopePhase::Attack {
            p += env.value() * LEVEL_BONUS;
        }
        p
    }

    /// Index of a voice ready for a new note.
    ///
    /// Takes a free voice if there is one, otherwise turns off the playing
    /// voice with the lowest priority. Indices in `keep` are never stolen.
    /// `None` when every voice is kept or the pool is empty.
    pub fn allocate(&mut self, keep: &[usize]) -> Option<usize> {
        if let Some(i) = self.voices.iter().position(Voice::is_available) {
            return Some(i);
        }

        let (index, _priority) = self
            .voices
            .iter()
            .enumerate()
            .filter(|(i, _)| !keep.contains(i))
            .map(|(i, v)| (i, self.priority(v)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            voice = self.voices[index].id(),
            channel = self.voices[index].channel(),
            key = self.voices[index].key(),
            priority = _priority,
            "stealing voice"
        );
        self.voices[index].off();
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelState;
    use crate::voice::VoiceNote;
    use crate::zone::Sample;
    use alloc::sync::Arc;

    fn pool(polyphony: usize) -> VoicePool {
        VoicePool::new(&EngineSettings {
            polyphony,
            ..EngineSettings::default()
        })
    }

    fn play(pool: &mut VoicePool, channel: u8, key: u8) -> usize {
        let idx = pool.allocate(&[]).expect("voice");
        let id = pool.next_id();
        let sample = Arc::new(Sample::new("s", Arc::from(vec![0i16; 128]), 44100, 60));
        let v = pool.get_mut(idx).expect("index");
        v.init(
            VoiceNote {
                id,
                channel,
                key,
                velocity: 100,
                ..VoiceNote::default()
            },
            sample,
        );
        v.start(&ChannelState::new());
        idx
    }

    #[test]
    fn free_voices_first() {
        let mut p = pool(4);
        let a = play(&mut p, 0, 60);
        let b = play(&mut p, 0, 61);
        assert_ne!(a, b);
        assert_eq!(p.active_count(), 2);
    }

    #[test]
    fn steals_oldest() {
        let mut p = pool(3);
        let first = play(&mut p, 0, 60);
        play(&mut p, 0, 61);
        play(&mut p, 0, 62);
        let stolen = play(&mut p, 0, 63);
        assert_eq!(stolen, first);
        assert_eq!(p.active_count(), 3);
    }

    #[test]
    fn released_voices_go_first() {
        let mut p = pool(3);
        play(&mut p, 0, 60);
        let released = play(&mut p, 0, 61);
        play(&mut p, 0, 62);
        p.voices_mut()[released].note_off(false);
        assert_eq!(play(&mut p, 0, 63), released);
    }

    #[test]
    fn drum_channel_protected() {
        let mut p = pool(2);
        let drum = play(&mut p, 9, 36);
        let melodic = play(&mut p, 0, 60);
        assert_ne!(play(&mut p, 0, 62), drum);
        assert!(p.voices()[drum].is_playing());
        assert_eq!(p.voices()[melodic].key(), 62);
    }

    #[test]
    fn empty_pool() {
        let mut p = pool(0);
        assert!(p.is_empty());
        assert_eq!(p.allocate(&[]), None);
    }

    #[test]
    fn kept_voices_are_not_stolen() {
        let mut p = pool(2);
        let older = play(&mut p, 0, 60);
        let newer = play(&mut p, 0, 61);
        assert_eq!(p.allocate(&[older]), Some(newer));
        assert_eq!(p.allocate(&[older, newer]), None);
        assert!(p.voices()[older].is_playing());
    }
}
