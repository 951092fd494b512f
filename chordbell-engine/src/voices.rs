//! Voice state and the fixed-capacity voice table.
//!
//! The table maps a key (`u8`, one slot per possible key byte) to at most one
//! [`Voice`]. Storage is allocated once in [`VoiceTable::new`]; inserting,
//! removing and iterating never touch the heap, so the table is safe to mutate
//! on the audio thread.

/// Number of key slots; every `u8` key has one.
pub const KEY_SLOTS: usize = 256;

/// Liveness of a voice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoiceState {
    /// Envelope is above the audibility floor (or the voice has not started yet).
    Active,
    /// Envelope fell under the floor; contributes nothing.
    Decayed,
}

/// One sustained tone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    key: u8,
    onset: u32,
    velocity: u8,
    elapsed: u64,
    release: Option<u32>,
    state: VoiceState,
}

impl Voice {
    /// Fresh voice: counter at zero, state `Active`.
    #[inline]
    pub fn new(key: u8, onset: u32, velocity: u8) -> Self {
        Self { key, onset, velocity, elapsed: 0, release: None, state: VoiceState::Active }
    }

    #[inline] pub fn key(&self) -> u8 { self.key }
    /// Block-local index at which the voice starts sounding.
    #[inline] pub fn onset(&self) -> u32 { self.onset }
    #[inline] pub fn velocity(&self) -> u8 { self.velocity }
    /// Samples rendered since onset.
    #[inline] pub fn elapsed(&self) -> u64 { self.elapsed }
    /// Block-local index at which a pending Note-Off takes effect.
    #[inline] pub fn release(&self) -> Option<u32> { self.release }
    #[inline] pub fn state(&self) -> VoiceState { self.state }
    #[inline] pub fn is_active(&self) -> bool { self.state == VoiceState::Active }

    #[inline]
    pub(crate) fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
    }

    #[inline]
    pub(crate) fn mark_active(&mut self) {
        self.state = VoiceState::Active;
    }

    #[inline]
    pub(crate) fn mark_decayed(&mut self) {
        self.state = VoiceState::Decayed;
    }

    #[inline]
    pub(crate) fn schedule_release(&mut self, at: u32) {
        self.release = Some(self.release.map_or(at, |r| r.min(at)));
    }

    /// Shift block-local times onto the next block's axis: an onset or
    /// release past the block end moves back by `frames`, one already reached
    /// stays at 0.
    #[inline]
    pub(crate) fn carry(&mut self, frames: u32) {
        self.onset = self.onset.saturating_sub(frames);
        self.release = self.release.map(|r| r.saturating_sub(frames));
    }
}

// ----------------------------------- Table ---------------------------------------

/// Key → voice map with unique keys and no ordering guarantee.
#[derive(Clone, Debug)]
pub struct VoiceTable {
    slots: Vec<Option<Voice>>,
    // occupied keys, unordered
    keys: Vec<u8>,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceTable {
    pub fn new() -> Self {
        Self { slots: vec![None; KEY_SLOTS], keys: Vec::with_capacity(KEY_SLOTS) }
    }

    #[inline] pub fn len(&self) -> usize { self.keys.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    #[inline]
    pub fn get(&self, key: u8) -> Option<&Voice> {
        self.slots[usize::from(key)].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, key: u8) -> Option<&mut Voice> {
        self.slots[usize::from(key)].as_mut()
    }

    /// Insert or overwrite; returns the voice previously stored under `voice.key()`.
    pub fn insert(&mut self, voice: Voice) -> Option<Voice> {
        let key = voice.key();
        let previous = self.slots[usize::from(key)].replace(voice);
        if previous.is_none() {
            self.keys.push(key);
        }
        previous
    }

    pub fn remove(&mut self, key: u8) -> Option<Voice> {
        let removed = self.slots[usize::from(key)].take();
        if removed.is_some() {
            if let Some(pos) = self.keys.iter().position(|&k| k == key) {
                self.keys.swap_remove(pos);
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        for &key in &self.keys {
            self.slots[usize::from(key)] = None;
        }
        self.keys.clear();
    }

    /// Visit every voice; voices for which `f` returns `false` are removed.
    pub fn retain_mut<F: FnMut(&mut Voice) -> bool>(&mut self, mut f: F) {
        let mut i = 0;
        while i < self.keys.len() {
            let key = self.keys[i];
            let keep = match self.slots[usize::from(key)].as_mut() {
                Some(voice) => f(voice),
                None => false,
            };
            if keep {
                i += 1;
            } else {
                self.slots[usize::from(key)] = None;
                self.keys.swap_remove(i);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> + '_ {
        self.keys.iter().filter_map(move |&k| self.slots[usize::from(k)].as_ref())
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Voice)) {
        self.retain_mut(|v| {
            f(v);
            true
        });
    }

    /// Voices currently in the `Active` state.
    pub fn active_count(&self) -> usize {
        self.iter().filter(|v| v.is_active()).count()
    }
}

// ------------------------------------ Tests --------------------------------------
