//! Read-only snapshot of a narration session.

use crate::voice::Voice;

/// What a UI needs to render playback controls, published on every state
/// change and at a sub-second cadence during end silence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NarrationStatus {
    /// False when the runtime has no usable speech facility; every
    /// operation is then a no-op.
    pub is_supported: bool,
    /// A session is active (speaking, waiting between chunks, or in end
    /// silence).
    pub is_speaking: bool,
    pub is_paused: bool,
    pub is_in_end_silence: bool,
    /// Live countdown during end silence, zero otherwise.
    pub end_silence_remaining_ms: u64,
    pub current_chunk_index: usize,
    pub total_chunks: usize,
    /// The pre-playback estimate for the active session, zero when idle.
    pub estimated_duration_ms: u64,
    pub selected_voice: Option<Voice>,
    /// Most recent catalog the provider reported.
    pub voices: Vec<Voice>,
}

impl NarrationStatus {
    pub(crate) fn idle(supported: bool, selected_voice: Option<Voice>, voices: Vec<Voice>) -> Self {
        Self {
            is_supported: supported,
            selected_voice,
            voices,
            ..Self::default()
        }
    }
}
