//! Pause sizing and pre-playback duration estimation.
//!
//! The delay calculator maps a finished micro-chunk to the silence inserted
//! before the next one; the estimator runs the same arithmetic over a whole
//! chunk sequence, plus a words-per-minute speech model, to predict session
//! length without playing anything.

use std::time::Duration;

use crate::chunk::{session_chunks, tokenize, Boundary, MicroChunk, Token};
use crate::settings::PacingSettings;

/// Floor applied to composed inter-chunk delays, in milliseconds.
pub const MIN_DELAY_MS: u64 = 150;
/// Ceiling applied to composed inter-chunk delays, in milliseconds.
pub const MAX_DELAY_MS: u64 = 3500;

/// Assumed narration speed at rate multiplier 1.0.
pub const BASELINE_WPM: f64 = 140.0;

/// Scripts below this many words are classified as short.
pub const SHORT_SCRIPT_WORDS: usize = 180;

/// How long to wait after `chunk` completes, before the next dispatch.
///
/// A final chunk waits nothing (the scheduler moves straight to end
/// silence) and a breath chunk waits exactly the configured breath pause.
/// Everything else composes base + per-word + boundary extras, clamped to
/// `[MIN_DELAY_MS, MAX_DELAY_MS]` to keep malformed input from producing
/// pathological pauses.
pub fn delay_after(chunk: &MicroChunk, settings: &PacingSettings) -> Duration {
    let ms = match chunk.boundary {
        Boundary::Final => return Duration::ZERO,
        Boundary::Breath => return Duration::from_millis(settings.breath_pause_ms),
        boundary => {
            let mut ms = settings.pause_base_ms
                + chunk.word_count as u64 * settings.pause_per_word_ms;
            ms += match boundary {
                Boundary::Sentence | Boundary::Ellipsis => settings.pause_sentence_extra_ms,
                Boundary::Paragraph => settings.pause_paragraph_extra_ms,
                _ => 0,
            };
            ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS)
        }
    };
    Duration::from_millis(ms)
}

/// Predicted timing for a chunk sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationEstimate {
    /// Modeled speaking time across all non-silent chunks.
    pub speech_ms: u64,
    /// Sum of all inter-chunk delays; the final chunk contributes zero.
    pub pause_ms: u64,
    /// `speech_ms + pause_ms + end_silence_ms`, exactly.
    pub total_ms: u64,
}

/// Estimate timing for an already-built chunk sequence.
pub fn estimate_chunks(chunks: &[MicroChunk], settings: &PacingSettings) -> DurationEstimate {
    let effective_wpm = (BASELINE_WPM * settings.rate as f64).max(1.0);

    let mut speech = 0.0_f64;
    let mut pause_ms = 0_u64;
    for chunk in chunks {
        if !chunk.is_silent() {
            speech += chunk.word_count as f64 / effective_wpm * 60_000.0;
        }
        pause_ms += delay_after(chunk, settings).as_millis() as u64;
    }

    let speech_ms = speech.round() as u64;
    DurationEstimate {
        speech_ms,
        pause_ms,
        total_ms: speech_ms + pause_ms + settings.end_silence_ms,
    }
}

/// A duration estimate for a script, plus the derived facts a caller's UI
/// adapts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEstimate {
    pub total_ms: u64,
    pub speech_ms: u64,
    pub pause_ms: u64,
    /// Words of the script plus outro; intro chunks are not counted.
    pub word_count: usize,
    /// All chunks the session would play, intro included.
    pub chunk_count: usize,
    /// `word_count < SHORT_SCRIPT_WORDS`.
    pub is_short: bool,
}

/// Estimate a full session for `text` without playing anything: same
/// chunking, same delays, same intro/outro rules as playback.
pub fn estimate_script(
    text: &str,
    title: Option<&str>,
    settings: &PacingSettings,
) -> ScriptEstimate {
    let chunks = session_chunks(text, title, settings);
    let estimate = estimate_chunks(&chunks, settings);

    let word_count = tokenize(&settings.full_script(text))
        .iter()
        .filter(|t| matches!(t, Token::Word(_)))
        .count();

    ScriptEstimate {
        total_ms: estimate.total_ms,
        speech_ms: estimate.speech_ms,
        pause_ms: estimate.pause_ms,
        word_count,
        chunk_count: chunks.len(),
        is_short: word_count < SHORT_SCRIPT_WORDS,
    }
}

/// Render milliseconds as `"3m 42s"` for countdown and preview labels.
pub fn format_duration(ms: u64) -> String {
    let total_sec = (ms + 500) / 1000;
    format!("{}m {}s", total_sec / 60, total_sec % 60)
}
