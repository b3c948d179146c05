//! Pacing settings supplied by the host application's settings source.
//!
//! A [`PacingSettings`] value is immutable for the lifetime of one
//! narration session: the scheduler snapshots it when `speak` is accepted,
//! so later changes only affect the next session.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Closing passage appended to the script when `outro_enabled` is set.
///
/// Paced like any other script text: ellipses produce lingering pauses and
/// blank lines produce paragraph pauses.
pub const DEFAULT_OUTRO_TEXT: &str = "Now… rest in silence… and simply feel…\n\n\
If thoughts arise… let them pass…\n\n\
When you are ready… bring your attention back to the body…\n\n\
feeling your feet… your hands… and your breath…\n\n\
And return slowly… opening your eyes in your own time.";

/// Everything that shapes one narration session.
///
/// Deserializes with per-field fallback to the documented defaults, so a
/// partial settings document from the host is always usable:
///
/// ```
/// use narrate_rs::PacingSettings;
///
/// let settings = PacingSettings::from_json(r#"{ "rate": 0.8, "end_silence_ms": 10000 }"#)?;
/// assert_eq!(settings.end_silence_ms, 10_000);
/// assert_eq!(settings.pause_base_ms, 220);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
#[builder(default)]
pub struct PacingSettings {
    /// Master switch; a disabled engine treats `speak` as a no-op.
    pub enabled: bool,

    /// Speech rate multiplier passed to the provider (1.0 = provider default).
    /// Also scales the words-per-minute model used for duration estimates.
    pub rate: f32,
    /// Pitch multiplier passed to the provider.
    pub pitch: f32,
    /// Volume multiplier passed to the provider.
    pub volume: f32,

    /// Prefer a female-sounding voice when no explicit voice is set.
    pub prefer_female: bool,
    /// Explicit voice identifier; when present in the catalog it wins
    /// unconditionally over every heuristic.
    pub voice_id: Option<String>,
    /// Locale filters tried most-specific first (e.g. `en-US`, then `en`);
    /// the first non-empty match set is kept, else the whole catalog.
    pub language_priorities: Vec<String>,

    /// Flat pause inserted after every spoken chunk, in milliseconds.
    pub pause_base_ms: u64,
    /// Additional pause per word of the finished chunk.
    pub pause_per_word_ms: u64,
    /// Extra pause after a sentence or ellipsis boundary.
    pub pause_sentence_extra_ms: u64,
    /// Extra pause after a paragraph boundary.
    pub pause_paragraph_extra_ms: u64,
    /// Fixed duration of one breath pause.
    pub breath_pause_ms: u64,

    /// Minimum words before a sentence boundary may close a chunk.
    /// Must be below `max_chunk_words`.
    pub min_chunk_words: usize,
    /// Hard cap on words per chunk.
    pub max_chunk_words: usize,

    /// Silent coda after the last spoken chunk, in milliseconds.
    pub end_silence_ms: u64,

    /// Append `outro_text` to the script before chunking.
    pub outro_enabled: bool,
    /// Closing passage spoken immediately before the end silence.
    pub outro_text: String,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.62,
            pitch: 1.0,
            volume: 1.0,
            prefer_female: true,
            voice_id: None,
            language_priorities: vec![
                "en-US".to_string(),
                "en-GB".to_string(),
                "en".to_string(),
            ],
            pause_base_ms: 220,
            pause_per_word_ms: 65,
            pause_sentence_extra_ms: 450,
            pause_paragraph_extra_ms: 900,
            breath_pause_ms: 1700,
            min_chunk_words: 8,
            max_chunk_words: 14,
            end_silence_ms: 30_000,
            outro_enabled: true,
            outro_text: DEFAULT_OUTRO_TEXT.to_string(),
        }
    }
}

impl PacingSettings {
    /// Parse a settings document, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The script text a session will actually narrate: the caller's text
    /// plus the outro, separated by a paragraph break, when enabled.
    pub(crate) fn full_script(&self, text: &str) -> String {
        if self.outro_enabled && !self.outro_text.is_empty() {
            format!("{}\n\n{}", text, self.outro_text)
        } else {
            text.to_string()
        }
    }
}
