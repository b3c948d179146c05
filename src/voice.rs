//! Voice catalog types and the voice selection heuristic.
//!
//! Providers report their voice catalogs asynchronously, sometimes more
//! than once; selection is therefore a pure function of the catalog and
//! the settings, re-run whenever either changes, never cached.

use serde::{Deserialize, Serialize};

use crate::settings::PacingSettings;

/// One synthetic voice as reported by the speech provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Provider-scoped stable identifier.
    pub id: String,
    /// Human-readable name, e.g. `"Samantha"`.
    pub name: String,
    /// BCP-47 language tag, e.g. `"en-US"`.
    pub language: String,
}

impl Voice {
    /// Label used in voice pickers: `"Samantha (en-US)"`.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.language)
    }
}

/// Name substrings that correlate with female-voiced synthetic voices
/// across the common provider ecosystems.
const FEMALE_PATTERNS: &[&str] = &[
    "female", "feminina", "mulher", "woman", "luciana", "maria", "ana", "julia", "camila",
    "fernanda", "google brasileiro", "microsoft maria", "samantha", "victoria", "karen", "monica",
    "paulina", "joana", "ines", "catarina",
];

fn is_likely_female(voice: &Voice) -> bool {
    let name = voice.name.to_lowercase();
    FEMALE_PATTERNS.iter().any(|p| name.contains(p))
}

/// Choose the best voice for `settings` out of `voices`.
///
/// An explicit `voice_id` present in the catalog wins unconditionally.
/// Otherwise the catalog is filtered by the language priority list, most
/// specific locale first, keeping the first non-empty match set (or the
/// whole catalog when nothing matches); within that set the female-name
/// heuristic applies when `prefer_female` is set, falling back to the
/// first candidate. Deterministic for a given catalog and settings.
pub fn select_best_voice(voices: &[Voice], settings: &PacingSettings) -> Option<Voice> {
    if voices.is_empty() {
        return None;
    }

    if let Some(id) = &settings.voice_id {
        if let Some(voice) = voices.iter().find(|v| &v.id == id) {
            return Some(voice.clone());
        }
    }

    let mut candidates: Vec<&Voice> = Vec::new();
    for lang in &settings.language_priorities {
        let lang = lang.to_lowercase();
        candidates = voices
            .iter()
            .filter(|v| v.language.to_lowercase().starts_with(&lang))
            .collect();
        if !candidates.is_empty() {
            break;
        }
    }
    if candidates.is_empty() {
        candidates = voices.iter().collect();
    }

    if settings.prefer_female {
        if let Some(voice) = candidates.iter().find(|v| is_likely_female(v)) {
            return Some((*voice).clone());
        }
    }

    candidates.first().map(|v| (*v).clone())
}
