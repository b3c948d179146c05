//! # narrate-rs
//!
//! Naturally paced spoken narration for guided meditation scripts, built
//! on top of text-to-speech providers that only offer an "utterance in /
//! done event out" primitive.
//!
//! The provider primitive has no notion of variable inter-phrase pausing,
//! breath pauses, or a silent coda, so this crate supplies the pacing
//! layer: it segments free-form script text into short speakable
//! micro-chunks, sizes a pause for each one from its word count and the
//! boundary that follows it, and drives the provider through a full
//! session (intro, body, outro, then a timed end silence) with
//! pause/resume/stop/skip available throughout.
//!
//! ## Features
//!
//! - **Micro-chunking**: sentence-, ellipsis-, and paragraph-aware
//!   segmentation with configurable word bounds
//! - **Pacing**: per-chunk pauses composed from base, per-word, and
//!   boundary weights, plus fixed breath pauses
//! - **Duration estimates**: full-session timing before playback starts
//! - **Voice selection**: deterministic choice over an asynchronously
//!   loaded catalog, honoring language priorities and an explicit override
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! narrate-rs = "0.1"
//! ```
//!
//! ```no_run
//! use narrate_rs::{event_channel, Narrator, PacingSettings, SilentProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (events_tx, events_rx) = event_channel();
//! let provider = SilentProvider::new(events_tx);
//!
//! let narrator = Narrator::spawn(
//!     provider,
//!     events_rx,
//!     PacingSettings::default(),
//!     Some(Box::new(|| println!("*bell*"))),
//! );
//!
//! narrator.speak("Breathe in… and let the breath go.", Some("Calm"));
//! # }
//! ```
//!
//! Real deployments implement [`SpeechProvider`] over their platform's
//! speech facility and report outcomes on the [`event_channel`].

pub mod chunk;
pub mod narrator;
pub mod pacing;
pub mod provider;
pub mod providers;
pub mod settings;
pub mod voice;

pub use chunk::{Boundary, MicroChunk};
pub use narrator::{CompletionCallback, NarrationStatus, Narrator};
pub use pacing::{estimate_script, format_duration, DurationEstimate, ScriptEstimate};
pub use provider::{
    event_channel, ProviderError, ProviderEvent, ProviderEventReceiver, ProviderEventSender,
    SpeechProvider, Utterance, UtteranceId,
};
pub use providers::SilentProvider;
pub use settings::{PacingSettings, PacingSettingsBuilder, DEFAULT_OUTRO_TEXT};
pub use voice::{select_best_voice, Voice};
