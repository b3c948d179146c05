//! The consumed speech-provider interface.
//!
//! A provider is an external, single-utterance-at-a-time speech facility:
//! it accepts fire-and-forget control calls and reports completion, errors,
//! cancellations, and voice-catalog changes asynchronously over an event
//! channel. The narration scheduler is the only consumer of these events.

use tokio::sync::mpsc;

use crate::voice::Voice;

/// Identifier the scheduler assigns to each utterance it issues.
///
/// Events carry the id back, so completions from a cancelled or superseded
/// utterance are recognizable as stale and ignored.
pub type UtteranceId = u64;

/// One provider utterance: text plus the prosody parameters of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// Selected voice; `None` lets the provider pick its default.
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Why an utterance did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("speech synthesis is not available in this runtime")]
    Unsupported,
    /// The utterance was cut off by a cancel issued on the provider.
    /// The scheduler suppresses these: they are self-inflicted whenever a
    /// new session interrupts an old one.
    #[error("utterance interrupted: {0}")]
    Interrupted(String),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// Asynchronous notifications from the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The utterance finished playing normally.
    UtteranceEnded(UtteranceId),
    /// The utterance failed or was interrupted.
    UtteranceFailed {
        id: UtteranceId,
        error: ProviderError,
    },
    /// The utterance was cancelled before completing.
    UtteranceCancelled(UtteranceId),
    /// The provider's voice catalog changed; replaces any prior catalog.
    VoicesChanged(Vec<Voice>),
}

pub type ProviderEventSender = mpsc::UnboundedSender<ProviderEvent>;
pub type ProviderEventReceiver = mpsc::UnboundedReceiver<ProviderEvent>;

/// Channel a provider implementation reports its events on. The receiver
/// half is handed to [`Narrator::spawn`](crate::Narrator::spawn).
pub fn event_channel() -> (ProviderEventSender, ProviderEventReceiver) {
    mpsc::unbounded_channel()
}

/// Control surface of an external speech provider.
///
/// All methods are fire-and-forget; outcomes arrive as [`ProviderEvent`]s.
/// The provider allows one active utterance globally, so the scheduler
/// always issues [`cancel`](Self::cancel) before a new session's first
/// [`speak`](Self::speak).
pub trait SpeechProvider: Send + 'static {
    /// Whether speech synthesis is usable in this runtime. Checked once at
    /// scheduler start; a `false` turns every operation into a no-op.
    fn is_supported(&self) -> bool {
        true
    }

    /// Start speaking; must eventually produce an `UtteranceEnded`,
    /// `UtteranceFailed`, or `UtteranceCancelled` event for `utterance.id`
    /// unless the provider is cancelled first.
    fn speak(&mut self, utterance: Utterance);

    /// Pause mid-utterance, when the platform supports it.
    fn pause(&mut self);

    /// Resume a previously paused utterance.
    fn resume(&mut self);

    /// Drop the in-flight utterance, if any.
    fn cancel(&mut self);
}
