//! A no-audio provider that simulates utterance timing.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::pacing::BASELINE_WPM;
use crate::provider::{ProviderEvent, ProviderEventSender, SpeechProvider, Utterance};
use crate::voice::Voice;

/// Speech provider that plays nothing and completes each utterance after
/// the time the words would take to speak, using the same words-per-minute
/// model as the duration estimator.
///
/// Lets the full pacing pipeline run headless: silent previews, demos, and
/// environments without a speech facility. Must be used inside a Tokio
/// runtime. `pause`/`resume` are accepted but a simulated utterance cannot
/// be frozen mid-flight; the scheduler tolerates a completion arriving
/// while paused.
pub struct SilentProvider {
    events: ProviderEventSender,
    current: Option<oneshot::Sender<()>>,
}

impl SilentProvider {
    pub fn new(events: ProviderEventSender) -> Self {
        Self {
            events,
            current: None,
        }
    }

    /// Report a voice catalog to the scheduler, as a platform provider
    /// would after its asynchronous voice-list load.
    pub fn announce_voices(&self, voices: Vec<Voice>) {
        let _ = self.events.send(ProviderEvent::VoicesChanged(voices));
    }

    /// A small fixed catalog for demos.
    pub fn default_catalog() -> Vec<Voice> {
        vec![
            Voice {
                id: "silent-en-f".to_string(),
                name: "Samantha".to_string(),
                language: "en-US".to_string(),
            },
            Voice {
                id: "silent-en-m".to_string(),
                name: "Daniel".to_string(),
                language: "en-GB".to_string(),
            },
        ]
    }

    fn speech_time(utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count();
        let wpm = (BASELINE_WPM * utterance.rate as f64).max(1.0);
        Duration::from_secs_f64(words as f64 / wpm * 60.0)
    }
}

impl SpeechProvider for SilentProvider {
    fn speak(&mut self, utterance: Utterance) {
        // One active utterance globally, like the platform providers.
        self.cancel();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.current = Some(cancel_tx);

        let events = self.events.clone();
        let duration = Self::speech_time(&utterance);
        let id = utterance.id;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let _ = events.send(ProviderEvent::UtteranceEnded(id));
                }
                _ = cancel_rx => {
                    let _ = events.send(ProviderEvent::UtteranceCancelled(id));
                }
            }
        });
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn cancel(&mut self) {
        if let Some(cancel) = self.current.take() {
            let _ = cancel.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SilentProvider;
    use crate::provider::{event_channel, ProviderEvent, SpeechProvider, Utterance};
    use std::time::Duration;

    fn utterance(id: u64, text: &str) -> Utterance {
        Utterance {
            id,
            text: text.to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_modeled_speech_time() {
        let (tx, mut rx) = event_channel();
        let mut provider = SilentProvider::new(tx);

        // 140 words at rate 1.0 is one minute of modeled speech.
        let text = vec!["word"; 140].join(" ");
        provider.speak(utterance(7, &text));
        settle().await;

        tokio::time::advance(Duration::from_secs(59)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), ProviderEvent::UtteranceEnded(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_cancelled_not_ended() {
        let (tx, mut rx) = event_channel();
        let mut provider = SilentProvider::new(tx);

        provider.speak(utterance(1, "a few words here"));
        settle().await;
        provider.cancel();
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), ProviderEvent::UtteranceCancelled(1));
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn new_utterance_cancels_the_one_in_flight() {
        let (tx, mut rx) = event_channel();
        let mut provider = SilentProvider::new(tx);

        provider.speak(utterance(1, "first utterance text"));
        settle().await;
        provider.speak(utterance(2, "second"));
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), ProviderEvent::UtteranceCancelled(1));
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap(), ProviderEvent::UtteranceEnded(2));
    }
}
