//! Scheduler behavior under a deterministic, paused clock.
//!
//! A recording provider stands in for the platform speech facility: the
//! tests observe every control call it receives and inject completion,
//! error, and catalog events by hand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use narrate_rs::{
    event_channel, Narrator, PacingSettings, ProviderError, ProviderEvent, ProviderEventSender,
    SpeechProvider, Utterance, Voice,
};

#[derive(Default)]
struct ProviderLog {
    utterances: Vec<Utterance>,
    pauses: usize,
    resumes: usize,
    cancels: usize,
}

#[derive(Clone, Default)]
struct RecordingProvider {
    log: Arc<Mutex<ProviderLog>>,
    unsupported: bool,
}

impl RecordingProvider {
    fn new() -> (Self, Arc<Mutex<ProviderLog>>) {
        let provider = Self::default();
        let log = provider.log.clone();
        (provider, log)
    }
}

impl SpeechProvider for RecordingProvider {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn speak(&mut self, utterance: Utterance) {
        self.log.lock().unwrap().utterances.push(utterance);
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().pauses += 1;
    }

    fn resume(&mut self) {
        self.log.lock().unwrap().resumes += 1;
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }
}

/// Let the driver task drain its queues without moving the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

fn test_settings() -> PacingSettings {
    let mut settings = PacingSettings::default();
    settings.outro_enabled = false;
    settings.end_silence_ms = 2_000;
    settings
}

/// Sizing that splits "Breathe in deeply. Let it go." into two chunks.
fn two_chunk_settings() -> PacingSettings {
    let mut settings = test_settings();
    settings.min_chunk_words = 2;
    settings.max_chunk_words = 6;
    settings
}

fn spoken_texts(log: &Arc<Mutex<ProviderLog>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .utterances
        .iter()
        .map(|u| u.text.clone())
        .collect()
}

fn last_utterance_id(log: &Arc<Mutex<ProviderLog>>) -> u64 {
    log.lock().unwrap().utterances.last().unwrap().id
}

fn utterance_count(log: &Arc<Mutex<ProviderLog>>) -> usize {
    log.lock().unwrap().utterances.len()
}

/// Counter-backed completion callback.
fn bell() -> (Box<dyn FnMut() + Send>, Arc<AtomicUsize>) {
    let rings = Arc::new(AtomicUsize::new(0));
    let counter = rings.clone();
    (
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        rings,
    )
}

struct Fixture {
    narrator: Narrator,
    log: Arc<Mutex<ProviderLog>>,
    events: ProviderEventSender,
    rings: Arc<AtomicUsize>,
}

fn fixture(settings: PacingSettings) -> Fixture {
    let (provider, log) = RecordingProvider::new();
    let (events_tx, events_rx) = event_channel();
    let (on_complete, rings) = bell();
    let narrator = Narrator::spawn(provider, events_rx, settings, Some(on_complete));
    Fixture {
        narrator,
        log,
        events: events_tx,
        rings,
    }
}

/// Complete the current utterance from the provider side.
fn end_current(f: &Fixture) {
    let id = last_utterance_id(&f.log);
    f.events.send(ProviderEvent::UtteranceEnded(id)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn speak_issues_silent_unlock_before_the_first_chunk() {
    let mut settings = PacingSettings::default();
    settings.outro_enabled = false;
    let f = fixture(settings);

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;

    let log = f.log.lock().unwrap();
    assert!(log.cancels >= 1, "prior utterances are always cancelled");
    assert_eq!(log.utterances.len(), 2);
    assert_eq!(log.utterances[0].text, "");
    assert_eq!(log.utterances[0].volume, 0.0);
    assert_eq!(log.utterances[1].text, "Breathe in. Breathe out.");
    drop(log);

    let status = f.narrator.status();
    assert!(status.is_speaking);
    assert_eq!(status.total_chunks, 1);
    assert_eq!(status.current_chunk_index, 0);
    assert!(status.estimated_duration_ms > 0);
}

#[tokio::test(start_paused = true)]
async fn single_chunk_session_runs_end_silence_and_rings_once() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    end_current(&f);
    settle().await;

    let status = f.narrator.status();
    assert!(status.is_in_end_silence);
    assert!(status.end_silence_remaining_ms <= 2_000);

    // Countdown decreases monotonically at a sub-second cadence.
    let mut last = status.end_silence_remaining_ms;
    for _ in 0..3 {
        advance(250).await;
        let remaining = f.narrator.status().end_silence_remaining_ms;
        assert!(remaining < last);
        last = remaining;
    }

    advance(2_000).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 1);
    let status = f.narrator.status();
    assert!(!status.is_speaking);
    assert!(!status.is_in_end_silence);

    // No second ring after the session is gone.
    advance(10_000).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn inter_chunk_delay_matches_the_pacing_rules() {
    let f = fixture(two_chunk_settings());

    // Two chunks of three words each; the first closes on a sentence
    // boundary: 220 base + 3 * 65 per-word + 450 sentence = 865 ms.
    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    assert_eq!(utterance_count(&f.log), 2);

    end_current(&f);
    settle().await;
    advance(800).await;
    assert_eq!(utterance_count(&f.log), 2, "delay must not be cut short");

    advance(100).await;
    assert_eq!(utterance_count(&f.log), 3);
    assert_eq!(spoken_texts(&f.log)[2], "Let it go.");
    assert_eq!(f.narrator.status().current_chunk_index, 1);
}

#[tokio::test(start_paused = true)]
async fn pause_during_a_wait_preserves_the_remaining_delay() {
    let f = fixture(two_chunk_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    end_current(&f);
    settle().await;

    // 400 ms of the 865 ms delay elapse, then the session pauses.
    advance(400).await;
    f.narrator.pause();
    settle().await;
    assert!(f.narrator.status().is_paused);
    // No utterance was mid-flight, so the provider itself is not paused.
    assert_eq!(f.log.lock().unwrap().pauses, 0);

    // Frozen: no amount of wall time dispatches the next chunk.
    advance(60_000).await;
    assert_eq!(utterance_count(&f.log), 2);

    // Resuming serves exactly the 465 ms remainder, never less.
    f.narrator.resume();
    settle().await;
    assert_eq!(f.log.lock().unwrap().resumes, 1);
    advance(460).await;
    assert_eq!(utterance_count(&f.log), 2);
    advance(10).await;
    assert_eq!(utterance_count(&f.log), 3);
}

#[tokio::test(start_paused = true)]
async fn toggle_pause_round_trips_and_reaches_the_provider() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    f.narrator.toggle_pause();
    settle().await;
    assert!(f.narrator.status().is_paused);
    // An utterance was mid-flight, so the provider pauses too.
    assert_eq!(f.log.lock().unwrap().pauses, 1);

    f.narrator.toggle_pause();
    settle().await;
    assert!(!f.narrator.status().is_paused);
    assert_eq!(f.log.lock().unwrap().resumes, 1);
}

#[tokio::test(start_paused = true)]
async fn pause_in_end_silence_freezes_the_countdown() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    end_current(&f);
    settle().await;
    advance(500).await;

    f.narrator.pause();
    settle().await;
    let frozen = f.narrator.status().end_silence_remaining_ms;
    assert!(frozen <= 1_500);

    advance(30_000).await;
    let status = f.narrator.status();
    assert!(status.is_in_end_silence);
    assert_eq!(status.end_silence_remaining_ms, frozen);
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);

    // The countdown restarts from the frozen remainder.
    f.narrator.resume();
    settle().await;
    advance(frozen - 10).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);
    advance(20).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_never_fires_the_completion_callback() {
    let f = fixture(test_settings());

    // Stop while speaking.
    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    let cancels_before = f.log.lock().unwrap().cancels;
    f.narrator.stop();
    settle().await;
    assert!(!f.narrator.status().is_speaking);
    assert!(f.log.lock().unwrap().cancels > cancels_before);

    // Stop inside end silence.
    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    end_current(&f);
    settle().await;
    assert!(f.narrator.status().is_in_end_silence);
    f.narrator.stop();
    settle().await;
    assert!(!f.narrator.status().is_speaking);

    advance(120_000).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn skip_end_silence_finishes_without_the_callback() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;

    // Not in end silence yet: skipping is a no-op.
    f.narrator.skip_end_silence();
    settle().await;
    assert!(f.narrator.status().is_speaking);

    end_current(&f);
    settle().await;
    assert!(f.narrator.status().is_in_end_silence);
    f.narrator.skip_end_silence();
    settle().await;
    assert!(!f.narrator.status().is_speaking);
    advance(60_000).await;
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn titled_session_speaks_intro_then_three_silent_breaths() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in. Breathe out.", Some("Calm"));
    settle().await;

    let status = f.narrator.status();
    assert_eq!(status.total_chunks, 6);
    assert_eq!(spoken_texts(&f.log), vec!["", "Visualization: Calm."]);

    // Title announcement ends; a breath pause precedes the instruction.
    end_current(&f);
    settle().await;
    advance(1_700).await;
    assert_eq!(spoken_texts(&f.log).last().unwrap(), "Three deep breaths.");

    // Three silent breath chunks pass without any provider utterance.
    end_current(&f);
    settle().await;
    for expected_index in 2..=4 {
        advance(1_700).await;
        assert_eq!(f.narrator.status().current_chunk_index, expected_index);
    }
    assert_eq!(utterance_count(&f.log), 3);

    // The body follows.
    advance(1_700).await;
    assert_eq!(spoken_texts(&f.log).last().unwrap(), "Breathe in. Breathe out.");
    assert_eq!(f.narrator.status().current_chunk_index, 5);
}

#[tokio::test(start_paused = true)]
async fn provider_error_aborts_the_session_silently() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    let id = last_utterance_id(&f.log);
    f.events
        .send(ProviderEvent::UtteranceFailed {
            id,
            error: ProviderError::Synthesis("voice backend died".into()),
        })
        .unwrap();
    settle().await;

    let status = f.narrator.status();
    assert!(!status.is_speaking);
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn self_inflicted_cancellations_are_suppressed() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    let current = last_utterance_id(&f.log);

    // An interruption of the current utterance and a cancellation event
    // both leave the session running.
    f.events
        .send(ProviderEvent::UtteranceFailed {
            id: current,
            error: ProviderError::Interrupted("canceled".into()),
        })
        .unwrap();
    f.events
        .send(ProviderEvent::UtteranceCancelled(current))
        .unwrap();
    settle().await;
    assert!(f.narrator.status().is_speaking);
}

#[tokio::test(start_paused = true)]
async fn stale_utterance_events_are_ignored() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;

    // The unlock utterance's id is never tracked; completing or failing it
    // moves nothing.
    let unlock_id = f.log.lock().unwrap().utterances[0].id;
    f.events
        .send(ProviderEvent::UtteranceEnded(unlock_id))
        .unwrap();
    f.events
        .send(ProviderEvent::UtteranceFailed {
            id: unlock_id,
            error: ProviderError::Synthesis("unlock failed".into()),
        })
        .unwrap();
    settle().await;

    let status = f.narrator.status();
    assert!(status.is_speaking);
    assert_eq!(status.current_chunk_index, 0);
    assert_eq!(utterance_count(&f.log), 2);
}

#[tokio::test(start_paused = true)]
async fn a_new_speak_displaces_the_session_in_flight() {
    let f = fixture(test_settings());

    f.narrator.speak("Breathe in deeply. Let it go.", None);
    settle().await;
    let old_id = last_utterance_id(&f.log);
    let cancels_before = f.log.lock().unwrap().cancels;

    f.narrator.speak("Rest now.", None);
    settle().await;
    assert!(f.log.lock().unwrap().cancels > cancels_before);
    assert_eq!(f.narrator.status().total_chunks, 1);

    // The displaced utterance's completion must not advance the new
    // session.
    f.events.send(ProviderEvent::UtteranceEnded(old_id)).unwrap();
    settle().await;
    assert_eq!(f.narrator.status().current_chunk_index, 0);
    assert_eq!(spoken_texts(&f.log).last().unwrap(), "Rest now.");
}

#[tokio::test(start_paused = true)]
async fn voice_catalog_changes_reselect_for_subsequent_utterances() {
    let f = fixture(test_settings());

    let catalog = vec![
        Voice {
            id: "m".into(),
            name: "Daniel".into(),
            language: "en-GB".into(),
        },
        Voice {
            id: "fem".into(),
            name: "Samantha".into(),
            language: "en-US".into(),
        },
    ];
    f.events
        .send(ProviderEvent::VoicesChanged(catalog))
        .unwrap();
    settle().await;

    let status = f.narrator.status();
    assert_eq!(status.voices.len(), 2);
    assert_eq!(status.selected_voice.as_ref().unwrap().id, "fem");

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    let spoken = f.log.lock().unwrap().utterances[1].clone();
    assert_eq!(spoken.voice.unwrap().id, "fem");
}

#[tokio::test(start_paused = true)]
async fn unsupported_provider_turns_every_operation_into_a_noop() {
    let (provider, log) = RecordingProvider::new();
    let provider = RecordingProvider {
        unsupported: true,
        ..provider
    };
    let (events_tx, events_rx) = event_channel();
    let (on_complete, rings) = bell();
    let narrator = Narrator::spawn(provider, events_rx, test_settings(), Some(on_complete));
    drop(events_tx);

    assert!(!narrator.status().is_supported);
    narrator.speak("Breathe in. Breathe out.", None);
    narrator.pause();
    narrator.stop();
    settle().await;

    assert_eq!(log.lock().unwrap().utterances.len(), 0);
    assert!(!narrator.status().is_speaking);
    assert_eq!(rings.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn disabled_settings_make_speak_a_noop() {
    let mut settings = test_settings();
    settings.enabled = false;
    let f = fixture(settings);

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    assert_eq!(utterance_count(&f.log), 0);
    assert!(!f.narrator.status().is_speaking);
}

#[tokio::test(start_paused = true)]
async fn zero_end_silence_finishes_without_the_callback() {
    let mut settings = test_settings();
    settings.end_silence_ms = 0;
    let f = fixture(settings);

    f.narrator.speak("Breathe in. Breathe out.", None);
    settle().await;
    end_current(&f);
    settle().await;

    assert!(!f.narrator.status().is_speaking);
    assert_eq!(f.rings.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_script_without_title_stays_idle() {
    let f = fixture(test_settings());

    f.narrator.speak("   \n\n  ", None);
    settle().await;

    let status = f.narrator.status();
    assert!(!status.is_speaking);
    // Only the unlock utterance went out.
    assert_eq!(utterance_count(&f.log), 1);
    assert_eq!(spoken_texts(&f.log), vec![""]);
}
