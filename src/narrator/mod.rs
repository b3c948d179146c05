//! Playback scheduler for paced narration sessions.
//!
//! [`Narrator`] orchestrates one micro-chunk at a time through an external
//! [`SpeechProvider`](crate::SpeechProvider): speak a chunk, wait out its
//! computed pause, speak the next, then hold a timed end silence once the
//! final chunk completes. Pause, resume, stop, and skip are valid at any
//! point; a pause during an inter-chunk wait freezes the unserved
//! remainder so resuming never fast-forwards.
//!
//! All session run-state lives in a single driver task, one logical event
//! loop over caller commands, provider events, and timers, so chunk *i+1*
//! is never dispatched before chunk *i*'s completion and delay have been
//! observed. Callers watch progress through a cheap status snapshot.
//!
//! # Example
//!
//! ```no_run
//! use narrate_rs::{event_channel, Narrator, PacingSettings, SilentProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (events_tx, events_rx) = event_channel();
//! let provider = SilentProvider::new(events_tx);
//! let narrator = Narrator::spawn(provider, events_rx, PacingSettings::default(), None);
//!
//! let estimate = narrator.estimate_script_duration("Breathe in. Breathe out.", Some("Calm"));
//! println!("about {} of narration", narrate_rs::format_duration(estimate.total_ms));
//!
//! narrator.speak("Breathe in. Breathe out.", Some("Calm"));
//! # }
//! ```

mod driver;
mod status;

pub use status::NarrationStatus;

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use crate::pacing::{estimate_script, ScriptEstimate};
use crate::provider::{ProviderEventReceiver, SpeechProvider};
use crate::settings::PacingSettings;

use driver::Driver;

/// Invoked exactly once per session, only when the end silence expires
/// naturally, never on stop, skip, or error. Hosts typically ring their
/// closing bell here.
pub type CompletionCallback = Box<dyn FnMut() + Send>;

pub(crate) enum Command {
    Speak {
        text: String,
        title: Option<String>,
    },
    Pause,
    Resume,
    TogglePause,
    Stop,
    SkipEndSilence,
    SetSettings(PacingSettings),
}

/// Handle to a narration scheduler.
///
/// All methods are non-blocking: they enqueue a command for the driver
/// task, which owns the provider and every piece of session state. Cloning
/// the handle shares the same scheduler. Dropping the last handle stops
/// playback and shuts the driver down.
#[derive(Clone)]
pub struct Narrator {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<NarrationStatus>,
    settings: Arc<Mutex<PacingSettings>>,
}

impl Narrator {
    /// Start a scheduler around `provider`, consuming the event stream the
    /// provider reports on. Must be called inside a Tokio runtime.
    pub fn spawn<P: SpeechProvider>(
        provider: P,
        events: ProviderEventReceiver,
        settings: PacingSettings,
        on_complete: Option<CompletionCallback>,
    ) -> Self {
        let supported = provider.is_supported();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) =
            watch::channel(NarrationStatus::idle(supported, None, Vec::new()));

        let driver = Driver::new(provider, supported, settings.clone(), status_tx, on_complete);
        tokio::spawn(driver.run(command_rx, events));

        Self {
            commands: command_tx,
            status: status_rx,
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Begin a new session for `text`, displacing any session in flight.
    /// With a title, the session opens with the spoken title announcement
    /// and the three-breath intro before the script body.
    pub fn speak(&self, text: &str, title: Option<&str>) {
        self.send(Command::Speak {
            text: text.to_string(),
            title: title.map(str::to_string),
        });
    }

    /// Freeze playback: mid-utterance when the provider supports it,
    /// otherwise at the current inter-chunk or end-silence wait.
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Continue a paused session from exactly where it froze.
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn toggle_pause(&self) {
        self.send(Command::TogglePause);
    }

    /// End the session immediately. The completion callback does not fire.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Finish the session now if it is in end silence, without the
    /// completion callback.
    pub fn skip_end_silence(&self) {
        self.send(Command::SkipEndSilence);
    }

    /// Replace the pacing settings used from the next `speak` on. A
    /// session already in flight keeps the snapshot it started with.
    pub fn set_settings(&self, settings: PacingSettings) {
        let mut current = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        *current = settings.clone();
        drop(current);
        self.send(Command::SetSettings(settings));
    }

    /// Predict the full session timing for `text` without playing
    /// anything: same chunking, same pauses, same intro/outro rules.
    pub fn estimate_script_duration(&self, text: &str, title: Option<&str>) -> ScriptEstimate {
        let settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        estimate_script(text, title, &settings)
    }

    /// Current state of the scheduler.
    pub fn status(&self) -> NarrationStatus {
        self.status.borrow().clone()
    }

    /// Watch channel for status changes; end-silence countdowns arrive at
    /// a sub-second cadence.
    pub fn subscribe(&self) -> watch::Receiver<NarrationStatus> {
        self.status.clone()
    }

    fn send(&self, command: Command) {
        // A closed channel means the driver is gone; commands then match
        // the unsupported-provider no-op behavior.
        let _ = self.commands.send(command);
    }
}
