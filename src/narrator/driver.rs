//! The scheduler's driver task: session run-state and its transitions.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::chunk::{session_chunks, Boundary, MicroChunk};
use crate::pacing::{delay_after, estimate_chunks, format_duration};
use crate::provider::{
    ProviderError, ProviderEvent, ProviderEventReceiver, SpeechProvider, Utterance, UtteranceId,
};
use crate::settings::PacingSettings;
use crate::voice::{select_best_voice, Voice};

use super::status::NarrationStatus;
use super::{Command, CompletionCallback};

/// Countdown refresh cadence during end silence.
const END_SILENCE_TICK: Duration = Duration::from_millis(250);

/// Where the session currently is between provider events and timers.
///
/// The deadline (or its frozen remainder while paused) is the single
/// source of truth for elapsed/remaining time: pausing converts a deadline
/// into a remainder, resuming converts it back, and nothing else measures
/// time in these phases.
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// An utterance is with the provider.
    Speaking,
    /// Between chunks: dispatch `next_index` once `deadline` passes.
    Waiting { next_index: usize, deadline: Instant },
    /// A pause landed during the inter-chunk wait; the unserved remainder
    /// is frozen so resuming never fast-forwards.
    WaitingPaused { next_index: usize, remaining: Duration },
    /// Silent coda counting down to natural completion.
    EndSilence { deadline: Instant },
    EndSilencePaused { remaining: Duration },
}

/// Run-state of one playback session. Owned exclusively by the driver;
/// created by `speak`, discarded on stop/finish/error, never reused.
struct Session {
    chunks: Vec<MicroChunk>,
    /// Settings snapshot taken when the session started.
    settings: PacingSettings,
    index: usize,
    paused: bool,
    phase: Phase,
    current_utterance: Option<UtteranceId>,
    estimated_total_ms: u64,
}

pub(super) struct Driver<P: SpeechProvider> {
    provider: P,
    supported: bool,
    /// Settings for the next session; an active session keeps its own copy.
    settings: PacingSettings,
    voices: Vec<Voice>,
    selected: Option<Voice>,
    status_tx: watch::Sender<NarrationStatus>,
    on_complete: Option<CompletionCallback>,
    session: Option<Session>,
    next_utterance: UtteranceId,
}

impl<P: SpeechProvider> Driver<P> {
    pub(super) fn new(
        provider: P,
        supported: bool,
        settings: PacingSettings,
        status_tx: watch::Sender<NarrationStatus>,
        on_complete: Option<CompletionCallback>,
    ) -> Self {
        if !supported {
            log::warn!("speech synthesis unavailable; narration commands will be ignored");
        }
        Self {
            provider,
            supported,
            settings,
            voices: Vec::new(),
            selected: None,
            status_tx,
            on_complete,
            session: None,
            next_utterance: 0,
        }
    }

    /// One logical event loop: commands, provider events, and the phase
    /// timer all land here, so at most one next step is ever pending.
    pub(super) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: ProviderEventReceiver,
    ) {
        let mut events_open = true;
        loop {
            let deadline = self.next_deadline();
            let timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Handle dropped: shut the session down and exit.
                    None => break,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        log::warn!("speech provider event channel closed");
                        events_open = false;
                        self.provider.cancel();
                        self.finish_session(false);
                    }
                },
                _ = timer => self.handle_timer(),
            }
        }
        self.provider.cancel();
    }

    fn next_deadline(&self) -> Option<Instant> {
        match self.session.as_ref()?.phase {
            Phase::Waiting { deadline, .. } => Some(deadline),
            Phase::EndSilence { deadline } => Some(deadline.min(Instant::now() + END_SILENCE_TICK)),
            _ => None,
        }
    }

    fn handle_command(&mut self, command: Command) {
        if !self.supported {
            return;
        }
        match command {
            Command::Speak { text, title } => self.start_session(&text, title.as_deref()),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::TogglePause => {
                if self.session.as_ref().is_some_and(|s| s.paused) {
                    self.resume();
                } else {
                    self.pause();
                }
            }
            Command::Stop => {
                self.provider.cancel();
                self.finish_session(false);
            }
            Command::SkipEndSilence => self.skip_end_silence(),
            Command::SetSettings(settings) => {
                self.settings = settings;
                self.reselect_voice();
                self.publish();
            }
        }
    }

    fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::VoicesChanged(voices) => {
                log::debug!("voice catalog changed: {} voices", voices.len());
                self.voices = voices;
                self.reselect_voice();
                self.publish();
            }
            ProviderEvent::UtteranceEnded(id) => {
                if self.is_current(id) {
                    self.utterance_finished();
                } else {
                    log::debug!("ignoring completion of stale utterance {id}");
                }
            }
            // Cancellations are always self-inflicted (a new speak or a
            // stop displaced the utterance) and never abort anything.
            ProviderEvent::UtteranceCancelled(id) => {
                log::debug!("utterance {id} cancelled");
            }
            ProviderEvent::UtteranceFailed { id, error } => {
                if !self.is_current(id) || matches!(error, ProviderError::Interrupted(_)) {
                    log::debug!("suppressing non-fatal utterance failure: {error}");
                    return;
                }
                log::warn!("narration aborted by provider error: {error}");
                self.finish_session(false);
            }
        }
    }

    fn handle_timer(&mut self) {
        let Some(session) = &self.session else { return };
        let now = Instant::now();
        match session.phase {
            Phase::Waiting {
                next_index,
                deadline,
            } if now >= deadline => self.dispatch(next_index),
            Phase::EndSilence { deadline } if now >= deadline => self.finish_session(true),
            // Countdown tick: republish the remaining time.
            Phase::EndSilence { .. } => self.publish(),
            _ => {}
        }
    }

    fn start_session(&mut self, text: &str, title: Option<&str>) {
        if !self.settings.enabled {
            return;
        }

        // The provider allows one active utterance globally: a new session
        // always displaces whatever came before it.
        self.provider.cancel();
        self.session = None;

        // Audio-unlock workaround for mobile platforms that gate audio on
        // an utterance issued within the triggering user gesture. Zero
        // volume, untracked id, no timing or estimate effect.
        let unlock_id = self.alloc_utterance_id();
        self.provider.speak(Utterance {
            id: unlock_id,
            text: String::new(),
            voice: None,
            rate: self.settings.rate,
            pitch: self.settings.pitch,
            volume: 0.0,
        });

        let settings = self.settings.clone();
        let chunks = session_chunks(text, title, &settings);
        if chunks.is_empty() {
            self.publish();
            return;
        }

        let estimate = estimate_chunks(&chunks, &settings);
        log::info!(
            "starting narration: {} chunks, about {}",
            chunks.len(),
            format_duration(estimate.total_ms)
        );

        self.session = Some(Session {
            chunks,
            settings,
            index: 0,
            paused: false,
            phase: Phase::Speaking,
            current_utterance: None,
            estimated_total_ms: estimate.total_ms,
        });
        self.dispatch(0);
    }

    /// Hand chunk `index` to the provider, or wait out a silent chunk, or
    /// enter end silence when the sequence is exhausted. Idempotent against
    /// the paused flag and an already-discarded session.
    fn dispatch(&mut self, index: usize) {
        let Some(session) = &self.session else { return };
        if session.paused {
            return;
        }
        if index >= session.chunks.len() {
            self.begin_end_silence();
            return;
        }

        let chunk = session.chunks[index].clone();
        let delay = delay_after(&chunk, &session.settings);
        let (rate, pitch, volume) = (
            session.settings.rate,
            session.settings.pitch,
            session.settings.volume,
        );

        if chunk.is_silent() {
            if let Some(session) = self.session.as_mut() {
                session.index = index;
                session.phase = Phase::Waiting {
                    next_index: index + 1,
                    deadline: Instant::now() + delay,
                };
            }
        } else {
            let id = self.alloc_utterance_id();
            log::debug!("dispatching chunk {index} as utterance {id}");
            self.provider.speak(Utterance {
                id,
                text: chunk.text,
                voice: self.selected.clone(),
                rate,
                pitch,
                volume,
            });
            if let Some(session) = self.session.as_mut() {
                session.index = index;
                session.current_utterance = Some(id);
                session.phase = Phase::Speaking;
            }
        }
        self.publish();
    }

    /// The current utterance completed normally.
    fn utterance_finished(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        session.current_utterance = None;

        let chunk = &session.chunks[session.index];
        if chunk.boundary == Boundary::Final {
            self.begin_end_silence();
            return;
        }

        let delay = delay_after(chunk, &session.settings);
        let next_index = session.index + 1;
        if session.paused {
            // Not every platform can freeze an utterance mid-flight, so a
            // completion may arrive while paused; freeze the full delay.
            session.phase = Phase::WaitingPaused {
                next_index,
                remaining: delay,
            };
        } else {
            session.phase = Phase::Waiting {
                next_index,
                deadline: Instant::now() + delay,
            };
        }
    }

    fn begin_end_silence(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        let total = Duration::from_millis(session.settings.end_silence_ms);
        if total.is_zero() {
            // Nothing to count down; finish without the completion callback.
            self.finish_session(false);
            return;
        }
        session.current_utterance = None;
        session.phase = if session.paused {
            Phase::EndSilencePaused { remaining: total }
        } else {
            Phase::EndSilence {
                deadline: Instant::now() + total,
            }
        };
        self.publish();
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        if session.paused {
            return;
        }
        session.paused = true;
        match session.phase {
            Phase::Speaking => self.provider.pause(),
            Phase::Waiting {
                next_index,
                deadline,
            } => {
                session.phase = Phase::WaitingPaused {
                    next_index,
                    remaining: deadline.saturating_duration_since(Instant::now()),
                };
            }
            Phase::EndSilence { deadline } => {
                session.phase = Phase::EndSilencePaused {
                    remaining: deadline.saturating_duration_since(Instant::now()),
                };
            }
            _ => {}
        }
        self.publish();
    }

    fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        if !session.paused {
            return;
        }
        session.paused = false;
        self.provider.resume();
        match session.phase {
            Phase::WaitingPaused {
                next_index,
                remaining,
            } => {
                session.phase = Phase::Waiting {
                    next_index,
                    deadline: Instant::now() + remaining,
                };
            }
            Phase::EndSilencePaused { remaining } => {
                session.phase = Phase::EndSilence {
                    deadline: Instant::now() + remaining,
                };
            }
            _ => {}
        }
        self.publish();
    }

    fn skip_end_silence(&mut self) {
        let Some(session) = &self.session else { return };
        if matches!(
            session.phase,
            Phase::EndSilence { .. } | Phase::EndSilencePaused { .. }
        ) {
            self.finish_session(false);
        }
    }

    /// Discard the session. The completion callback fires only on natural
    /// end-silence expiry, never on stop, skip, or error.
    fn finish_session(&mut self, natural: bool) {
        if self.session.take().is_none() {
            return;
        }
        if natural {
            log::debug!("end silence expired; narration complete");
            if let Some(on_complete) = self.on_complete.as_mut() {
                on_complete();
            }
        }
        self.publish();
    }

    fn reselect_voice(&mut self) {
        let settings = self
            .session
            .as_ref()
            .map(|s| &s.settings)
            .unwrap_or(&self.settings);
        self.selected = select_best_voice(&self.voices, settings);
    }

    fn is_current(&self, id: UtteranceId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.current_utterance == Some(id))
    }

    fn alloc_utterance_id(&mut self) -> UtteranceId {
        self.next_utterance += 1;
        self.next_utterance
    }

    fn publish(&self) {
        let status = match &self.session {
            None => NarrationStatus::idle(self.supported, self.selected.clone(), self.voices.clone()),
            Some(session) => {
                let (in_end_silence, remaining) = match session.phase {
                    Phase::EndSilence { deadline } => {
                        (true, deadline.saturating_duration_since(Instant::now()))
                    }
                    Phase::EndSilencePaused { remaining } => (true, remaining),
                    _ => (false, Duration::ZERO),
                };
                NarrationStatus {
                    is_supported: true,
                    is_speaking: true,
                    is_paused: session.paused,
                    is_in_end_silence: in_end_silence,
                    end_silence_remaining_ms: remaining.as_millis() as u64,
                    current_chunk_index: session.index,
                    total_chunks: session.chunks.len(),
                    estimated_duration_ms: session.estimated_total_ms,
                    selected_voice: self.selected.clone(),
                    voices: self.voices.clone(),
                }
            }
        };
        self.status_tx.send_replace(status);
    }
}
