use narrate_rs::{event_channel, format_duration, Narrator, PacingSettingsBuilder, SilentProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let settings = PacingSettingsBuilder::default()
        .rate(0.9_f32)
        .end_silence_ms(5_000_u64)
        .outro_enabled(false)
        .build()
        .expect("builder backed by defaults");

    let (events_tx, events_rx) = event_channel();
    let provider = SilentProvider::new(events_tx);
    provider.announce_voices(SilentProvider::default_catalog());

    let narrator = Narrator::spawn(
        provider,
        events_rx,
        settings,
        Some(Box::new(|| println!("*bell*"))),
    );

    let script = "Settle into your seat and soften your gaze, letting the day fall away.\n\n\
                  Feel the breath move on its own… slow, easy, and unhurried.";

    let estimate = narrator.estimate_script_duration(script, Some("Evening calm"));
    println!(
        "{} words across {} chunks, about {}",
        estimate.word_count,
        estimate.chunk_count,
        format_duration(estimate.total_ms)
    );

    narrator.speak(script, Some("Evening calm"));

    let mut status = narrator.subscribe();
    while !status.borrow_and_update().is_speaking {
        if status.changed().await.is_err() {
            return;
        }
    }

    let mut last_shown = u64::MAX;
    loop {
        if status.changed().await.is_err() {
            break;
        }
        let snapshot = status.borrow_and_update().clone();
        if snapshot.is_in_end_silence {
            let seconds = snapshot.end_silence_remaining_ms.div_ceil(1000);
            if seconds != last_shown {
                println!("end silence: {seconds}s");
                last_shown = seconds;
            }
        } else if snapshot.is_speaking {
            println!(
                "chunk {}/{}",
                snapshot.current_chunk_index + 1,
                snapshot.total_chunks
            );
        }
        if !snapshot.is_speaking {
            break;
        }
    }
    println!("session finished");
}
