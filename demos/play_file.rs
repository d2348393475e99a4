//! Play a single audio file.
//!
//! Streams a WAV, AIFF or AU file to the default output device and prints
//! its estimated length first.
//!
//! Run with: cargo run --example play_file -- path/to/clip.wav

use stream_sound::{estimate_duration_ms, is_supported, Player};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_sound=debug".into()),
        )
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: play_file <file.wav|file.aiff|file.au>");
        std::process::exit(2);
    };

    let player = Player::builder()
        .on_event(|event| tracing::info!(?event, "playback event"))
        .build()?;

    if !is_supported(&path) {
        eprintln!("{path} is not a playable WAV, AIFF or AU file");
        player.beep_blocking();
        std::process::exit(1);
    }

    println!("Playing {path} (~{:.0} ms)", estimate_duration_ms(&path));

    let outcome = player.play(&path)?;

    println!("Done: {outcome:?}");
    Ok(())
}
