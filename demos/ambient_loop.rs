//! Loop an audio file in the background.
//!
//! Loops a file forever on Tokio's blocking pool and stops it after a few
//! seconds, or earlier on Ctrl+C.
//!
//! Run with: cargo run --example ambient_loop -- path/to/ambience.aiff

use std::time::Duration;
use stream_sound::{LoopCount, Player};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: ambient_loop <file>");
        std::process::exit(2);
    };

    let player = Player::builder().build()?;

    // Preloading keeps the loop gapless and the file closed while it plays
    let clip = player.load_clip(&path)?;
    println!("Looping {path} ({} ms per pass)", clip.duration().as_millis());
    println!("Press Ctrl+C to stop early.");

    let handle = player.spawn_clip(clip, LoopCount::Forever)?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(10)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let progress = handle.progress();
    handle.cancel();
    let report = handle.wait().await?;

    println!(
        "Stopped after {} passes ({} bytes written)",
        report.iterations_completed, progress.bytes_written
    );
    Ok(())
}
