pub mod melody;

use melody::CompletionMelody;

use log::warn;
use rodio::{OutputStream, Sink};
use std::thread;

/// Plays the completion melody once on a short-lived thread.
///
/// rodio output streams are not `Send`, so the stream, the sink and the
/// source all live and die on that thread. A missing audio device is logged
/// there and otherwise ignored.
pub fn play_completion_melody(volume: f32) -> Result<(), String> {
    thread::Builder::new()
        .name("completion-chime".to_string())
        .spawn(move || {
            let (_stream, handle) = match OutputStream::try_default() {
                Ok(output) => output,
                Err(e) => {
                    warn!("Failed to create audio output stream: {}", e);
                    return;
                }
            };
            let sink = match Sink::try_new(&handle) {
                Ok(sink) => sink,
                Err(e) => {
                    warn!("Failed to create audio sink: {}", e);
                    return;
                }
            };

            sink.set_volume(volume.clamp(0.0, 1.0));
            sink.append(CompletionMelody::new());
            sink.sleep_until_end();
        })
        .map(|_| ())
        .map_err(|e| e.to_string())
}
