use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{error, warn};
use rodio::{OutputStream, Sink, Source};

use crate::io::ToneEvent;

const SAMPLE_RATE: u32 = 44_100;
const TONE_HZ: f32 = 220.0;
const AMPLITUDE: f32 = 0.25;

/// Endless fixed-frequency square wave.
///
/// The cabinet's discrete sound board is reduced to a single gated tone:
/// the wave plays while any sound line is asserted and is silent
/// otherwise.
#[derive(Default)]
struct SquareWave {
    sample: u32,
}

impl Iterator for SquareWave {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let period = SAMPLE_RATE as f32 / TONE_HZ;
        let phase = (self.sample as f32 % period) / period;
        self.sample = self.sample.wrapping_add(1);
        Some(if phase < 0.5 { AMPLITUDE } else { -AMPLITUDE })
    }
}

impl Source for SquareWave {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

struct SoundThread {
    receiver: Receiver<ToneEvent>,
}

impl SoundThread {
    fn run(self) {
        // Keep the stream alive as long as the audio thread runs.
        let Ok((stream, stream_handle)) = OutputStream::try_default() else {
            error!("Failed to open default audio output stream, disabling audio");
            return;
        };
        let _stream = stream;

        let Ok(sink) = Sink::try_new(&stream_handle) else {
            error!("Failed to create audio sink, disabling audio");
            return;
        };

        sink.append(SquareWave::default());
        sink.pause();

        let mut asserted: HashSet<(u8, u8)> = HashSet::new();
        loop {
            match self.receiver.recv() {
                Ok(event) => {
                    if event.on {
                        asserted.insert((event.port, event.bit));
                    } else {
                        asserted.remove(&(event.port, event.bit));
                    }

                    if asserted.is_empty() {
                        sink.pause();
                    } else {
                        sink.play();
                    }
                }
                Err(e) => {
                    warn!("Audio channel closed: {e}");
                    break;
                }
            }
        }
    }
}

/// Main-thread handle that forwards sound edges to the audio thread.
pub struct SoundManager {
    sender: Sender<ToneEvent>,
}

impl SoundManager {
    /// Try to start the audio thread and create a new manager.
    ///
    /// If the thread cannot be spawned this returns `None` and the game
    /// runs silently.
    pub fn new() -> Option<Self> {
        let (sender, receiver) = mpsc::channel::<ToneEvent>();
        let sound_thread = SoundThread { receiver };

        if let Err(e) = thread::Builder::new()
            .name("invaders_sound".into())
            .spawn(move || sound_thread.run())
        {
            error!("Failed to spawn audio thread: {e}");
            return None;
        }

        Some(Self { sender })
    }

    /// Forward one sound edge. Errors are ignored; if the audio thread
    /// has gone away the game simply stays silent.
    pub fn handle(&mut self, event: ToneEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_wave_alternates_half_periods() {
        let period = (SAMPLE_RATE as f32 / TONE_HZ) as usize;
        let samples: Vec<f32> = SquareWave::default().take(period).collect();

        // Every sample sits on one of the two rails.
        assert!(samples.iter().all(|s| s.abs() == AMPLITUDE));

        // High phase first, low phase in the second half-period.
        assert!(samples[0] > 0.0);
        assert!(samples[period / 4] > 0.0);
        assert!(samples[3 * period / 4] < 0.0);
        assert!(samples[period - 1] < 0.0);
    }

    #[test]
    fn square_wave_is_mono_at_fixed_rate() {
        let wave = SquareWave::default();
        assert_eq!(wave.channels(), 1);
        assert_eq!(wave.sample_rate(), SAMPLE_RATE);
        assert_eq!(wave.total_duration(), None);
    }
}
