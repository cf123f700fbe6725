use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;

/// 120 bpm.
const BEAT_SECS: f32 = 0.5;

const ATTACK_SECS: f32 = 0.02;

#[derive(Clone, Copy)]
enum Wave {
    Square,
    Triangle,
    Sawtooth,
}

struct Note {
    freq: f32,
    start: f32,
    beats: f32,
    wave: Wave,
    vibrato: bool,
}

const fn note(freq: f32, start: f32, beats: f32, wave: Wave) -> Note {
    Note {
        freq,
        start,
        beats,
        wave,
        vibrato: false,
    }
}

const fn lead(freq: f32, start: f32) -> Note {
    Note {
        freq,
        start,
        beats: 1.0,
        wave: Wave::Square,
        vibrato: true,
    }
}

const C4: f32 = 261.63;
const EB4: f32 = 311.13;
const AB4: f32 = 415.30;
const C5: f32 = 523.25;
const EB5: f32 = 622.25;
const G5: f32 = 783.99;

/// Two bars in C minor: a bass line, an arpeggiated lead and a two-voice pad.
const SCORE: [Note; 14] = [
    note(C4, 0.0, 2.0, Wave::Triangle),
    lead(C5, 0.0),
    lead(EB5, 1.0),
    lead(G5, 2.0),
    lead(EB5, 3.0),
    note(C4, 0.0, 4.0, Wave::Sawtooth),
    note(EB4, 0.0, 4.0, Wave::Sawtooth),
    note(AB4, 4.0, 2.0, Wave::Triangle),
    lead(C5, 4.0),
    lead(EB5, 5.0),
    lead(C5, 6.0),
    lead(AB4, 7.0),
    note(AB4, 4.0, 4.0, Wave::Sawtooth),
    note(C4, 4.0, 4.0, Wave::Sawtooth),
];

const TOTAL_BEATS: f32 = 8.0;
const TAIL_SECS: f32 = 0.1;

impl Note {
    fn sample(&self, t: f32) -> f32 {
        let start = self.start * BEAT_SECS;
        let len = self.beats * BEAT_SECS;
        let local = t - start;
        if local < 0.0 || local >= len {
            return 0.0;
        }

        let envelope = if local < ATTACK_SECS {
            local / ATTACK_SECS
        } else {
            (-4.6 * (local - ATTACK_SECS) / (len - ATTACK_SECS)).exp()
        };

        let freq = if self.vibrato {
            self.freq + 7.0 * (2.0 * PI * 5.5 * t).sin()
        } else {
            self.freq
        };
        let phase = (freq * local).fract();

        let wave = match self.wave {
            Wave::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Wave::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Wave::Sawtooth => 2.0 * phase - 1.0,
        };

        wave * envelope * 0.18
    }
}

/// Finite, mono rendering of the completion tune.
pub struct CompletionMelody {
    num_sample: usize,
    total_samples: usize,
}

impl CompletionMelody {
    pub fn new() -> Self {
        let secs = TOTAL_BEATS * BEAT_SECS + TAIL_SECS;
        Self {
            num_sample: 0,
            total_samples: (secs * SAMPLE_RATE as f32) as usize,
        }
    }
}

impl Iterator for CompletionMelody {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        let mixed: f32 = SCORE.iter().map(|note| note.sample(t)).sum();
        Some((mixed * 0.5).clamp(-1.0, 1.0))
    }
}

impl Source for CompletionMelody {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / SAMPLE_RATE as f32,
        ))
    }
}
