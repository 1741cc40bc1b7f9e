/// Sound engine: synthesized sound cues via rodio.
///
/// Every cue is rendered once at init into an in-memory WAV buffer and
/// played fire-and-forget on a detached Sink.
///
/// Build without the "sound" feature to get a silent stub.

use bailey::sim::event::GameEvent;

/// One cue per audible game event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cue {
    Jump,
    Dash,
    Reward,
    Shot,
    Kill,
    Hit,
    Fireball,
    Die,
    Clear,
    GameOver,
    Finale,
}

impl Cue {
    /// Events without a sound map to `None`; fireballs launched out of
    /// earshot are silent.
    pub fn for_event(event: &GameEvent) -> Option<Cue> {
        match event {
            GameEvent::Jumped => Some(Cue::Jump),
            GameEvent::Dashed => Some(Cue::Dash),
            GameEvent::RewardCollected => Some(Cue::Reward),
            GameEvent::EnemyShot => Some(Cue::Shot),
            GameEvent::EnemyKilled { .. } => Some(Cue::Kill),
            GameEvent::HitByEnemy | GameEvent::HitByFire => Some(Cue::Hit),
            GameEvent::FireballLaunched { near: true } => Some(Cue::Fireball),
            GameEvent::PlayerDied => Some(Cue::Die),
            GameEvent::LevelCleared => Some(Cue::Clear),
            GameEvent::GameOver => Some(Cue::GameOver),
            GameEvent::Finale => Some(Cue::Finale),
            GameEvent::FireballLaunched { near: false }
            | GameEvent::LevelLoaded { .. }
            | GameEvent::NewHighScore(_) => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;

    const ALL_CUES: [Cue; 11] = [
        Cue::Jump, Cue::Dash, Cue::Reward, Cue::Shot, Cue::Kill, Cue::Hit,
        Cue::Fireball, Cue::Die, Cue::Clear, Cue::GameOver, Cue::Finale,
    ];

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Cue, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };
            let buffers = ALL_CUES.iter()
                .map(|&cue| (cue, Arc::new(make_wav(&synthesize(cue)))))
                .collect();
            debug!("sound cues generated");
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, cue: Cue) {
            let Some(buf) = self.buffers.get(&cue) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    fn synthesize(cue: Cue) -> Vec<f32> {
        match cue {
            Cue::Jump => sweep(300.0, 700.0, 0.10, 0.22),
            Cue::Dash => noise_sweep(900.0, 200.0, 0.18, 0.25),
            Cue::Reward => notes(&[1047.0, 1568.0], 0.045, 0.25),
            Cue::Shot => sweep(1200.0, 600.0, 0.06, 0.18),
            Cue::Kill => notes(&[784.0, 1047.0, 1319.0], 0.05, 0.28),
            Cue::Hit => noise_sweep(400.0, 120.0, 0.12, 0.30),
            Cue::Fireball => noise_sweep(150.0, 350.0, 0.20, 0.20),
            Cue::Die => notes(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.30),
            Cue::Clear => notes(&[523.0, 659.0, 784.0, 1047.0, 1047.0], 0.10, 0.30),
            Cue::GameOver => notes(&[392.0, 330.0, 262.0, 196.0], 0.22, 0.30),
            Cue::Finale => notes(&[523.0, 659.0, 784.0, 1047.0, 784.0, 1047.0], 0.14, 0.30),
        }
    }

    /// Square-ish notes (sine + 3rd harmonic) with a per-note decay.
    fn notes(freqs: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        freqs.iter()
            .flat_map(|&freq| {
                (0..n).map(move |i| {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - (i as f32 / n as f32) * 0.6;
                    let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                    wave * env * volume
                })
            })
            .collect()
    }

    /// Sine glide from `from` to `to` Hz, fading out.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (from + (to - from) * t) * TAU / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// Glide mixed with LCG noise.
    fn noise_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let mut seed: u32 = 12345;
        sweep(from, to, duration, 1.0)
            .into_iter()
            .map(|tone| {
                seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (seed as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.5 + noise * 0.5 * tone.abs().max(0.2)) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * num_channels as u32 * bits_per_sample as u32 / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}

/// Play the cue for every audible event of a step.
pub fn play_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for cue in events.iter().filter_map(Cue::for_event) {
        sfx.play(cue);
    }
}
