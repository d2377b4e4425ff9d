//! Sound cues. Playback status is tracked here from each cue's nominal
//! length; an attached [`SoundSink`] does the actual output, if any.

use std::fmt;

use crate::config::AudioConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Footsteps, played once when the roamer starts moving.
    Run,
    /// Walking into something that isn't terrain.
    Bump,
    /// A new bunny arrived.
    Spawn,
}

impl SoundCue {
    pub const ALL: [SoundCue; 3] = [SoundCue::Run, SoundCue::Bump, SoundCue::Spawn];

    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Run => "run",
            SoundCue::Bump => "bump",
            SoundCue::Spawn => "spawn",
        }
    }

    /// Length of one play in seconds.
    pub fn duration(self) -> f32 {
        match self {
            SoundCue::Run => 2.0,
            SoundCue::Bump => 0.5,
            SoundCue::Spawn => 1.5,
        }
    }

    /// Bundled clip, 16 kHz mono WAV of exactly [`duration`](Self::duration).
    pub fn clip(self) -> &'static [u8] {
        match self {
            SoundCue::Run => include_bytes!("../../assets/sounds/run.wav"),
            SoundCue::Bump => include_bytes!("../../assets/sounds/bump.wav"),
            SoundCue::Spawn => include_bytes!("../../assets/sounds/spawn.wav"),
        }
    }

    /// File looked up in a configured sound directory before the bundled clip.
    pub fn file_name(self) -> &'static str {
        match self {
            SoundCue::Run => "run.wav",
            SoundCue::Bump => "bump.wav",
            SoundCue::Spawn => "spawn.wav",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output backend.
pub trait SoundSink {
    fn start(&mut self, cue: SoundCue);
    fn stop(&mut self, cue: SoundCue);
}

/// Sink that only logs.
#[derive(Debug, Default)]
pub struct TraceSink;

impl SoundSink for TraceSink {
    fn start(&mut self, cue: SoundCue) {
        tracing::debug!(%cue, "sound start");
    }

    fn stop(&mut self, cue: SoundCue) {
        tracing::debug!(%cue, "sound stop");
    }
}

pub struct SoundBank {
    /// Seconds left per cue; `None` when silent.
    remaining: [Option<f32>; SoundCue::ALL.len()],
    sink: Box<dyn SoundSink>,
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::new(Box::new(TraceSink))
    }
}

impl SoundBank {
    pub fn new(sink: Box<dyn SoundSink>) -> Self {
        Self {
            remaining: [None; SoundCue::ALL.len()],
            sink,
        }
    }

    pub fn is_playing(&self, cue: SoundCue) -> bool {
        self.remaining[cue.slot()].is_some()
    }

    /// Start `cue` unless it is already playing. Returns whether it started.
    pub fn play_if_idle(&mut self, cue: SoundCue) -> bool {
        if self.is_playing(cue) {
            return false;
        }
        self.remaining[cue.slot()] = Some(cue.duration());
        self.sink.start(cue);
        true
    }

    pub fn stop(&mut self, cue: SoundCue) {
        if self.remaining[cue.slot()].take().is_some() {
            self.sink.stop(cue);
        }
    }

    /// Advance playback. Cues fall silent once their clip has run out.
    pub fn advance(&mut self, dt: f32) {
        for cue in SoundCue::ALL {
            let Some(left) = self.remaining[cue.slot()].as_mut() else {
                continue;
            };
            *left -= dt;
            if *left <= 0.0 {
                self.remaining[cue.slot()] = None;
                self.sink.stop(cue);
            }
        }
    }
}

/// Bank wired to the audio device when the `audio` feature is on and output
/// opens, otherwise to [`TraceSink`].
pub fn output_bank(config: &AudioConfig) -> SoundBank {
    if !config.enabled {
        tracing::info!("audio disabled, sound cues are only logged");
        return SoundBank::default();
    }
    #[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
    match RodioSink::open(config) {
        Ok(sink) => return SoundBank::new(Box::new(sink)),
        Err(err) => tracing::warn!(%err, "no audio output, sound cues are only logged"),
    }
    SoundBank::default()
}

#[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
pub use device::RodioSink;

#[cfg(all(feature = "audio", not(target_arch = "wasm32")))]
mod device {
    use std::io::Cursor;
    use std::path::PathBuf;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::{SoundCue, SoundSink};
    use crate::config::AudioConfig;
    use crate::error::{Result, RoamError};

    /// Plays cues on the default output device, one rodio sink per cue.
    pub struct RodioSink {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sinks: [Option<Sink>; SoundCue::ALL.len()],
        sound_dir: Option<PathBuf>,
        volume: f32,
    }

    impl RodioSink {
        pub fn open(config: &AudioConfig) -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()?;
            tracing::info!(dir = ?config.sound_dir, volume = config.volume, "audio output opened");
            Ok(Self {
                _stream: stream,
                handle,
                sinks: Default::default(),
                sound_dir: config.sound_dir.clone(),
                volume: config.volume,
            })
        }

        fn clip_bytes(&self, cue: SoundCue) -> Result<Vec<u8>> {
            let Some(path) = self.sound_dir.as_ref().map(|dir| dir.join(cue.file_name())) else {
                return Ok(cue.clip().to_vec());
            };
            if !path.is_file() {
                return Ok(cue.clip().to_vec());
            }
            std::fs::read(&path).map_err(|source| RoamError::SoundIo { path, source })
        }

        fn play(&mut self, cue: SoundCue) -> Result<()> {
            let source = Decoder::new(Cursor::new(self.clip_bytes(cue)?))?;
            let sink = Sink::try_new(&self.handle)?;
            sink.set_volume(self.volume);
            sink.append(source);
            // replacing drops (and silences) any earlier play of this cue
            self.sinks[cue.slot()] = Some(sink);
            Ok(())
        }
    }

    impl SoundSink for RodioSink {
        fn start(&mut self, cue: SoundCue) {
            if let Err(err) = self.play(cue) {
                tracing::warn!(%cue, %err, "cue playback failed");
            }
        }

        fn stop(&mut self, cue: SoundCue) {
            if let Some(sink) = self.sinks[cue.slot()].take() {
                sink.stop();
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rodio::Source;

        #[test]
        fn bundled_clips_decode_to_their_nominal_length() {
            for cue in SoundCue::ALL {
                let decoder = Decoder::new(Cursor::new(cue.clip())).unwrap();
                let per_second = decoder.sample_rate() as f32 * decoder.channels() as f32;
                let secs = decoder.count() as f32 / per_second;
                assert!((secs - cue.duration()).abs() < 0.01, "{cue}: {secs}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl SoundSink for Recorder {
        fn start(&mut self, cue: SoundCue) {
            self.0.borrow_mut().push(format!("+{cue}"));
        }
        fn stop(&mut self, cue: SoundCue) {
            self.0.borrow_mut().push(format!("-{cue}"));
        }
    }

    fn bank() -> (SoundBank, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (SoundBank::new(Box::new(Recorder(log.clone()))), log)
    }

    #[test]
    fn play_is_idempotent_while_playing() {
        let (mut bank, log) = bank();
        assert!(bank.play_if_idle(SoundCue::Bump));
        assert!(!bank.play_if_idle(SoundCue::Bump));
        assert_eq!(*log.borrow(), vec!["+bump"]);
    }

    #[test]
    fn one_shots_expire() {
        let (mut bank, log) = bank();
        bank.play_if_idle(SoundCue::Bump);
        bank.advance(0.3);
        assert!(bank.is_playing(SoundCue::Bump));
        bank.advance(0.3);
        assert!(!bank.is_playing(SoundCue::Bump));
        assert!(bank.play_if_idle(SoundCue::Bump));
        assert_eq!(*log.borrow(), vec!["+bump", "-bump", "+bump"]);
    }

    #[test]
    fn run_plays_once_and_stop_is_idempotent() {
        let (mut bank, log) = bank();
        bank.play_if_idle(SoundCue::Run);
        bank.advance(1.0);
        assert!(bank.is_playing(SoundCue::Run));
        bank.stop(SoundCue::Run);
        bank.stop(SoundCue::Run);
        assert!(!bank.is_playing(SoundCue::Run));

        bank.play_if_idle(SoundCue::Run);
        for _ in 0..25 {
            bank.advance(0.1);
        }
        assert!(!bank.is_playing(SoundCue::Run));
        assert_eq!(*log.borrow(), vec!["+run", "-run", "+run", "-run"]);
    }

    #[test]
    fn bundled_clip_lengths_match_durations() {
        for cue in SoundCue::ALL {
            let clip = cue.clip();
            assert_eq!(&clip[0..4], b"RIFF");
            let byte_rate = u32::from_le_bytes([clip[28], clip[29], clip[30], clip[31]]) as f32;
            let data_len = u32::from_le_bytes([clip[40], clip[41], clip[42], clip[43]]) as f32;
            assert!((data_len / byte_rate - cue.duration()).abs() < 1e-3, "{cue}");
        }
    }

    #[test]
    fn disabled_audio_falls_back_to_logging() {
        let config = AudioConfig { enabled: false, ..AudioConfig::default() };
        let mut bank = output_bank(&config);
        assert!(bank.play_if_idle(SoundCue::Spawn));
        assert!(bank.is_playing(SoundCue::Spawn));
    }
}
