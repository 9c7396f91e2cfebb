//! Sound cues
//!
//! On the web every cue is synthesized with Web Audio oscillators, so no
//! sound files are needed. Native builds only log the cues.

use crate::settings::Settings;
use crate::sim::AudioCue;

/// Plays [`AudioCue`]s drained from the runner's outbox
pub struct AudioPlayer {
    sfx_volume: f32,
    music_volume: f32,
    music_playing: bool,
    #[cfg(target_arch = "wasm32")]
    synth: synth::WebAudio,
}

impl AudioPlayer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            sfx_volume: settings.effective_sfx_volume(),
            music_volume: settings.effective_music_volume(),
            music_playing: false,
            #[cfg(target_arch = "wasm32")]
            synth: synth::WebAudio::new(),
        }
    }

    /// Pick up changed volumes; the running background loop follows
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.sfx_volume = settings.effective_sfx_volume();
        self.music_volume = settings.effective_music_volume();
        #[cfg(target_arch = "wasm32")]
        self.synth.set_music_volume(self.music_volume);
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_playing
    }

    pub fn play_all(&mut self, cues: &[AudioCue]) {
        for &cue in cues {
            self.play(cue);
        }
    }

    pub fn play(&mut self, cue: AudioCue) {
        match cue {
            AudioCue::LaneSwitch | AudioCue::Collision => {
                if self.sfx_volume <= 0.0 {
                    return;
                }
                self.effect(cue);
            }
            AudioCue::BackgroundStart => {
                if self.music_playing {
                    return;
                }
                self.music_playing = true;
                self.start_music();
            }
            AudioCue::BackgroundStop => {
                if !self.music_playing {
                    return;
                }
                self.music_playing = false;
                self.stop_music();
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn effect(&mut self, cue: AudioCue) {
        match cue {
            AudioCue::LaneSwitch => self.synth.play_lane_switch(self.sfx_volume),
            AudioCue::Collision => self.synth.play_crash(self.sfx_volume),
            AudioCue::BackgroundStart | AudioCue::BackgroundStop => {}
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn start_music(&mut self) {
        self.synth.start_music(self.music_volume);
    }

    #[cfg(target_arch = "wasm32")]
    fn stop_music(&mut self) {
        self.synth.stop_music();
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn effect(&mut self, cue: AudioCue) {
        log::debug!("Audio cue {cue:?} (volume {:.2})", self.sfx_volume);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start_music(&mut self) {
        log::debug!("Background music on (volume {:.2})", self.music_volume);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn stop_music(&mut self) {
        log::debug!("Background music off");
    }
}

#[cfg(target_arch = "wasm32")]
mod synth {
    use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

    /// Background loop level relative to the music volume
    const MUSIC_LEVEL: f32 = 0.12;

    pub struct WebAudio {
        ctx: Option<AudioContext>,
        /// Bass and pad voices of the running background loop
        music: Vec<(OscillatorNode, GainNode)>,
    }

    impl WebAudio {
        pub fn new() -> Self {
            // Fails outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                music: Vec::new(),
            }
        }

        /// Context ready for playback (browsers suspend it until a user gesture)
        fn ready(&self) -> Option<&AudioContext> {
            let ctx = self.ctx.as_ref()?;
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            Some(ctx)
        }

        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Short rising swish
        pub fn play_lane_switch(&self, vol: f32) {
            let Some(ctx) = self.ready() else { return };
            let Some((osc, gain)) = Self::create_osc(ctx, 500.0, OscillatorType::Triangle) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.25, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(500.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(900.0, t + 0.1)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }

        /// Crunch plus a low thump
        pub fn play_crash(&self, vol: f32) {
            let Some(ctx) = self.ready() else { return };
            let t = ctx.current_time();

            if let Some((osc, gain)) = Self::create_osc(ctx, 220.0, OscillatorType::Sawtooth) {
                gain.gain().set_value_at_time(vol * 0.4, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.4)
                    .ok();
                osc.frequency().set_value_at_time(220.0, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(40.0, t + 0.4)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.45).ok();
            }

            if let Some((osc, gain)) = Self::create_osc(ctx, 60.0, OscillatorType::Sine) {
                gain.gain().set_value_at_time(vol * 0.5, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.3).ok();
            }
        }

        /// Sustained drone until [`WebAudio::stop_music`]
        pub fn start_music(&mut self, vol: f32) {
            let Some(ctx) = self.ready() else { return };
            let t = ctx.current_time();

            for (freq, osc_type) in [
                (55.0, OscillatorType::Sine),
                (110.0, OscillatorType::Triangle),
                (164.8, OscillatorType::Sine),
            ] {
                if let Some((osc, gain)) = Self::create_osc(ctx, freq, osc_type) {
                    gain.gain().set_value_at_time(0.0, t).ok();
                    gain.gain()
                        .linear_ramp_to_value_at_time(vol * MUSIC_LEVEL, t + 0.5)
                        .ok();
                    osc.start().ok();
                    self.music.push((osc, gain));
                }
            }
        }

        pub fn stop_music(&mut self) {
            let Some(ctx) = self.ctx.as_ref() else { return };
            let t = ctx.current_time();
            for (osc, gain) in self.music.drain(..) {
                gain.gain().set_value_at_time(gain.gain().value(), t).ok();
                gain.gain().linear_ramp_to_value_at_time(0.0, t + 0.2).ok();
                osc.stop_with_when(t + 0.25).ok();
            }
        }

        pub fn set_music_volume(&self, vol: f32) {
            for (_, gain) in &self.music {
                gain.gain().set_value(vol * MUSIC_LEVEL);
            }
        }
    }
}
