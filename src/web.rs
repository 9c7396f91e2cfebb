//! JS host bridge
//!
//! The page owns the three.js scene and DOM menus. It forwards raw input,
//! calls [`WebRunner::frame`] from `requestAnimationFrame`, and applies the
//! returned JSON outbox. Audio cues are played here.

use wasm_bindgen::prelude::*;

use crate::audio::AudioPlayer;
use crate::consts::SIM_DT;
use crate::input::{self, InputBuffer, Intent};
use crate::platform::{self, FrameClock};
use crate::settings::Settings;
use crate::sim::{Outbox, Runner, TickInput};
use crate::tuning::RunnerConfig;

#[wasm_bindgen]
pub struct WebRunner {
    runner: Runner,
    clock: FrameClock,
    input: InputBuffer,
    audio: AudioPlayer,
    settings: Settings,
    last_frame_ms: Option<f64>,
}

#[wasm_bindgen]
impl WebRunner {
    /// Build a runner from an optional JSON tuning override
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebRunner, JsError> {
        platform::init_logging();

        let config = match config_json {
            Some(json) => RunnerConfig::from_json(&json)?,
            None => RunnerConfig::default(),
        };
        let seed = js_sys::Date::now() as u64;
        let settings = Settings::load();
        log::info!("Lane Runner starting (seed {seed})");

        Ok(Self {
            runner: Runner::new(config, seed)?,
            clock: FrameClock::new(),
            input: InputBuffer::new(),
            audio: AudioPlayer::new(&settings),
            settings,
            last_frame_ms: None,
        })
    }

    /// The character model finished loading on the JS side
    pub fn mark_character_loaded(&mut self) -> Result<(), JsError> {
        self.runner.mark_character_loaded()?;
        Ok(())
    }

    pub fn start(&mut self) -> bool {
        self.clock.reset();
        self.runner.start()
    }

    pub fn pause(&mut self) -> bool {
        self.runner.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.clock.reset();
        self.runner.resume()
    }

    pub fn restart(&mut self) -> Result<bool, JsError> {
        self.clock.reset();
        Ok(self.runner.restart()?)
    }

    /// `keydown` handler; returns whether the key was used
    pub fn key_down(&mut self, key: &str) -> bool {
        self.push(input::key_to_intent(key))
    }

    /// `touchend` handler with the gesture's total displacement
    pub fn swipe(&mut self, dx: f32, dy: f32) -> bool {
        self.push(input::swipe_to_intent(dx, dy, self.settings.swipe_threshold))
    }

    fn push(&mut self, intent: Option<Intent>) -> bool {
        match intent {
            Some(intent) => {
                self.input.push(intent);
                true
            }
            None => false,
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.settings.save();
        self.audio.apply_settings(&self.settings);
    }

    /// Run the ticks owed for this frame and return the outbox as JSON
    pub fn frame(&mut self, now_ms: f64) -> Result<String, JsError> {
        let frame_dt = match self.last_frame_ms.replace(now_ms) {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => SIM_DT,
        };

        // Buffered input goes to the first tick; frames without a tick keep it
        for tick in 0..self.clock.advance(frame_dt) {
            let input = if tick == 0 {
                self.input.take()
            } else {
                TickInput::default()
            };
            self.runner.tick(&input, SIM_DT)?;
        }

        let outbox: Outbox = self.runner.take_outbox();
        self.audio.play_all(&outbox.audio);
        Ok(serde_json::to_string(&outbox)?)
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.runner.phase())
    }
}
