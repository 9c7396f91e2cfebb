//! Lane Runner entry point
//!
//! The web build is driven from JS through `lane_runner::web::WebRunner`.
//! Natively this plays one headless run with a simple dodging autopilot.
//!
//! Usage: `lane-runner [seed] [max_ticks]`

#[cfg(not(target_arch = "wasm32"))]
use lane_runner::{
    RunnerConfig, Settings, TickInput,
    audio::AudioPlayer,
    consts::SIM_DT,
    platform,
    sim::{Lane, LaneDirection, Runner, RunnerError, UiEvent},
};

/// How far ahead of the player the autopilot looks (world units)
#[cfg(not(target_arch = "wasm32"))]
const LOOKAHEAD: f32 = 14.0;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    platform::init_logging();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0x5EED);
    let max_ticks: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60 * 60 * 10);

    log::info!("Lane Runner (native) starting with seed {seed}");
    if let Err(e) = run(seed, max_ticks) {
        log::error!("Run failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run(seed: u64, max_ticks: u64) -> Result<(), RunnerError> {
    let mut runner = Runner::new(RunnerConfig::default(), seed)?;
    let mut audio = AudioPlayer::new(&Settings::load());

    runner.mark_character_loaded()?;
    runner.start();

    for _ in 0..max_ticks {
        let input = TickInput {
            lane_change: autopilot(&runner),
            toggle_pause: false,
        };
        runner.tick(&input, SIM_DT)?;

        let outbox = runner.take_outbox();
        audio.play_all(&outbox.audio);
        if outbox.ui.contains(&UiEvent::ShowGameOverMenu) {
            break;
        }
    }

    let distance = runner.ticks() as f32 * runner.config().game_speed;
    let diagnostics = runner.waves().diagnostics();
    log::info!(
        "Run over after {} ticks ({distance:.0} units, phase {:?}, {} waves planned, {} forced lanes)",
        runner.ticks(),
        runner.phase(),
        diagnostics.waves_planned,
        diagnostics.forced_free_lanes
    );
    Ok(())
}

/// Step out of the current lane when something is about to reach the player
#[cfg(not(target_arch = "wasm32"))]
fn autopilot(runner: &Runner) -> Option<LaneDirection> {
    let player = runner.player()?;
    if player.is_transitioning() || !blocked_ahead(runner, player.lane()) {
        return None;
    }

    [LaneDirection::Left, LaneDirection::Right]
        .into_iter()
        .find(|&direction| {
            player
                .lane()
                .shifted(direction)
                .is_some_and(|lane| !blocked_ahead(runner, lane))
        })
}

#[cfg(not(target_arch = "wasm32"))]
fn blocked_ahead(runner: &Runner, lane: Lane) -> bool {
    let config = runner.config();
    runner.waves().obstacles().iter().any(|obstacle| {
        let half_depth = obstacle.size(config).z / 2.0;
        obstacle.lane == lane && obstacle.z + half_depth > -LOOKAHEAD && obstacle.z - half_depth < 1.0
    })
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is lane_runner::web::WebRunner, this is just to satisfy the compiler
}
