//! Cannon Blast headless runner
//!
//! Plays the level chain with a simple autopilot at a fixed frame rate and
//! logs what happens. Usage: `cannon-blast [levels.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
use cannon_blast::{
    LevelCatalog, Result,
    sim::{LevelComplete, LevelFailed, LevelOutcome, TickInput, Viewport, World},
};

/// Simulated seconds a level may run before the runner gives up on it
#[cfg(not(target_arch = "wasm32"))]
const LEVEL_TIME_CAP: f32 = 300.0;

#[cfg(not(target_arch = "wasm32"))]
const FRAME_DT: f32 = 1.0 / 60.0;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Cannon Blast (headless) starting...");

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The web build embeds the library directly
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let catalog = match args.next() {
        Some(path) => LevelCatalog::load(&path)?,
        None => LevelCatalog::builtin()?,
    };
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x00C0_FFEE);

    let mut world = World::new(catalog, Some(Viewport::portrait()), seed)?;
    world.bus_mut().subscribe(|e: &LevelComplete| {
        log::info!("Level {} complete with score {}", e.level_number, e.score);
    });
    world.bus_mut().subscribe(|e: &LevelFailed| {
        log::info!("Level {} failed with score {}", e.level_number, e.score);
    });

    world.load_first_level()?;
    loop {
        let outcome = play_level(&mut world);
        let level = world.current_level().map_or(0, |level| level.level_number);
        match outcome {
            Some(LevelOutcome::Complete) => {
                if !world.load_next_level()? {
                    log::info!("All levels cleared");
                    break;
                }
            }
            Some(LevelOutcome::Failed) => break,
            None => {
                log::warn!("Level {} still running after {}s, stopping", level, LEVEL_TIME_CAP);
                break;
            }
        }
    }

    log::info!(
        "Finished after {} ticks: {} points, {} coins",
        world.time_ticks(),
        world.score_keeper().score(),
        world.score_keeper().coins()
    );
    Ok(())
}

/// Drive the current level until it ends or the time cap runs out
#[cfg(not(target_arch = "wasm32"))]
fn play_level(world: &mut World) -> Option<LevelOutcome> {
    let mut elapsed = 0.0;
    while elapsed < LEVEL_TIME_CAP {
        let input = autopilot(world);
        world.advance(FRAME_DT, &input);
        elapsed += FRAME_DT;

        if let Some(outcome) = world.coordinator().outcome() {
            return Some(outcome);
        }
    }
    None
}

/// Track the lowest live obstacle and keep the trigger held
#[cfg(not(target_arch = "wasm32"))]
fn autopilot(world: &World) -> TickInput {
    let target_x = world
        .obstacles()
        .iter_active()
        .filter(|o| o.value.is_active())
        .min_by(|a, b| a.transform.position.y.total_cmp(&b.transform.position.y))
        .map(|o| o.transform.position.x);

    TickInput {
        firing: true,
        target_x,
        axis: 0.0,
    }
}
