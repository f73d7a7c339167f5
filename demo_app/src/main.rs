//! Game objects demo application
//!
//! Builds a small level from the definition files in `res/gameobjects` and
//! drives it with a fixed number of simulation updates.
//!
//! Usage: `gameobjects_demo [config.toml|config.ron]`

mod components;
mod messages;

use gameobjects::config::{Config, ControllerConfig};
use gameobjects::ecs::GameObjectController;
use gameobjects::foundation::logging;

use components::Spinner;
use messages::SimulationUpdate;

const FRAMES: u32 = 12;
const FRAME_TIME: f32 = 0.25;

fn load_config() -> Result<ControllerConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ControllerConfig::load_from_file(path)?),
        None => Ok(ControllerConfig::new().with_definitions_dir(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/res/gameobjects"
        ))),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);

    log::info!("Starting game objects demo");
    let mut controller = GameObjectController::with_config(config);
    components::register(&mut controller)?;
    controller.initialize()?;

    let level = controller.create("level")?;
    for frame in 0..FRAMES {
        controller.send::<SimulationUpdate>(|update| {
            update.dt = FRAME_TIME;
            update.frame = frame;
        })?;
        log::info!(
            "Frame {}: {} game objects alive",
            frame,
            controller.entity_count()
        );
    }

    if let Some(player) = controller.find("player") {
        if let Some(spinner) = controller.component::<Spinner>(player) {
            log::info!("Player spun to {:.2} rad", spinner.angle());
        }
    }
    log::info!(
        "Level has {} children at shutdown",
        controller.children(level).len()
    );

    controller.finalize()?;
    log::info!("Game objects demo completed successfully");
    Ok(())
}
