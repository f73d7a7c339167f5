//! Demo components

use gameobjects::prelude::*;

use crate::messages::SimulationUpdate;

/// Rotates around an axis at a fixed rate
#[derive(Debug, Default)]
pub struct Spinner {
    axis: Vec3,
    speed: f32,
    angle: f32,
}

impl Spinner {
    /// Accumulated rotation in radians
    pub fn angle(&self) -> f32 {
        self.angle
    }
}

impl Component for Spinner {
    fn read_properties(&mut self, properties: &Properties) {
        self.axis = properties.get_vec3("axis").unwrap_or_else(|| Vec3::new(0.0, 1.0, 0.0));
        self.speed = properties.get_f32("speed").unwrap_or(1.0);
    }

    fn initialize(&mut self) {
        if self.axis.norm() > 0.0 {
            self.axis = self.axis.normalize();
        }
    }

    fn on_message_received(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        message: &dyn Message,
        _kind: MessageKind,
    ) -> bool {
        if let Some(update) = message.downcast_ref::<SimulationUpdate>() {
            self.angle = (self.angle + self.speed * update.dt) % std::f32::consts::TAU;
        }
        true
    }
}

/// Destroys its game object once its lifetime runs out
#[derive(Debug, Default)]
pub struct SelfDestruct {
    lifetime: f32,
}

impl Component for SelfDestruct {
    fn read_properties(&mut self, properties: &Properties) {
        properties.set_if_exists("lifetime", &mut self.lifetime);
    }

    fn on_message_received(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &dyn Message,
        _kind: MessageKind,
    ) -> bool {
        let Some(update) = message.downcast_ref::<SimulationUpdate>() else {
            return true;
        };

        self.lifetime -= update.dt;
        if self.lifetime <= 0.0 {
            ctx.destroy_owner();
            // Expired; nothing else on this object needs the update.
            return false;
        }
        true
    }

    fn finalize(&mut self, ctx: &mut ComponentContext<'_>) {
        log::debug!("'{}' expired", ctx.component_id());
    }
}

/// Periodically creates child game objects of a configured type
#[derive(Debug, Default)]
pub struct Spawner {
    spawn_type: String,
    interval: f32,
    elapsed: f32,
    spawned: u32,
}

impl Component for Spawner {
    fn read_properties(&mut self, properties: &Properties) {
        self.spawn_type = properties.get_str("type").unwrap_or_default().to_string();
        self.interval = properties.get_f32("interval").unwrap_or(1.0);
    }

    fn on_message_received(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &dyn Message,
        _kind: MessageKind,
    ) -> bool {
        let Some(update) = message.downcast_ref::<SimulationUpdate>() else {
            return true;
        };

        self.elapsed += update.dt;
        while self.interval > 0.0 && self.elapsed >= self.interval && !self.spawn_type.is_empty() {
            self.elapsed -= self.interval;
            log::debug!("Frame {}: spawning '{}'", update.frame, self.spawn_type);
            match ctx.create_child(&self.spawn_type) {
                Ok(_) => self.spawned += 1,
                Err(err) => {
                    log::error!("Spawner failed to create '{}': {}", self.spawn_type, err);
                    self.spawn_type.clear();
                }
            }
        }
        true
    }

    fn finalize(&mut self, _ctx: &mut ComponentContext<'_>) {
        log::info!("Spawner created {} '{}' objects", self.spawned, self.spawn_type);
    }
}

/// Reports what the level was built with
#[derive(Debug, Default)]
pub struct LevelStats {
    title: String,
}

impl Component for LevelStats {
    fn read_properties(&mut self, properties: &Properties) {
        self.title = properties.get_str("title").unwrap_or("untitled").to_string();
    }

    fn on_start(&mut self, ctx: &mut ComponentContext<'_>) {
        let spinners = ctx
            .controller()
            .components_in_children::<Spinner>(ctx.owner())
            .len();
        log::info!(
            "Level '{}' started with {} child objects and {} spinners",
            self.title,
            ctx.controller().children(ctx.owner()).len(),
            spinners
        );
    }
}

/// Register every demo component type
pub fn register(controller: &mut GameObjectController) -> Result<(), GameObjectError> {
    controller.register_component::<Spinner>("spinner")?;
    controller.register_component::<SelfDestruct>("self_destruct")?;
    controller.register_component::<Spawner>("spawner")?;
    controller.register_component::<LevelStats>("level_stats")?;
    Ok(())
}
