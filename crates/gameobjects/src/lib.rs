//! # Game Objects
//!
//! A data-driven entity/component object model.
//!
//! ## Features
//!
//! - **Components**: Reusable behavior units with an explicit lifecycle
//! - **Definitions**: Whole game object trees described in property files
//! - **Broadcasts**: Messages walked through the scene tree in document order
//! - **Lifecycle Guard**: Handlers may destroy game objects mid-broadcast
//! - **Message Pool**: One reusable instance per message kind
//!
//! ## Quick Start
//!
//! ```rust
//! use gameobjects::prelude::*;
//!
//! game_message! {
//!     /// Simulation step
//!     pub struct Tick {
//!         pub dt: f32,
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Fuse {
//!     seconds: f32,
//! }
//!
//! impl Component for Fuse {
//!     fn read_properties(&mut self, properties: &Properties) {
//!         properties.set_if_exists("seconds", &mut self.seconds);
//!     }
//!
//!     fn on_message_received(
//!         &mut self,
//!         ctx: &mut ComponentContext<'_>,
//!         message: &dyn Message,
//!         _kind: MessageKind,
//!     ) -> bool {
//!         if let Some(tick) = message.downcast_ref::<Tick>() {
//!             self.seconds -= tick.dt;
//!             if self.seconds <= 0.0 {
//!                 ctx.destroy_owner();
//!             }
//!         }
//!         true
//!     }
//! }
//!
//! fn main() -> Result<(), GameObjectError> {
//!     let mut controller = GameObjectController::new();
//!     controller.register_component::<Fuse>("fuse")?;
//!     controller.register_definition_source(
//!         MemoryDefinitionSource::new().with("bomb", "fuse\n{\n    seconds = 0.5\n}\n"),
//!     );
//!     controller.initialize()?;
//!
//!     let bomb = controller.create("bomb")?;
//!     controller.send::<Tick>(|tick| tick.dt = 1.0)?;
//!     assert!(!controller.contains(bomb));
//!
//!     controller.finalize()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod ecs;
pub mod foundation;
pub mod messages;
pub mod scene;

/// Common imports for game object users
pub mod prelude {
    pub use crate::{
        assets::{
            Definition, DefinitionSource, FileDefinitionSource, MemoryDefinitionSource,
            Properties,
        },
        config::{Config, ControllerConfig},
        ecs::{
            Component, ComponentContext, ComponentState, EntityId, GameObject,
            GameObjectController, GameObjectError, TypeTag,
        },
        foundation::math::{Vec2, Vec3},
        game_message,
        messages::{Message, MessageKind},
        scene::{NodeId, Scene},
    };
}
