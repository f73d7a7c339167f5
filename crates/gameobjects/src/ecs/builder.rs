//! Programmatic game object composition
//!
//! ```
//! use gameobjects::prelude::*;
//!
//! #[derive(Default)]
//! struct Health(i32);
//! impl Component for Health {}
//!
//! let mut controller = GameObjectController::new();
//! let player = controller
//!     .build()
//!     .named("player")
//!     .with(Health(100))
//!     .spawn()
//!     .unwrap();
//!
//! assert_eq!(controller.component::<Health>(player).map(|h| h.0), Some(100));
//! ```

use super::component::{Component, TypeTag};
use super::controller::{GameObjectController, GameObjectError};
use super::entity::{EntityId, ANONYMOUS_TYPE_NAME};

pub(crate) struct PendingComponent {
    pub(crate) id: Option<String>,
    pub(crate) type_name: String,
    pub(crate) component: Box<dyn Component>,
}

/// Builds one game object from component instances
///
/// The component set is fixed when [`EntityBuilder::spawn`] runs. Each
/// component then goes through the same lifecycle as one declared in a
/// definition file, with an empty property block.
pub struct EntityBuilder<'a> {
    controller: &'a mut GameObjectController,
    type_name: String,
    parent: Option<EntityId>,
    components: Vec<PendingComponent>,
}

impl<'a> EntityBuilder<'a> {
    pub(crate) fn new(controller: &'a mut GameObjectController) -> Self {
        Self {
            controller,
            type_name: ANONYMOUS_TYPE_NAME.to_string(),
            parent: None,
            components: Vec::new(),
        }
    }

    /// Type name reported by the game object and its node
    #[must_use]
    pub fn named(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Attach the game object under `parent`
    #[must_use]
    pub fn parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a component with a synthesized id
    #[must_use]
    pub fn with<T: Component>(self, component: T) -> Self {
        self.push::<T>(None, component)
    }

    /// Add a component with an explicit id
    #[must_use]
    pub fn with_id<T: Component>(self, id: impl Into<String>, component: T) -> Self {
        self.push::<T>(Some(id.into()), component)
    }

    /// Build the game object
    pub fn spawn(self) -> Result<EntityId, GameObjectError> {
        self.controller
            .spawn_composed(&self.type_name, self.parent, self.components)
    }

    fn push<T: Component>(mut self, id: Option<String>, component: T) -> Self {
        let type_name = self
            .controller
            .registry()
            .name_of(TypeTag::of::<T>())
            .map_or_else(|| std::any::type_name::<T>().to_string(), str::to_string);
        self.components.push(PendingComponent {
            id,
            type_name,
            component: Box::new(component),
        });
        self
    }
}
