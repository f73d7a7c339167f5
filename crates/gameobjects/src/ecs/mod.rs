//! Game object / component model
//!
//! Game objects are containers of components tied to scene nodes. The
//! [`GameObjectController`] builds them from definitions or from component
//! instances, delivers broadcast messages to them, and tears them down.

pub mod builder;
pub mod component;
pub mod context;
pub mod controller;
pub mod entity;
pub mod registry;

pub use builder::EntityBuilder;
pub use component::{Component, ComponentState, LifecycleError, TypeTag};
pub use context::ComponentContext;
pub use controller::{GameObjectController, GameObjectError};
pub use entity::{
    EntityId, EntityTag, GameObject, ANONYMOUS_TYPE_NAME, GAME_OBJECT_NODE_USER_DATA_ID,
};
pub use registry::{ComponentFactory, ComponentRegistry, ComponentTypeInfo, RegistryError};

#[cfg(test)]
mod tests;
