//! Access to the world from inside a component hook

use super::component::Component;
use super::controller::{GameObjectController, GameObjectError};
use super::entity::{EntityId, GameObject};
use crate::messages::Message;

/// Handed to component hooks that may reach beyond their own component
///
/// The executing component is checked out of its slot for the lifetime of
/// the context, so sibling lookups never return it. Destruction requested
/// through the context is deferred until the outermost broadcast, creation
/// or teardown in progress has returned.
pub struct ComponentContext<'a> {
    controller: &'a mut GameObjectController,
    owner: EntityId,
    index: usize,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(controller: &'a mut GameObjectController, owner: EntityId, index: usize) -> Self {
        Self {
            controller,
            owner,
            index,
        }
    }

    /// Game object owning the executing component
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Id of the executing component
    pub fn component_id(&self) -> &str {
        self.game_object()
            .and_then(|object| object.slot(self.index))
            .map_or("", |slot| slot.id.as_str())
    }

    /// The owning game object
    pub fn game_object(&self) -> Option<&GameObject> {
        self.controller.game_object(self.owner)
    }

    /// First sibling component of type `T`
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        self.controller.component::<T>(self.owner)
    }

    /// Mutable access to the first sibling component of type `T`
    pub fn sibling_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.controller.component_mut::<T>(self.owner)
    }

    /// All sibling components of type `T`
    pub fn siblings<T: Component>(&self) -> impl Iterator<Item = &T> + '_ {
        self.controller.components::<T>(self.owner)
    }

    /// Sibling component of type `T` with the given id
    pub fn find_sibling<T: Component>(&self, id: &str) -> Option<&T> {
        self.controller.find_component::<T>(self.owner, id)
    }

    /// First component of type `T` in the owner's descendants
    pub fn component_in_children<T: Component>(&self) -> Option<&T> {
        self.controller.component_in_children::<T>(self.owner)
    }

    /// Closest ancestor game object
    pub fn parent(&self) -> Option<EntityId> {
        self.controller.parent(self.owner)
    }

    /// Top-most ancestor game object, or the owner itself
    pub fn root(&self) -> Option<EntityId> {
        self.controller.root(self.owner)
    }

    /// Create a game object from a definition as a child of the owner
    pub fn create_child(&mut self, type_name: &str) -> Result<EntityId, GameObjectError> {
        self.controller.create_with_parent(type_name, Some(self.owner))
    }

    /// Request destruction of a game object
    pub fn destroy(&mut self, entity: EntityId) {
        self.controller.destroy(entity);
    }

    /// Request destruction of the owning game object
    pub fn destroy_owner(&mut self) {
        self.controller.destroy(self.owner);
    }

    /// Broadcast a message to every game object
    pub fn broadcast(&mut self, message: &dyn Message) -> Result<(), GameObjectError> {
        self.controller.broadcast(message)
    }

    /// The controller
    pub fn controller(&self) -> &GameObjectController {
        self.controller
    }

    /// Mutable access to the controller
    pub fn controller_mut(&mut self) -> &mut GameObjectController {
        self.controller
    }
}
