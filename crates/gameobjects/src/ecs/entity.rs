//! Game object implementation
//!
//! A game object is a fixed, ordered set of components tied to one scene node.
//! Objects are created and destroyed only by the
//! [`GameObjectController`](super::GameObjectController).

use std::collections::HashMap;

use super::component::{Component, ComponentState, TypeTag};
use crate::foundation::collections::new_key_type;
use crate::scene::{NodeId, NodeUserData};

new_key_type! {
    /// Handle to a live game object
    pub struct EntityId;
}

/// Node user-data id claimed by game objects
pub const GAME_OBJECT_NODE_USER_DATA_ID: i32 = 1;

/// Type name of game objects built without a definition
pub const ANONYMOUS_TYPE_NAME: &str = "annon";

/// Node payload linking a scene node back to its game object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTag(pub EntityId);

impl NodeUserData for EntityTag {
    fn node_user_data_id(&self) -> i32 {
        GAME_OBJECT_NODE_USER_DATA_ID
    }
}

/// One attached component and its bookkeeping
///
/// `component` is `None` while one of the component's hooks is running.
pub(crate) struct ComponentSlot {
    pub(crate) id: String,
    pub(crate) tag: TypeTag,
    pub(crate) type_name: String,
    pub(crate) state: ComponentState,
    pub(crate) component: Option<Box<dyn Component>>,
}

/// A game entity
pub struct GameObject {
    id: EntityId,
    type_name: String,
    node: NodeId,
    slots: Vec<ComponentSlot>,
    by_tag: HashMap<TypeTag, Vec<usize>>,
    dying: bool,
}

impl GameObject {
    pub(crate) fn new(id: EntityId, type_name: String, node: NodeId) -> Self {
        Self {
            id,
            type_name,
            node,
            slots: Vec::new(),
            by_tag: HashMap::new(),
            dying: false,
        }
    }

    /// Handle of this object
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Definition type this object was built from, or `annon`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Scene node this object is attached to
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Component ids in declaration order
    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.id.as_str())
    }

    /// Display names of the attached component types in declaration order
    pub fn component_type_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.type_name.as_str())
    }

    /// Lifecycle state of the first component with the given id
    pub fn component_state(&self, id: &str) -> Option<ComponentState> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.state)
    }

    /// Whether a teardown of this object has started
    pub fn is_dying(&self) -> bool {
        self.dying
    }

    /// First component of type `T`
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.components::<T>().next()
    }

    /// Mutable access to the first component of type `T`
    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let index = self
            .by_tag
            .get(&TypeTag::of::<T>())?
            .iter()
            .copied()
            .find(|&index| self.slots[index].component.is_some())?;
        self.slots[index].component.as_deref_mut()?.downcast_mut::<T>()
    }

    /// All components of type `T` in declaration order
    pub fn components<T: Component>(&self) -> impl Iterator<Item = &T> + '_ {
        self.by_tag
            .get(&TypeTag::of::<T>())
            .into_iter()
            .flatten()
            .filter_map(move |&index| self.slots[index].component.as_deref()?.downcast_ref::<T>())
    }

    /// Whether a component of type `T` is attached
    pub fn has_component<T: Component>(&self) -> bool {
        self.by_tag.contains_key(&TypeTag::of::<T>())
    }

    /// Component of type `T` with the given id
    pub fn find_component<T: Component>(&self, id: &str) -> Option<&T> {
        self.slots
            .iter()
            .filter(|slot| slot.id == id)
            .find_map(|slot| slot.component.as_deref()?.downcast_ref::<T>())
    }

    /// Mutable access to the component of type `T` with the given id
    pub fn find_component_mut<T: Component>(&mut self, id: &str) -> Option<&mut T> {
        let tag = TypeTag::of::<T>();
        let index = self
            .slots
            .iter()
            .position(|slot| slot.id == id && slot.tag == tag && slot.component.is_some())?;
        self.slots[index].component.as_deref_mut()?.downcast_mut::<T>()
    }

    pub(crate) fn attach(
        &mut self,
        id: String,
        type_name: String,
        state: ComponentState,
        component: Box<dyn Component>,
    ) {
        let tag = component.type_tag();
        let index = self.slots.len();
        self.by_tag.entry(tag).or_default().push(index);
        self.slots.push(ComponentSlot {
            id,
            tag,
            type_name,
            state,
            component: Some(component),
        });
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&ComponentSlot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut ComponentSlot> {
        self.slots.get_mut(index)
    }

    /// Check a component out of its slot for the duration of a hook
    pub(crate) fn take_component(&mut self, index: usize) -> Option<Box<dyn Component>> {
        self.slots.get_mut(index)?.component.take()
    }

    pub(crate) fn put_component(&mut self, index: usize, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.component = Some(component);
        }
    }

    pub(crate) fn set_dying(&mut self) {
        self.dying = true;
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("node", &self.node)
            .field("components", &self.component_ids().collect::<Vec<_>>())
            .field("dying", &self.dying)
            .finish()
    }
}
