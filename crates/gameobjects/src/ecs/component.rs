//! Component trait, type tags and the component lifecycle
//!
//! A component is a behavior unit attached to exactly one game object for
//! its whole life. The controller drives every component through
//!
//! `read_properties` → `initialize` → `on_start` → `on_message_received`* → `finalize`
//!
//! and records progress in a [`ComponentState`] so hooks cannot run out of order.

use std::any::TypeId;
use std::fmt;

use thiserror::Error;

use super::context::ComponentContext;
use crate::assets::properties::Properties;
use crate::foundation::any::AsAny;
use crate::messages::{Message, MessageKind};

/// Identifies a component type
///
/// Used to key the component registry and each game object's component map.
/// Never used for behavior dispatch.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag(TypeId);

impl TypeTag {
    /// Tag of a concrete component type
    pub fn of<T: Component>() -> Self {
        Self(TypeId::of::<T>())
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({:?})", self.0)
    }
}

/// A behavior unit owned by a game object
///
/// Every hook has a default no-op implementation. Hooks that may reach the
/// rest of the world receive a [`ComponentContext`]; while a hook runs the
/// component is checked out of its game object, so lookups through the
/// context never return the component that is executing.
pub trait Component: AsAny {
    /// Read the property block declared for this component
    ///
    /// Invoked before [`Component::initialize`].
    fn read_properties(&mut self, _properties: &Properties) {}

    /// Initialization that depends on properties but not on other components
    fn initialize(&mut self) {}

    /// Initialization that depends on siblings, ancestors or declared children
    ///
    /// Invoked once, after every sibling and every declared child game object
    /// has been built.
    fn on_start(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Handle a broadcast message
    ///
    /// Return `false` to stop delivery to the remaining components of the same
    /// game object. Other game objects still receive the message.
    fn on_message_received(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        _message: &dyn Message,
        _kind: MessageKind,
    ) -> bool {
        true
    }

    /// Release resources and shared references
    ///
    /// Invoked exactly once before the component is dropped. Siblings are
    /// still reachable; the order in which siblings finalize is unspecified.
    fn finalize(&mut self, _ctx: &mut ComponentContext<'_>) {}
}

impl dyn Component {
    /// Downcast to a concrete component type
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete component type
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Tag of the concrete type behind this trait object
    pub fn type_tag(&self) -> TypeTag {
        TypeTag(self.as_any().type_id())
    }
}

/// Where a component is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    /// Created by its factory, properties not yet applied
    Constructed,
    /// `read_properties` and `initialize` have run
    Initialized,
    /// `on_start` has run; the component receives messages
    Started,
    /// `finalize` has run; the component is about to be dropped
    Finalized,
}

impl ComponentState {
    /// Whether moving from `self` to `next` is a legal lifecycle step
    ///
    /// `Initialized → Finalized` covers game objects torn down before their
    /// components were started.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Constructed, Self::Initialized)
                | (Self::Initialized, Self::Started)
                | (Self::Initialized, Self::Finalized)
                | (Self::Started, Self::Finalized)
        )
    }

    /// Advance to `next`, rejecting illegal steps
    pub fn advance(&mut self, next: Self) -> Result<(), LifecycleError> {
        if !self.can_advance_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether the component should receive broadcast messages
    pub fn receives_messages(self) -> bool {
        self == Self::Started
    }
}

/// Lifecycle errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// A hook was requested out of order
    #[error("invalid component lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the component was in
        from: ComponentState,
        /// State that was requested
        to: ComponentState,
    },
}
