//! Broadcast messages and the message pool
//!
//! Messages are plain value objects. Every message type is its own kind;
//! declaring one is a struct plus an empty [`Message`] impl, which
//! [`game_message!`](crate::game_message) writes for you:
//!
//! ```
//! use gameobjects::game_message;
//!
//! game_message! {
//!     /// Advance the simulation
//!     pub struct Tick {
//!         pub dt: f32,
//!     }
//! }
//!
//! game_message! {
//!     /// Pause everything
//!     pub struct Pause;
//! }
//! ```
//!
//! The controller keeps one pooled instance per kind for
//! [`send`](crate::ecs::GameObjectController::send). While a kind is being
//! broadcast it is marked in flight, and a second broadcast of the same kind
//! from inside a handler is rejected.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::foundation::any::AsAny;

/// Identifies a message type
#[derive(Clone, Copy)]
pub struct MessageKind {
    id: TypeId,
    name: &'static str,
}

impl MessageKind {
    /// Kind of a concrete message type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type name of the message, for diagnostics
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Whether this is the kind of `T`
    pub fn is<T: ?Sized + 'static>(self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for MessageKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageKind {}

impl Hash for MessageKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageKind({})", self.name)
    }
}

/// A broadcast message
///
/// A message is only valid for the duration of the broadcast that delivers
/// it; handlers must copy out anything they want to keep.
pub trait Message: AsAny + fmt::Debug {
    /// Kind of this message
    fn kind(&self) -> MessageKind {
        MessageKind::of::<Self>()
    }
}

impl dyn Message {
    /// Downcast to a concrete message type
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the message is a `T`
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// One reusable instance per message kind, plus the set of kinds in flight
#[derive(Debug, Default)]
pub struct MessagePool {
    instances: HashMap<MessageKind, Box<dyn Message>>,
    in_flight: HashSet<MessageKind>,
}

impl MessagePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a broadcast of `kind` is currently running
    pub fn is_in_flight(&self, kind: MessageKind) -> bool {
        self.in_flight.contains(&kind)
    }

    /// The pooled instance of `M`, if one was created
    pub fn pooled<M: Message>(&self) -> Option<&M> {
        self.instances
            .get(&MessageKind::of::<M>())
            .and_then(|message| message.downcast_ref::<M>())
    }

    /// Number of kinds with a pooled instance
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance has been pooled yet
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Mark `kind` in flight; `false` if it already was
    pub(crate) fn begin(&mut self, kind: MessageKind) -> bool {
        self.in_flight.insert(kind)
    }

    pub(crate) fn end(&mut self, kind: MessageKind) {
        self.in_flight.remove(&kind);
    }

    /// Check out the pooled instance of `M`, creating it on first use
    pub(crate) fn take<M: Message + Default>(&mut self) -> Box<M> {
        self.instances
            .remove(&MessageKind::of::<M>())
            .and_then(|message| message.into_any().downcast::<M>().ok())
            .unwrap_or_default()
    }

    /// Return a checked-out instance to the pool
    pub(crate) fn restore<M: Message>(&mut self, message: Box<M>) {
        self.instances.insert(MessageKind::of::<M>(), message);
    }

    pub(crate) fn clear(&mut self) {
        self.instances.clear();
        self.in_flight.clear();
    }
}

/// Declare a message type
///
/// Expands to a struct deriving `Debug`, `Clone` and `Default` plus its
/// [`Message`] impl. Fields are optional.
#[macro_export]
macro_rules! game_message {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name;

        impl $crate::messages::Message for $name {}
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$field_meta:meta])* $field_vis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name {
            $($(#[$field_meta])* $field_vis $field: $ty),*
        }

        impl $crate::messages::Message for $name {}
    };
}
