//! Dynamic type helpers for trait objects
//!
//! Components, messages and node user data are stored as trait objects.
//! [`AsAny`] gives every such trait a checked path back to the concrete type.

use std::any::Any;

/// Upcast to [`Any`] for checked downcasting
///
/// Implemented for every `'static` type. Call it on the trait object itself
/// (`(*boxed).as_any()`), never on the `Box`, or the box's own type id is used.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert a boxed value into `Box<dyn Any>`
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
