//! Component registry - maps type tags to component factories.
//!
//! Every component type that definition files may reference is registered
//! once, before the controller initializes, under the display name used as
//! the namespace key in definition files.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::component::{Component, TypeTag};

/// Zero-argument factory producing a default-constructed component
pub type ComponentFactory = Box<dyn Fn() -> Box<dyn Component>>;

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The component type was already registered
    #[error("component type '{name}' is already registered as '{existing}'")]
    DuplicateType {
        /// Name of the rejected registration
        name: String,
        /// Name the type was first registered under
        existing: String,
    },

    /// Another component type already uses this display name
    #[error("component name '{name}' is already registered")]
    DuplicateName {
        /// The contested display name
        name: String,
    },

    /// Registration attempted after boot completed
    #[error("cannot register component '{name}' while the controller is initialized")]
    Frozen {
        /// Name of the rejected registration
        name: String,
    },
}

/// Registry entry for one component type
pub struct ComponentTypeInfo {
    name: String,
    tag: TypeTag,
    factory: ComponentFactory,
}

impl ComponentTypeInfo {
    /// Display name used in definition files
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag of the registered type
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Create a fresh, default-constructed instance
    pub fn instantiate(&self) -> Box<dyn Component> {
        (self.factory)()
    }
}

impl fmt::Debug for ComponentTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTypeInfo")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Type tag → (display name, factory) mapping
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    types: HashMap<TypeTag, ComponentTypeInfo>,
    names: HashMap<String, TypeTag>,
    frozen: bool,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under a display name
    pub fn register<T: Component + Default>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.frozen {
            return Err(RegistryError::Frozen { name });
        }

        let tag = TypeTag::of::<T>();
        if let Some(existing) = self.types.get(&tag) {
            return Err(RegistryError::DuplicateType {
                name,
                existing: existing.name.clone(),
            });
        }
        if self.names.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }

        log::debug!("Registered component type '{}'", name);
        self.names.insert(name.clone(), tag);
        self.types.insert(
            tag,
            ComponentTypeInfo {
                name,
                tag,
                factory: Box::new(|| Box::new(T::default())),
            },
        );
        Ok(())
    }

    /// Look up a registered type by tag
    pub fn get(&self, tag: TypeTag) -> Option<&ComponentTypeInfo> {
        self.types.get(&tag)
    }

    /// Look up a registered type by display name
    pub fn by_name(&self, name: &str) -> Option<&ComponentTypeInfo> {
        self.names.get(name).and_then(|tag| self.types.get(tag))
    }

    /// Display name of a registered type
    pub fn name_of(&self, tag: TypeTag) -> Option<&str> {
        self.get(tag).map(ComponentTypeInfo::name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether registration is currently rejected
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
    }
}
