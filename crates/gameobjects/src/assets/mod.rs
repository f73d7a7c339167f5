//! Asset loading
//!
//! Property files and the game object definitions built from them.

pub mod definition_cache;
pub mod properties;

pub use definition_cache::{
    ComponentDeclaration, Definition, DefinitionCache, DefinitionError, DefinitionSource,
    FileDefinitionSource, MemoryDefinitionSource,
};
pub use properties::{Properties, PropertiesError};
