//! Game object definitions and the cache that holds them
//!
//! A definition is the parsed, validated blueprint for one game object type:
//! which components to build (in order, with their property blocks) and
//! which child types to build under it. Definitions are loaded once, at
//! controller initialization, from every file in the definitions directory
//! whose extension matches. The file stem is the type name, so `enemy.go`
//! defines type `enemy`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use super::properties::{Properties, PropertiesError};
use crate::ecs::component::TypeTag;
use crate::ecs::registry::ComponentRegistry;

/// Top-level property naming a child game object type
pub const CHILD_PROPERTY: &str = "child";

/// Definition loading errors
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The definitions directory could not be read
    #[error("failed to read definitions from '{path}': {source}")]
    Io {
        /// Directory or file being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A definition file is malformed
    #[error("failed to parse definition '{path}': {source}")]
    Properties {
        /// Offending file
        path: PathBuf,
        /// Parser error
        #[source]
        source: PropertiesError,
    },

    /// Two definitions claim the same type name
    #[error("duplicate game object definition '{type_name}' found in '{path}'")]
    DuplicateDefinition {
        /// Contested type name
        type_name: String,
        /// File carrying the second definition
        path: PathBuf,
    },

    /// A definition declares a component type nobody registered
    #[error("unknown component type '{component}' in definition '{type_name}' ({path})")]
    UnknownComponentType {
        /// Definition being loaded
        type_name: String,
        /// Unregistered component name
        component: String,
        /// File carrying the definition
        path: PathBuf,
    },

    /// A definition lists a child type that has no definition
    #[error("definition '{type_name}' lists unknown child type '{child}'")]
    UnknownChild {
        /// Definition listing the child
        type_name: String,
        /// Missing child type
        child: String,
    },

    /// Child types loop back to a type already being built
    #[error("definition '{type_name}' contains itself through children: {}", path.join(" -> "))]
    CyclicChild {
        /// First type found on the loop
        type_name: String,
        /// Child chain from `type_name` back to itself
        path: Vec<String>,
    },

    /// A definition file name has no usable stem
    #[error("invalid definition file name '{0}'")]
    InvalidFileName(PathBuf),
}

/// One component entry of a definition
#[derive(Debug, Clone)]
pub struct ComponentDeclaration {
    tag: TypeTag,
    type_name: String,
    properties: Properties,
}

impl ComponentDeclaration {
    /// Registered type of the component
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Display name the component was declared under
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Explicit component id from the namespace header
    pub fn id(&self) -> Option<&str> {
        self.properties.id()
    }

    /// Property block handed to `read_properties`
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Immutable blueprint for one game object type
#[derive(Debug, Clone)]
pub struct Definition {
    type_name: String,
    source: PathBuf,
    components: Vec<ComponentDeclaration>,
    children: Vec<String>,
}

impl Definition {
    /// Build a definition from a parsed file
    ///
    /// Every top-level namespace must name a registered component type.
    /// Top-level `child = <type>` properties list child types in order.
    pub fn from_properties(
        type_name: impl Into<String>,
        source: impl Into<PathBuf>,
        root: &Properties,
        registry: &ComponentRegistry,
    ) -> Result<Self, DefinitionError> {
        let type_name = type_name.into();
        let source = source.into();

        let children = root
            .properties()
            .filter(|(name, _)| *name == CHILD_PROPERTY)
            .map(|(_, value)| value.to_string())
            .collect();

        let mut components = Vec::new();
        for namespace in root.namespaces() {
            let Some(info) = registry.by_name(namespace.namespace()) else {
                return Err(DefinitionError::UnknownComponentType {
                    type_name,
                    component: namespace.namespace().to_string(),
                    path: source,
                });
            };
            components.push(ComponentDeclaration {
                tag: info.tag(),
                type_name: info.name().to_string(),
                properties: namespace.clone(),
            });
        }

        Ok(Self {
            type_name,
            source,
            components,
            children,
        })
    }

    /// Game object type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// File the definition was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Component declarations in file order
    pub fn components(&self) -> &[ComponentDeclaration] {
        &self.components
    }

    /// Child game object types in file order
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

/// Strategy for locating and reading definition files
///
/// The default reads the file system. Hosts such as editors can supply
/// their own through
/// [`register_definition_source`](crate::ecs::GameObjectController::register_definition_source).
pub trait DefinitionSource {
    /// Definition files in `dir` with the given extension, in a stable order
    ///
    /// A missing directory yields no files.
    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DefinitionError> {
        if !dir.is_dir() {
            log::warn!("Definitions directory '{}' does not exist", dir.display());
            return Ok(Vec::new());
        }

        let io_error = |source| DefinitionError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read and parse one definition file
    fn load(&self, path: &Path) -> Result<Properties, DefinitionError>;
}

/// Reads definitions from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDefinitionSource;

impl DefinitionSource for FileDefinitionSource {
    fn load(&self, path: &Path) -> Result<Properties, DefinitionError> {
        Properties::load(path).map_err(|source| DefinitionError::Properties {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serves definitions from in-memory text, keyed by type name
#[derive(Debug, Default, Clone)]
pub struct MemoryDefinitionSource {
    definitions: BTreeMap<String, String>,
}

impl MemoryDefinitionSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition (builder pattern)
    pub fn with(mut self, type_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(type_name, text);
        self
    }

    /// Add or replace a definition
    pub fn insert(&mut self, type_name: impl Into<String>, text: impl Into<String>) {
        self.definitions.insert(type_name.into(), text.into());
    }
}

impl DefinitionSource for MemoryDefinitionSource {
    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DefinitionError> {
        Ok(self
            .definitions
            .keys()
            .map(|type_name| dir.join(format!("{type_name}.{extension}")))
            .collect())
    }

    fn load(&self, path: &Path) -> Result<Properties, DefinitionError> {
        let text = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|type_name| self.definitions.get(type_name))
            .ok_or_else(|| DefinitionError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such definition"),
            })?;
        Properties::parse(text).map_err(|source| DefinitionError::Properties {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Type name → definition cache
#[derive(Debug, Default)]
pub struct DefinitionCache {
    definitions: HashMap<String, Rc<Definition>>,
}

impl DefinitionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every definition `source` lists for `dir`, then validate the cache
    ///
    /// Returns the number of definitions loaded by this call.
    pub fn load_dir(
        &mut self,
        source: &dyn DefinitionSource,
        dir: &Path,
        extension: &str,
        registry: &ComponentRegistry,
    ) -> Result<usize, DefinitionError> {
        let files = source.list(dir, extension)?;
        for path in &files {
            let type_name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| DefinitionError::InvalidFileName(path.clone()))?;
            let properties = source.load(path)?;
            let definition = Definition::from_properties(type_name, path, &properties, registry)?;

            log::debug!(
                "Loaded definition '{}' ({} components, {} children)",
                definition.type_name(),
                definition.components().len(),
                definition.children().len()
            );
            self.insert(definition)?;
        }

        self.validate()?;
        Ok(files.len())
    }

    /// Add a definition, rejecting duplicates
    pub fn insert(&mut self, definition: Definition) -> Result<(), DefinitionError> {
        if self.definitions.contains_key(definition.type_name()) {
            return Err(DefinitionError::DuplicateDefinition {
                type_name: definition.type_name,
                path: definition.source,
            });
        }
        self.definitions
            .insert(definition.type_name.clone(), Rc::new(definition));
        Ok(())
    }

    /// Check that every listed child type has a definition and that no type
    /// contains itself through its children
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for definition in self.definitions.values() {
            if let Some(child) = definition
                .children()
                .iter()
                .find(|child| !self.definitions.contains_key(child.as_str()))
            {
                return Err(DefinitionError::UnknownChild {
                    type_name: definition.type_name().to_string(),
                    child: child.clone(),
                });
            }
        }

        let mut finished = HashSet::new();
        let mut chain = Vec::new();
        for type_name in self.type_names() {
            self.check_acyclic(type_name, &mut chain, &mut finished)?;
        }
        Ok(())
    }

    fn check_acyclic<'a>(
        &'a self,
        type_name: &'a str,
        chain: &mut Vec<&'a str>,
        finished: &mut HashSet<&'a str>,
    ) -> Result<(), DefinitionError> {
        if finished.contains(type_name) {
            return Ok(());
        }
        if let Some(start) = chain.iter().position(|&name| name == type_name) {
            let mut path: Vec<String> = chain[start..].iter().map(ToString::to_string).collect();
            path.push(type_name.to_string());
            return Err(DefinitionError::CyclicChild {
                type_name: type_name.to_string(),
                path,
            });
        }
        let Some(definition) = self.definitions.get(type_name) else {
            return Ok(());
        };

        chain.push(type_name);
        for child in definition.children() {
            self.check_acyclic(child, chain, finished)?;
        }
        chain.pop();
        finished.insert(type_name);
        Ok(())
    }

    /// Definition for a type name
    pub fn get(&self, type_name: &str) -> Option<Rc<Definition>> {
        self.definitions.get(type_name).cloned()
    }

    /// Whether a definition exists for a type name
    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    /// Number of cached definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Cached type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Drop every cached definition
    pub fn clear(&mut self) {
        self.definitions.clear();
    }
}
