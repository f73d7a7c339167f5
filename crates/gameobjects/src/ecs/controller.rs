//! # Game Object Controller
//!
//! Owns every game object and the systems they are built from: the scene
//! node tree, the component registry, the definition cache and the message
//! pool. All creation, destruction and message delivery goes through it.
//!
//! ## Lifecycle guard
//!
//! Component hooks may call back into the controller. Broadcasts, creations
//! and teardowns each run inside a lifecycle-guard scope; while any scope is
//! open, [`GameObjectController::destroy`] only records the request. The
//! recorded game objects are torn down when the outermost scope closes, so
//! the tree being walked is never mutated underneath the walk.

use thiserror::Error;

use super::builder::{EntityBuilder, PendingComponent};
use super::component::{Component, ComponentState, LifecycleError};
use super::context::ComponentContext;
use super::entity::{
    EntityId, EntityTag, GameObject, ANONYMOUS_TYPE_NAME, GAME_OBJECT_NODE_USER_DATA_ID,
};
use super::registry::{ComponentRegistry, RegistryError};
use crate::assets::definition_cache::{
    Definition, DefinitionCache, DefinitionError, DefinitionSource, FileDefinitionSource,
};
use crate::assets::properties::Properties;
use crate::config::{ConfigError, ControllerConfig};
use crate::foundation::collections::HandleMap;
use crate::messages::{Message, MessageKind, MessagePool};
use crate::scene::{NodeId, Scene};

/// Game object controller errors
#[derive(Debug, Error)]
pub enum GameObjectError {
    /// The operation needs loaded definitions
    #[error("game object controller is not initialized")]
    NotInitialized,

    /// `initialize` was called twice without `finalize`
    #[error("game object controller is already initialized")]
    AlreadyInitialized,

    /// No definition exists for the requested type
    #[error("unknown game object type '{0}'")]
    UnknownDefinition(String),

    /// A component type is not registered
    #[error("unknown component type '{0}'")]
    UnknownComponentType(String),

    /// The game object does not exist (or no longer exists)
    #[error("unknown game object {0:?}")]
    UnknownEntity(EntityId),

    /// A message kind was broadcast again while already being broadcast
    #[error("message '{0}' is already being broadcast")]
    ReentrantBroadcast(&'static str),

    /// `finalize` was called from inside a component hook
    #[error("cannot finalize while component callbacks are running")]
    BroadcastInFlight,

    /// Component registration failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Definition loading failed
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Invalid controller configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A component hook was requested out of order
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Owner of every game object
pub struct GameObjectController {
    config: ControllerConfig,
    scene: Scene,
    registry: ComponentRegistry,
    definitions: DefinitionCache,
    definition_source: Box<dyn DefinitionSource>,
    entities: HandleMap<EntityId, GameObject>,
    messages: MessagePool,
    callback_depth: usize,
    pending_removals: Vec<EntityId>,
    initialized: bool,
}

impl GameObjectController {
    /// Create a controller with default configuration
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Create a controller with custom configuration
    pub fn with_config(config: ControllerConfig) -> Self {
        Self {
            config,
            scene: Scene::new(),
            registry: ComponentRegistry::new(),
            definitions: DefinitionCache::new(),
            definition_source: Box::new(FileDefinitionSource),
            entities: HandleMap::with_key(),
            messages: MessagePool::new(),
            callback_depth: 0,
            pending_removals: Vec::new(),
            initialized: false,
        }
    }

    /// Register a component type under the name definition files use
    ///
    /// Must happen before [`GameObjectController::initialize`].
    pub fn register_component<T: Component + Default>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<(), GameObjectError> {
        self.registry.register::<T>(name)?;
        Ok(())
    }

    /// Replace the strategy used to list and read definition files
    ///
    /// Takes effect at the next [`GameObjectController::initialize`].
    pub fn register_definition_source(&mut self, source: impl DefinitionSource + 'static) {
        self.definition_source = Box::new(source);
    }

    /// Load every definition and freeze the component registry
    ///
    /// No game object is instantiated. Fails on unknown component types,
    /// duplicate definitions and child types without a definition.
    pub fn initialize(&mut self) -> Result<(), GameObjectError> {
        if self.initialized {
            return Err(GameObjectError::AlreadyInitialized);
        }
        self.config.validate()?;

        let loaded = self.definitions.load_dir(
            &*self.definition_source,
            &self.config.definitions_dir,
            &self.config.definition_extension,
            &self.registry,
        );
        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                self.definitions.clear();
                return Err(err.into());
            }
        };

        self.registry.freeze();
        self.initialized = true;
        log::info!(
            "Game object controller initialized: {} definitions from '{}', {} component types",
            loaded,
            self.config.definitions_dir.display(),
            self.registry.len()
        );
        Ok(())
    }

    /// Destroy every game object and drop every definition
    ///
    /// Registered component types survive, so the controller can be
    /// initialized again.
    pub fn finalize(&mut self) -> Result<(), GameObjectError> {
        if self.callback_depth > 0 {
            return Err(GameObjectError::BroadcastInFlight);
        }
        if !self.initialized {
            return Err(GameObjectError::NotInitialized);
        }

        let top_level: Vec<EntityId> = self
            .entities()
            .into_iter()
            .filter(|&entity| self.parent(entity).is_none())
            .collect();
        let destroyed = self.entities.len();
        for entity in top_level {
            self.destroy(entity);
        }
        if !self.entities.is_empty() {
            log::warn!(
                "{} game objects were created during finalization and are dropped without teardown",
                self.entities.len()
            );
            self.entities.clear();
        }

        self.scene.clear();
        self.definitions.clear();
        self.messages.clear();
        self.pending_removals.clear();
        self.registry.unfreeze();
        self.initialized = false;
        log::info!(
            "Game object controller finalized: {} game objects destroyed",
            destroyed
        );
        Ok(())
    }

    /// Create a top-level game object from its definition
    pub fn create(&mut self, type_name: &str) -> Result<EntityId, GameObjectError> {
        self.create_with_parent(type_name, None)
    }

    /// Create a game object from its definition, optionally under a parent
    ///
    /// Components are built in declaration order, then every declared child
    /// is created recursively, then `on_start` runs on this object's
    /// components. Destroys requested from those hooks run once the whole
    /// object is built, before this returns.
    pub fn create_with_parent(
        &mut self,
        type_name: &str,
        parent: Option<EntityId>,
    ) -> Result<EntityId, GameObjectError> {
        if !self.initialized {
            return Err(GameObjectError::NotInitialized);
        }
        let definition = self
            .definitions
            .get(type_name)
            .ok_or_else(|| GameObjectError::UnknownDefinition(type_name.to_string()))?;
        self.check_parent(parent)?;

        self.with_lifecycle_guard(|this| this.instantiate(&definition, parent))
    }

    /// Create an empty game object that has no definition
    pub fn create_anonymous(
        &mut self,
        parent: Option<EntityId>,
    ) -> Result<EntityId, GameObjectError> {
        self.check_parent(parent)?;
        Ok(self.spawn_entity(ANONYMOUS_TYPE_NAME, parent))
    }

    /// Compose a game object from component instances
    pub fn build(&mut self) -> EntityBuilder<'_> {
        EntityBuilder::new(self)
    }

    /// Destroy a game object and every game object below it
    ///
    /// Children are destroyed first. Then every component is finalized, and
    /// only after all of them have been finalized are they released along
    /// with the node. While a lifecycle-guard scope is open the request is
    /// recorded and carried out when the outermost scope closes. Destroying
    /// an unknown game object does nothing.
    pub fn destroy(&mut self, entity: EntityId) {
        let Some(object) = self.entities.get_mut(entity) else {
            log::warn!("Ignoring destroy of unknown game object {:?}", entity);
            return;
        };
        if object.is_dying() {
            return;
        }

        if self.callback_depth > 0 {
            if !self.pending_removals.contains(&entity) {
                log::debug!(
                    "Deferring destroy of '{}' ({:?})",
                    object.type_name(),
                    entity
                );
                self.pending_removals.push(entity);
            }
            return;
        }

        object.set_dying();
        self.teardown(entity);
    }

    /// Deliver a message to every game object in document order
    ///
    /// Game objects created while the broadcast runs do not receive it.
    pub fn broadcast(&mut self, message: &dyn Message) -> Result<(), GameObjectError> {
        let nodes = self.scene.document_order();
        self.dispatch(message, nodes)
    }

    /// Deliver a message to one game object and its descendants
    pub fn broadcast_to(
        &mut self,
        entity: EntityId,
        message: &dyn Message,
    ) -> Result<(), GameObjectError> {
        let node = self
            .entities
            .get(entity)
            .map(GameObject::node)
            .ok_or(GameObjectError::UnknownEntity(entity))?;
        let nodes = self.scene.subtree_order(node);
        self.dispatch(message, nodes)
    }

    /// Fill the pooled instance of `M` and broadcast it
    pub fn send<M: Message + Default>(
        &mut self,
        fill: impl FnOnce(&mut M),
    ) -> Result<(), GameObjectError> {
        let kind = MessageKind::of::<M>();
        if self.messages.is_in_flight(kind) {
            return Err(GameObjectError::ReentrantBroadcast(kind.name()));
        }

        let mut message = self.messages.take::<M>();
        fill(&mut message);
        let result = self.broadcast(&*message);
        self.messages.restore(message);
        result
    }

    /// Whether a lifecycle-guard scope is open
    pub fn is_dispatching(&self) -> bool {
        self.callback_depth > 0
    }

    /// Whether definitions are loaded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Game objects waiting for the outermost guard scope to close
    pub fn pending_removals(&self) -> &[EntityId] {
        &self.pending_removals
    }

    /// Look up a game object
    pub fn game_object(&self, entity: EntityId) -> Option<&GameObject> {
        self.entities.get(entity)
    }

    /// Whether the game object is alive
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live game objects
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live game objects attached to the scene, in document order
    pub fn entities(&self) -> Vec<EntityId> {
        self.scene
            .document_order()
            .into_iter()
            .filter_map(|node| self.entity_of_node(node))
            .collect()
    }

    /// First game object of the given type in document order
    pub fn find(&self, type_name: &str) -> Option<EntityId> {
        self.entities()
            .into_iter()
            .find(|&entity| self.entities[entity].type_name() == type_name)
    }

    /// Game object attached to a scene node
    pub fn entity_of_node(&self, node: NodeId) -> Option<EntityId> {
        self.scene
            .user_data::<EntityTag>(node, GAME_OBJECT_NODE_USER_DATA_ID)
            .map(|tag| tag.0)
            .filter(|&entity| self.entities.contains_key(entity))
    }

    /// Closest ancestor game object
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        let mut node = self.entities.get(entity)?.node();
        while let Some(parent) = self.scene.parent(node) {
            if let Some(parent_entity) = self.entity_of_node(parent) {
                return Some(parent_entity);
            }
            node = parent;
        }
        None
    }

    /// Top-most ancestor game object, or `entity` itself
    pub fn root(&self, entity: EntityId) -> Option<EntityId> {
        if !self.entities.contains_key(entity) {
            return None;
        }
        let mut root = entity;
        while let Some(parent) = self.parent(root) {
            root = parent;
        }
        Some(root)
    }

    /// Closest descendant game objects, in attachment order
    pub fn children(&self, entity: EntityId) -> Vec<EntityId> {
        let Some(node) = self.entities.get(entity).map(GameObject::node) else {
            return Vec::new();
        };

        let mut children = Vec::new();
        let mut stack: Vec<NodeId> = self.scene.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            match self.entity_of_node(next) {
                Some(child) => children.push(child),
                None => stack.extend(self.scene.children(next).iter().rev().copied()),
            }
        }
        children
    }

    /// First component of type `T` on a game object
    pub fn component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.entities.get(entity)?.component::<T>()
    }

    /// Mutable access to the first component of type `T` on a game object
    pub fn component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities.get_mut(entity)?.component_mut::<T>()
    }

    /// All components of type `T` on a game object
    pub fn components<T: Component>(&self, entity: EntityId) -> impl Iterator<Item = &T> + '_ {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|object| object.components::<T>())
    }

    /// Component of type `T` with the given id on a game object
    pub fn find_component<T: Component>(&self, entity: EntityId, id: &str) -> Option<&T> {
        self.entities.get(entity)?.find_component::<T>(id)
    }

    /// First component of type `T` in the descendants of a game object
    ///
    /// Descendants are searched depth-first in document order; the game
    /// object itself is excluded.
    pub fn component_in_children<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.descendants(entity)
            .into_iter()
            .find_map(|descendant| self.component::<T>(descendant))
    }

    /// All components of type `T` in the descendants of a game object
    pub fn components_in_children<T: Component>(&self, entity: EntityId) -> Vec<&T> {
        self.descendants(entity)
            .into_iter()
            .flat_map(|descendant| self.components::<T>(descendant))
            .collect()
    }

    /// Controller configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The scene node tree
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Registered component types
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Loaded definitions
    pub fn definitions(&self) -> &DefinitionCache {
        &self.definitions
    }

    /// Pooled messages
    pub fn messages(&self) -> &MessagePool {
        &self.messages
    }

    pub(crate) fn spawn_composed(
        &mut self,
        type_name: &str,
        parent: Option<EntityId>,
        components: Vec<PendingComponent>,
    ) -> Result<EntityId, GameObjectError> {
        self.check_parent(parent)?;

        self.with_lifecycle_guard(|this| {
            let entity = this.spawn_entity(type_name, parent);
            let empty = Properties::empty();
            let mut result = Ok(());
            for pending in components {
                result = this.attach_component(
                    entity,
                    pending.id.as_deref(),
                    &pending.type_name,
                    pending.component,
                    &empty,
                );
                if result.is_err() {
                    break;
                }
            }
            if let Err(err) = result.and_then(|()| this.start_components(entity)) {
                this.destroy(entity);
                return Err(err);
            }
            Ok(entity)
        })
    }

    fn check_parent(&self, parent: Option<EntityId>) -> Result<(), GameObjectError> {
        match parent {
            Some(parent) if !self.entities.contains_key(parent) => {
                Err(GameObjectError::UnknownEntity(parent))
            }
            _ => Ok(()),
        }
    }

    fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        let Some(node) = self.entities.get(entity).map(GameObject::node) else {
            return Vec::new();
        };
        self.scene
            .subtree_order(node)
            .into_iter()
            .skip(1)
            .filter_map(|node| self.entity_of_node(node))
            .collect()
    }

    /// Run `scope` with destruction deferred, then carry out deferred
    /// destruction if this was the outermost scope
    fn with_lifecycle_guard<R>(&mut self, scope: impl FnOnce(&mut Self) -> R) -> R {
        self.callback_depth += 1;
        let result = scope(self);
        self.callback_depth -= 1;

        if self.callback_depth == 0 {
            while !self.pending_removals.is_empty() {
                for entity in std::mem::take(&mut self.pending_removals) {
                    if self.entities.contains_key(entity) {
                        self.destroy(entity);
                    }
                }
            }
        }
        result
    }

    /// Check a component out, run one of its hooks, and put it back
    fn with_component<R>(
        &mut self,
        entity: EntityId,
        index: usize,
        hook: impl FnOnce(&mut dyn Component, &mut ComponentContext<'_>) -> R,
    ) -> Option<R> {
        let mut component = self.entities.get_mut(entity)?.take_component(index)?;
        let result = {
            let mut ctx = ComponentContext::new(self, entity, index);
            hook(&mut *component, &mut ctx)
        };
        if let Some(object) = self.entities.get_mut(entity) {
            object.put_component(index, component);
        }
        Some(result)
    }

    fn spawn_entity(&mut self, type_name: &str, parent: Option<EntityId>) -> EntityId {
        let node = self.scene.create_node(type_name);
        match parent.and_then(|parent| self.entities.get(parent)) {
            Some(parent) => self.scene.add_child(parent.node(), node),
            None => self.scene.add_node(node),
        };

        let entity = self
            .entities
            .insert_with_key(|entity| GameObject::new(entity, type_name.to_string(), node));
        self.scene
            .set_user_data(node, Some(Box::new(EntityTag(entity))));
        log::debug!("Created game object '{}' ({:?})", type_name, entity);
        entity
    }

    fn instantiate(
        &mut self,
        definition: &Definition,
        parent: Option<EntityId>,
    ) -> Result<EntityId, GameObjectError> {
        let entity = self.spawn_entity(definition.type_name(), parent);
        if let Err(err) = self.populate(entity, definition) {
            self.destroy(entity);
            return Err(err);
        }
        Ok(entity)
    }

    fn populate(&mut self, entity: EntityId, definition: &Definition) -> Result<(), GameObjectError> {
        for declaration in definition.components() {
            let component = self
                .registry
                .get(declaration.tag())
                .ok_or_else(|| {
                    GameObjectError::UnknownComponentType(declaration.type_name().to_string())
                })?
                .instantiate();
            self.attach_component(
                entity,
                declaration.id(),
                declaration.type_name(),
                component,
                declaration.properties(),
            )?;
        }

        for child in definition.children() {
            let child_definition = self
                .definitions
                .get(child)
                .ok_or_else(|| GameObjectError::UnknownDefinition(child.clone()))?;
            self.instantiate(&child_definition, Some(entity))?;
        }

        self.start_components(entity)
    }

    fn attach_component(
        &mut self,
        entity: EntityId,
        id: Option<&str>,
        type_name: &str,
        mut component: Box<dyn Component>,
        properties: &Properties,
    ) -> Result<(), GameObjectError> {
        let mut state = ComponentState::Constructed;
        component.read_properties(properties);
        component.initialize();
        state.advance(ComponentState::Initialized)?;

        let object = self
            .entities
            .get_mut(entity)
            .ok_or(GameObjectError::UnknownEntity(entity))?;
        let id = id.map_or_else(
            || format!("{}_{}", ANONYMOUS_TYPE_NAME, object.component_count()),
            str::to_string,
        );
        object.attach(id, type_name.to_string(), state, component);
        Ok(())
    }

    fn start_components(&mut self, entity: EntityId) -> Result<(), GameObjectError> {
        let count = self.entities.get(entity).map_or(0, GameObject::component_count);
        for index in 0..count {
            let Some(mut state) = self.slot_state(entity, index) else {
                continue;
            };
            state.advance(ComponentState::Started)?;

            self.with_component(entity, index, |component, ctx| component.on_start(ctx));
            if let Some(slot) = self.entities.get_mut(entity).and_then(|o| o.slot_mut(index)) {
                slot.state = state;
            }
        }
        Ok(())
    }

    fn slot_state(&self, entity: EntityId, index: usize) -> Option<ComponentState> {
        self.entities.get(entity)?.slot(index).map(|slot| slot.state)
    }

    fn teardown(&mut self, entity: EntityId) {
        for child in self.children(entity) {
            self.destroy(child);
        }

        self.with_lifecycle_guard(|this| {
            let count = this.entities.get(entity).map_or(0, GameObject::component_count);
            for index in 0..count {
                let advanced = this
                    .entities
                    .get_mut(entity)
                    .and_then(|object| object.slot_mut(index))
                    .map(|slot| slot.state.advance(ComponentState::Finalized));
                match advanced {
                    Some(Ok(())) => {
                        this.with_component(entity, index, |component, ctx| {
                            component.finalize(ctx);
                        });
                    }
                    Some(Err(err)) => {
                        log::warn!("Skipping finalize on {:?}: {}", entity, err);
                    }
                    None => {}
                }
            }

            // Children created by finalize hooks go down with their parent.
            for orphan in this.children(entity) {
                this.destroy(orphan);
            }
            this.release(entity);
        });
    }

    fn release(&mut self, entity: EntityId) {
        if let Some(object) = self.entities.remove(entity) {
            self.scene.set_user_data(object.node(), None);
            self.scene.remove_node(object.node());
            log::debug!(
                "Destroyed game object '{}' ({:?})",
                object.type_name(),
                entity
            );
        }
    }

    fn dispatch(&mut self, message: &dyn Message, nodes: Vec<NodeId>) -> Result<(), GameObjectError> {
        let kind = message.kind();
        if !self.messages.begin(kind) {
            return Err(GameObjectError::ReentrantBroadcast(kind.name()));
        }
        log::trace!("Broadcasting {} to {} nodes", kind.name(), nodes.len());

        self.with_lifecycle_guard(|this| {
            for node in nodes {
                if let Some(entity) = this.entity_of_node(node) {
                    this.forward(entity, message, kind);
                }
            }
            this.messages.end(kind);
        });
        Ok(())
    }

    /// Deliver to each started component in declaration order until one
    /// returns `false`
    fn forward(&mut self, entity: EntityId, message: &dyn Message, kind: MessageKind) {
        let count = self.entities.get(entity).map_or(0, GameObject::component_count);
        for index in 0..count {
            let receives = self
                .slot_state(entity, index)
                .is_some_and(ComponentState::receives_messages);
            if !receives {
                continue;
            }

            let keep_going = self.with_component(entity, index, |component, ctx| {
                component.on_message_received(ctx, message, kind)
            });
            if keep_going == Some(false) {
                break;
            }
        }
    }
}

impl Default for GameObjectController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameObjectController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObjectController")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("entities", &self.entities.len())
            .field("definitions", &self.definitions.len())
            .field("callback_depth", &self.callback_depth)
            .finish_non_exhaustive()
    }
}
