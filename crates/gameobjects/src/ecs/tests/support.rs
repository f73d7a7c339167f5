//! Recorder component and helpers shared by the controller tests

use std::cell::RefCell;

use crate::assets::{MemoryDefinitionSource, Properties};
use crate::ecs::{Component, ComponentContext, GameObjectController, GameObjectError};
use crate::game_message;
use crate::messages::{Message, MessageKind};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

game_message! {
    pub struct Ping;
}

game_message! {
    pub struct Poke {
        pub strength: i32,
    }
}

/// Append to this thread's hook log
pub fn record(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

/// Drain this thread's hook log
pub fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// Drain the hook log, keeping events that contain `pattern`
pub fn take_events_matching(pattern: &str) -> Vec<String> {
    take_events()
        .into_iter()
        .filter(|event| event.contains(pattern))
        .collect()
}

/// Drain the hook log, dropping `read` and `init` events
pub fn take_lifecycle_events() -> Vec<String> {
    take_events()
        .into_iter()
        .filter(|event| !event.ends_with(":read") && !event.ends_with(":init"))
        .collect()
}

/// Records every hook it receives, tagged with its `label` property
///
/// Optional behaviors are switched on through properties.
#[derive(Debug, Default)]
pub struct Recorder {
    pub label: String,
    veto: bool,
    destroy_on_ping: bool,
    spawn_on_ping: String,
    rebroadcast: bool,
    ping_on_start: bool,
    finalize_on_ping: bool,
    kill_on_finalize: String,
    kill_on_start: String,
}

impl Recorder {
    pub fn labelled(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }
}

impl Component for Recorder {
    fn read_properties(&mut self, properties: &Properties) {
        properties.set_if_exists("label", &mut self.label);
        properties.set_if_exists("veto", &mut self.veto);
        properties.set_if_exists("destroy_on_ping", &mut self.destroy_on_ping);
        properties.set_if_exists("spawn_on_ping", &mut self.spawn_on_ping);
        properties.set_if_exists("rebroadcast", &mut self.rebroadcast);
        properties.set_if_exists("ping_on_start", &mut self.ping_on_start);
        properties.set_if_exists("finalize_on_ping", &mut self.finalize_on_ping);
        properties.set_if_exists("kill_on_finalize", &mut self.kill_on_finalize);
        properties.set_if_exists("kill_on_start", &mut self.kill_on_start);
        record(format!("{}:read", self.label));
    }

    fn initialize(&mut self) {
        record(format!("{}:init", self.label));
    }

    fn on_start(&mut self, ctx: &mut ComponentContext<'_>) {
        record(format!("{}:start", self.label));
        if self.ping_on_start {
            if let Err(err) = ctx.broadcast(&Ping) {
                record(format!("{}:error {err}", self.label));
            }
        }
        if !self.kill_on_start.is_empty() {
            let victim = self.kill_on_start.clone();
            self.kill(ctx, &victim);
        }
    }

    fn on_message_received(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &dyn Message,
        _kind: MessageKind,
    ) -> bool {
        if let Some(poke) = message.downcast_ref::<Poke>() {
            record(format!("{}:poke {}", self.label, poke.strength));
            return !self.veto;
        }
        if !message.is::<Ping>() {
            return true;
        }

        record(format!("{}:ping", self.label));

        if self.destroy_on_ping {
            ctx.destroy_owner();
            record(format!(
                "{}:alive={}",
                self.label,
                ctx.controller().contains(ctx.owner())
            ));
        }

        if !self.spawn_on_ping.is_empty() {
            let type_name = self.spawn_on_ping.clone();
            if let Err(err) = ctx.create_child(&type_name) {
                record(format!("{}:error {err}", self.label));
            }
        }

        if self.rebroadcast {
            if matches!(ctx.broadcast(&Ping), Err(GameObjectError::ReentrantBroadcast(_))) {
                record(format!("{}:reentrant", self.label));
            }
            if matches!(
                ctx.controller_mut().send::<Ping>(|_| {}),
                Err(GameObjectError::ReentrantBroadcast(_))
            ) {
                record(format!("{}:reentrant", self.label));
            }
            if ctx
                .controller_mut()
                .send::<Poke>(|poke| poke.strength = 3)
                .is_ok()
            {
                record(format!("{}:poke-sent", self.label));
            }
        }

        if self.finalize_on_ping
            && matches!(
                ctx.controller_mut().finalize(),
                Err(GameObjectError::BroadcastInFlight)
            )
        {
            record(format!("{}:finalize-rejected", self.label));
        }

        !self.veto
    }

    fn finalize(&mut self, ctx: &mut ComponentContext<'_>) {
        let children = ctx.controller().children(ctx.owner()).len();
        let siblings = ctx.siblings::<Recorder>().count();
        record(format!(
            "{}:finalize children={children} siblings={siblings}",
            self.label
        ));

        if !self.kill_on_finalize.is_empty() {
            let victim = self.kill_on_finalize.clone();
            self.kill(ctx, &victim);
        }
    }
}

impl Recorder {
    /// Destroy the first game object of `type_name` and log whether it survived the call
    fn kill(&self, ctx: &mut ComponentContext<'_>, type_name: &str) {
        if let Some(victim) = ctx.controller().find(type_name) {
            ctx.destroy(victim);
            record(format!(
                "{}:killed alive={}",
                self.label,
                ctx.controller().contains(victim)
            ));
        }
    }
}

/// Component with no behavior and no registration
#[derive(Debug, Default)]
pub struct Marker;

impl Component for Marker {}

/// Property block for one recorder, `{` on the line after the header
pub fn recorder(label: &str, extra: &[(&str, &str)]) -> String {
    recorder_with_id(None, label, extra)
}

/// Property block for one recorder with an optional explicit id
pub fn recorder_with_id(id: Option<&str>, label: &str, extra: &[(&str, &str)]) -> String {
    let mut text = match id {
        Some(id) => format!("recorder {id}\n{{\n"),
        None => "recorder\n{\n".to_string(),
    };
    text.push_str(&format!("    label = {label}\n"));
    for (key, value) in extra {
        text.push_str(&format!("    {key} = {value}\n"));
    }
    text.push_str("}\n");
    text
}

/// Initialized controller serving the given definitions, with a fresh log
pub fn controller(definitions: &[(&str, String)]) -> GameObjectController {
    let mut source = MemoryDefinitionSource::new();
    for (type_name, text) in definitions {
        source.insert(*type_name, text.as_str());
    }

    let mut controller = GameObjectController::new();
    controller.register_component::<Recorder>("recorder").unwrap();
    controller.register_definition_source(source);
    controller.initialize().unwrap();
    take_events();
    controller
}
