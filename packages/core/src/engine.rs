//! The document core: owns the component arena, the dependency graph and
//! every piece of session state, and exposes the action, inspection,
//! persistence and variant surfaces.

use crate::arena::{Arena, SlotId};
use crate::changes::{flags_for, Command, CommandLog};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, Diagnostic};
use crate::graph::DependencyGraph;
use crate::instance::{ComponentId, ComponentInstance};
use crate::persistence::{PersistedState, SavedVariant};
use crate::scheduler::Scheduler;
use crate::undo_stack::UndoStack;
use crate::value::StateValue;
use crate::variants::{VariantPlan, VariantRecord, VariantRequest};
use doenet_parser::NameGenerator;
use std::collections::{HashMap, VecDeque};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default)]
pub struct CoreOptions {
    pub config: CoreConfig,
    /// Variant to realize. Without one, a saved variant is reused.
    pub variant: Option<VariantRequest>,
    pub state: Option<PersistedState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedAction {
    pub component: String,
    pub action: String,
    pub args: serde_json::Value,
}

/// Actions waiting for the current cycle to finish
#[derive(Debug, Default)]
pub struct ActionQueue {
    items: VecDeque<QueuedAction>,
}

impl ActionQueue {
    pub fn push(&mut self, component: &str, action: &str, args: serde_json::Value) {
        self.items.push_back(QueuedAction {
            component: component.to_string(),
            action: action.to_string(),
            args,
        });
    }

    pub fn pop(&mut self) -> Option<QueuedAction> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Callbacks run after a settle point.
///
/// Observers never see the core itself; they may only queue actions, which
/// run once the current cycle is done.
pub trait CoreObserver {
    fn on_persist(&mut self, _state: &PersistedState, _queue: &mut ActionQueue) {}

    fn on_variant(&mut self, _variant: &VariantRecord, _queue: &mut ActionQueue) {}
}

/// What a composite's current replacements were built from
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ExpansionSignature {
    pub targets: Vec<ComponentId>,
    pub key: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ExpansionRecord {
    pub signature: ExpansionSignature,
    pub replacements: Vec<ComponentId>,
}

pub struct DoenetCore {
    pub(crate) config: CoreConfig,
    pub(crate) components: Arena<ComponentInstance>,
    /// Full name -> live component
    pub(crate) names: HashMap<String, ComponentId>,
    pub(crate) root: ComponentId,
    pub(crate) graph: DependencyGraph,
    pub(crate) expansions: HashMap<ComponentId, ExpansionRecord>,
    /// Generated-name counters per namespace
    pub(crate) name_generators: HashMap<String, NameGenerator>,
    pub(crate) variant: VariantRecord,
    /// Source offset -> variant index of contributing elements
    pub(crate) variant_indices: HashMap<usize, usize>,
    /// Written essential values, also used to rehydrate new components
    pub(crate) saved: PersistedState,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) scheduler: Scheduler,
    pub(crate) undo: UndoStack,
    pub(crate) commands: CommandLog,
    pub(crate) queue: ActionQueue,
    pub(crate) dispatching: bool,
    pub(crate) observers: Vec<Box<dyn CoreObserver>>,
}

impl DoenetCore {
    pub fn from_source(source: &str) -> CoreResult<Self> {
        Self::new(source, CoreOptions::default())
    }

    #[instrument(skip_all, fields(len = source.len()))]
    pub fn new(source: &str, options: CoreOptions) -> CoreResult<Self> {
        let document = doenet_parser::parse(source)?;
        let plan = VariantPlan::from_document(&document, options.config.max_variants);

        let saved = options.state.unwrap_or_default();
        let request = options.variant.or_else(|| {
            saved
                .variant
                .as_ref()
                .map(|variant| VariantRequest::Index(variant.index as i64))
        });
        let (variant, variant_warning) = plan.resolve(request.as_ref());

        let mut core = Self {
            undo: UndoStack::with_max_levels(options.config.undo_levels),
            config: options.config,
            components: Arena::new(),
            names: HashMap::new(),
            root: SlotId::INVALID,
            graph: DependencyGraph::new(),
            expansions: HashMap::new(),
            name_generators: HashMap::new(),
            variant_indices: plan.indices(variant.index),
            variant,
            saved,
            diagnostics: Vec::new(),
            scheduler: Scheduler::new(),
            commands: CommandLog::new(),
            queue: ActionQueue::default(),
            dispatching: false,
            observers: Vec::new(),
        };
        core.diagnostics.extend(plan.diagnostics);
        core.diagnostics.extend(variant_warning);
        core.saved.variant = Some(SavedVariant {
            index: core.variant.index,
            name: core.variant.name.clone(),
        });

        core.root = core.build_document(&document);
        core.settle();
        core.validate_all();

        info!(
            components = core.components.len(),
            cells = core.graph.len(),
            variant = %core.variant.name,
            "document ready"
        );
        Ok(core)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn variant(&self) -> &VariantRecord {
        &self.variant
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn root_name(&self) -> &str {
        self.components
            .get(self.root)
            .map(|root| root.name.as_str())
            .unwrap_or_default()
    }

    /// Names of every live component, sorted.
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn component_type(&self, name: &str) -> Option<&'static str> {
        self.lookup(name)
            .and_then(|id| self.components.get(id))
            .map(|instance| instance.component_type())
    }

    /// Accepts `/g/A` or `g/A`.
    pub(crate) fn lookup(&self, name: &str) -> Option<ComponentId> {
        if name.starts_with('/') {
            self.names.get(name).copied()
        } else {
            self.names.get(&format!("/{name}")).copied()
        }
    }

    /// Current value of one state variable, evaluating what is dirty.
    pub fn read(&mut self, component: &str, var: &str) -> CoreResult<StateValue> {
        let id = self
            .lookup(component)
            .ok_or_else(|| CoreError::ComponentNotFound(component.to_string()))?;
        self.read_var(id, var)
    }

    pub(crate) fn read_var(&mut self, id: ComponentId, var: &str) -> CoreResult<StateValue> {
        let instance = self
            .components
            .get(id)
            .ok_or_else(|| CoreError::ComponentNotFound(format!("{id:?}")))?;
        let cell = instance
            .definition
            .state_var(var)
            .and_then(|def| instance.cell(def.name))
            .ok_or_else(|| CoreError::StateVarNotFound {
                component: instance.name.clone(),
                name: var.to_string(),
            })?;
        Ok(self.graph.read(cell)?)
    }

    /// Whether a tracked variable (`value` or `immediateValue`) has changed.
    pub fn has_changed(&mut self, component: &str, var: &str) -> CoreResult<bool> {
        let ty = self
            .component_type(component)
            .ok_or_else(|| CoreError::ComponentNotFound(component.to_string()))?;
        match flags_for(ty, var).first() {
            Some(flag) => Ok(self.read(component, flag)?.as_bool().unwrap_or(false)),
            None => Ok(false),
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        self.saved.clone()
    }

    pub fn command_log(&self, component: &str) -> &[Command] {
        match self.lookup(component).and_then(|id| self.components.get(id)) {
            Some(instance) => self.commands.entries(&instance.name),
            None => &[],
        }
    }

    /// Logical time in milliseconds.
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn has_pending_commits(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Register an observer. It is told the variant right away.
    pub fn add_observer(&mut self, mut observer: Box<dyn CoreObserver>) -> CoreResult<()> {
        observer.on_variant(&self.variant, &mut self.queue);
        self.observers.push(observer);
        self.run_queued()
    }

    pub(crate) fn notify_persist(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let state = self.persisted_state();
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer.on_persist(&state, &mut self.queue);
        }
        self.observers = observers;
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }
}

impl std::fmt::Debug for DoenetCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoenetCore")
            .field("root", &self.root_name())
            .field("components", &self.components.len())
            .field("cells", &self.graph.len())
            .field("variant", &self.variant.name)
            .finish()
    }
}
