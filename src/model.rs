//! The typed, fully-resolved intermediate model emitted by the analyzer.
//!
//! States and transitions never own each other directly: everything is
//! referenced by id through the `Model::states` map. This trades the
//! object-graph cycles a tree of owned `State` nodes would need (a state's
//! initial target is itself a state, parallel regions point back at their
//! parent, history targets point forward to not-yet-built siblings) for a
//! single arena plus integer/string handles, the same trade the reader this
//! module is modeled on makes with its id-keyed `HashMap<String, State>`.

use std::collections::{BTreeMap, HashSet};

/// Default SCXML datamodel, used unless the document says otherwise.
pub const DEFAULT_DATAMODEL: &str = "ecmascript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Early,
    Late,
}

impl Default for Binding {
    fn default() -> Self {
        Binding::Early
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryType {
    Shallow,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionType {
    External,
    Internal,
}

impl Default for TransitionType {
    fn default() -> Self {
        TransitionType::External
    }
}

/// A `<data>` declaration, at the document root or inside a state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDeclaration {
    pub id: String,
    pub expr: String,
    pub src: String,
    pub content: String,
}

/// One `<param>` child of `<send>`, `<invoke>` or `<donedata>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub expr: String,
    pub location: String,
}

/// Classification outcome of a guard/value expression, see
/// `expression_classifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    Empty,
    PureIn,
    NeedsEngine,
    ReferencesEventMeta,
    /// Inline constant or bare identifier; does not require the engine.
    Inline,
}

impl Default for ExpressionKind {
    fn default() -> Self {
        ExpressionKind::Empty
    }
}

/// An expression together with its static classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expression {
    pub raw: String,
    pub kind: ExpressionKind,
    pub is_pure_in_predicate: bool,
    /// Lowered `isStateActive(...)` form, non-empty only when
    /// `is_pure_in_predicate` is true.
    pub native: String,
}

impl Expression {
    pub fn empty() -> Self {
        Expression::default()
    }
}

/// One branch of executable content: the body of `<onentry>`, `<onexit>`,
/// `<transition>`, `<finalize>`, or an `<if>`/`<elseif>`/`<else>` clause.
pub type ActionList = Vec<Action>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfBranch {
    pub cond: Expression,
    pub actions: ActionList,
}

/// Executable content is never executed by this crate (only structurally
/// recorded for a downstream generator), so it is a plain tagged enum
/// rather than a trait-object hierarchy with an `execute` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Raise {
        event: String,
    },
    Send {
        event: String,
        event_expr: String,
        target: String,
        target_expr: String,
        send_type: String,
        delay: String,
        delay_expr: String,
        id: String,
        id_location: String,
        namelist: String,
        params: Vec<Param>,
        content: String,
        content_expr: String,
    },
    Assign {
        location: String,
        expr: String,
    },
    If {
        then_branch: IfBranch,
        elseif_branches: Vec<IfBranch>,
        else_actions: Option<ActionList>,
    },
    ForEach {
        array: String,
        item: String,
        index: String,
        actions: ActionList,
    },
    Log {
        label: String,
        expr: String,
    },
    Script {
        src: String,
        content: String,
    },
    Cancel {
        send_id: String,
        send_id_expr: String,
    },
}

/// Data carried by a `<final>` state's `<donedata>` child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoneData {
    pub params: Vec<Param>,
    pub content: String,
    pub content_expr: String,
}

/// A parsed `<invoke>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invoke {
    pub id: String,
    pub id_location: String,
    pub invoke_type: String,
    pub type_expr: String,
    pub src: String,
    pub src_expr: String,
    pub autoforward: bool,
    pub namelist: String,
    pub params: Vec<Param>,
    pub finalize: ActionList,
    pub content: String,
    pub content_expr: String,
    pub is_static: bool,
}

/// A static invocation flattened into the model for the generator, one per
/// resolved static `<invoke>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticInvoke {
    pub state_id: String,
    pub invoke_id: String,
    pub child_name: String,
    pub child_needs_jsengine: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub event: String,
    pub target: String,
    pub cond: Expression,
    pub transition_type: TransitionType,
    pub actions: ActionList,
    /// Set once the Model Resolver determines `target` names a history
    /// state; the original `target` string is left untouched.
    pub history_target: Option<String>,
}

impl Default for Transition {
    fn default() -> Self {
        Transition {
            event: String::new(),
            target: String::new(),
            cond: Expression::empty(),
            transition_type: TransitionType::default(),
            actions: Vec::new(),
            history_target: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Atomic,
    Compound,
    Parallel,
    Final,
}

#[derive(Debug, Clone)]
pub struct State {
    pub id: String,
    pub kind: StateKind,
    pub parent: Option<String>,
    pub document_order: u32,
    pub initial: String,
    pub transitions: Vec<Transition>,
    pub on_entry: ActionList,
    pub on_exit: ActionList,
    pub initial_transition_actions: ActionList,
    pub datamodel: Vec<DataDeclaration>,
    pub invokes: Vec<Invoke>,
    pub static_invokes: Vec<StaticInvoke>,
    /// Only meaningful when `kind == StateKind::Final`.
    pub donedata: Option<DoneData>,
}

impl State {
    pub fn new(id: impl Into<String>, kind: StateKind, document_order: u32) -> Self {
        State {
            id: id.into(),
            kind,
            parent: None,
            document_order,
            initial: String::new(),
            transitions: Vec::new(),
            on_entry: Vec::new(),
            on_exit: Vec::new(),
            initial_transition_actions: Vec::new(),
            datamodel: Vec::new(),
            invokes: Vec::new(),
            static_invokes: Vec::new(),
            donedata: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.initial.is_empty()
    }
}

/// Resolved information about one `<history>` pseudo-state. History
/// pseudo-states are never entries in `Model::states`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryInfo {
    pub parent: String,
    pub history_type: HistoryType,
    pub default_target: String,
    pub leaf_target: String,
}

impl Default for HistoryType {
    fn default() -> Self {
        HistoryType::Shallow
    }
}

/// The artifact emitted for one analyzed SCXML document.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub initial: String,
    pub binding: Binding,
    pub datamodel_type: String,
    pub states: BTreeMap<String, State>,
    pub events: HashSet<String>,
    pub history_states: BTreeMap<String, HistoryInfo>,
    pub history_default_targets: BTreeMap<String, String>,
    pub parallel_regions: BTreeMap<String, Vec<String>>,
    pub variables: Vec<DataDeclaration>,
    pub static_invokes: Vec<StaticInvoke>,

    pub has_dynamic_expressions: bool,
    pub has_parallel_states: bool,
    pub has_history_states: bool,
    pub has_invoke: bool,
    pub has_dynamic_invoke: bool,
    pub has_event_metadata: bool,
    pub has_parent_communication: bool,
    pub has_child_communication: bool,
    pub needs_jsengine: bool,
    pub uses_in_predicate: bool,
    pub has_transition_actions: bool,

    pub needs_event_name: bool,
    pub needs_event_data: bool,
    pub needs_event_type: bool,
    pub needs_event_sendid: bool,
    pub needs_event_origin: bool,
    pub needs_event_origintype: bool,
    pub needs_event_invokeid: bool,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model {
            name: name.into(),
            initial: String::new(),
            binding: Binding::default(),
            datamodel_type: DEFAULT_DATAMODEL.to_string(),
            states: BTreeMap::new(),
            events: HashSet::new(),
            history_states: BTreeMap::new(),
            history_default_targets: BTreeMap::new(),
            parallel_regions: BTreeMap::new(),
            variables: Vec::new(),
            static_invokes: Vec::new(),
            has_dynamic_expressions: false,
            has_parallel_states: false,
            has_history_states: false,
            has_invoke: false,
            has_dynamic_invoke: false,
            has_event_metadata: false,
            has_parent_communication: false,
            has_child_communication: false,
            needs_jsengine: false,
            uses_in_predicate: false,
            has_transition_actions: false,
            needs_event_name: false,
            needs_event_data: false,
            needs_event_type: false,
            needs_event_sendid: false,
            needs_event_origin: false,
            needs_event_origintype: false,
            needs_event_invokeid: false,
        }
    }

    /// Adds `event` to the event set unless it is a wildcard or prefix
    /// pattern, which are a runtime concern.
    pub fn add_concrete_event(&mut self, event: &str) {
        if is_wildcard_event(event) {
            return;
        }
        self.events.insert(event.to_string());
    }
}

/// `*`, `.*`, `_*` and `foo.*`-style prefix patterns are excluded from the
/// concrete event set.
pub fn is_wildcard_event(event: &str) -> bool {
    event.is_empty() || event == "*" || event.ends_with(".*") || event.ends_with("*")
}
