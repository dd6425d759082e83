//! Recursive descent over `<state>`, `<parallel>`, `<final>`, `<history>`.
//!
//! Assigns document-order indices and builds the `states`/`history_states`
//! maps. Transitions, entry/exit content and invokes are delegated to
//! `executable_content` and `invoke_resolver`; everything here is concerned
//! with tree shape and parent/child bookkeeping.

use log::warn;
use std::path::Path;

use crate::executable_content::parse_actions;
use crate::expression_classifier::build_expression;
use crate::invoke_resolver;
use crate::model::{
    Binding, DataDeclaration, DoneData, ExpressionKind, HistoryInfo, HistoryType, Model, Param,
    State, StateKind, Transition, TransitionType,
};
use crate::xml_reader::Element;

const TAG_STATE: &str = "state";
const TAG_PARALLEL: &str = "parallel";
const TAG_FINAL: &str = "final";
const TAG_HISTORY: &str = "history";
const TAG_TRANSITION: &str = "transition";
const TAG_INITIAL: &str = "initial";
const TAG_ONENTRY: &str = "onentry";
const TAG_ONEXIT: &str = "onexit";
const TAG_DATAMODEL: &str = "datamodel";
const TAG_DATA: &str = "data";
const TAG_DONEDATA: &str = "donedata";
const TAG_PARAM: &str = "param";
const TAG_CONTENT: &str = "content";

/// Monotonic document-order counter threaded through the whole build, per
/// the recommendation to maintain order as we go rather than infer it
/// afterward.
pub struct Builder<'a> {
    model: &'a mut Model,
    next_order: u32,
    source_path: &'a Path,
    out_dir: Option<&'a Path>,
}

/// Walks the root `<scxml>` element and populates `model`'s state tree.
/// `out_dir`, when set, overrides the directory inline-invoke sibling
/// files are extracted into (the CLI's `-o` flag); `None` extracts beside
/// `source_path`.
pub fn build(root: &Element, model: &mut Model, source_path: &Path, out_dir: Option<&Path>) {
    model.binding = match root.attr_or_empty("binding") {
        "late" => Binding::Late,
        _ => Binding::Early,
    };
    if let Some(dm) = root.attr("datamodel") {
        if !dm.is_empty() {
            model.datamodel_type = dm.to_string();
        }
    }
    model.initial = root.attr_or_empty("initial").to_string();
    model.variables = parse_top_level_datamodel(root);

    let mut builder = Builder {
        model,
        next_order: 0,
        source_path,
        out_dir,
    };
    builder.build_children(root, None);

    if builder.model.initial.is_empty() {
        builder.model.initial = first_child_state_id(root).unwrap_or_default();
    }
}

fn parse_top_level_datamodel(root: &Element) -> Vec<DataDeclaration> {
    match root.find_first_child(TAG_DATAMODEL) {
        Some(dm) => parse_data_declarations(dm),
        None => Vec::new(),
    }
}

fn parse_data_declarations(datamodel_el: &Element) -> Vec<DataDeclaration> {
    datamodel_el
        .find_all_children(TAG_DATA)
        .into_iter()
        .map(|d| DataDeclaration {
            id: d.attr_or_empty("id").to_string(),
            expr: d.attr_or_empty("expr").to_string(),
            src: d.attr_or_empty("src").to_string(),
            content: d.text.clone(),
        })
        .collect()
}

/// First `<state|parallel|final>` child id, used as the fallback initial
/// when the container has no `initial` attribute.
fn first_child_state_id(container: &Element) -> Option<String> {
    container
        .scxml_children()
        .find(|c| matches!(c.name.as_str(), TAG_STATE | TAG_PARALLEL | TAG_FINAL))
        .and_then(|c| c.attr("id"))
        .map(|s| s.to_string())
}

impl<'a> Builder<'a> {
    fn next_document_order(&mut self) -> u32 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    fn build_children(&mut self, container: &Element, parent: Option<&str>) {
        for child in container.scxml_children() {
            match child.name.as_str() {
                TAG_STATE => self.build_state(child, parent),
                TAG_PARALLEL => self.build_parallel(child, parent),
                TAG_FINAL => self.build_final(child, parent),
                TAG_HISTORY => self.build_history(child, parent),
                _ => {}
            }
        }
    }

    fn build_state(&mut self, el: &Element, parent: Option<&str>) {
        let id = match el.attr("id") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("skipping <state> with missing id attribute");
                return;
            }
        };

        let has_children = !el.find_all_children(TAG_STATE).is_empty()
            || !el.find_all_children(TAG_PARALLEL).is_empty()
            || !el.find_all_children(TAG_FINAL).is_empty()
            || !el.find_all_children(TAG_HISTORY).is_empty();

        let order = self.next_document_order();
        let kind = if has_children {
            StateKind::Compound
        } else {
            StateKind::Atomic
        };
        let mut state = State::new(id.clone(), kind, order);
        state.parent = parent.map(|p| p.to_string());
        state.initial = el.attr_or_empty("initial").to_string();

        self.populate_common(&mut state, el);

        if let Some(initial_el) = el.find_first_child(TAG_INITIAL) {
            if let Some(transition_el) = initial_el.find_first_child(TAG_TRANSITION) {
                let target = transition_el.attr_or_empty("target").to_string();
                if state.initial.is_empty() && !target.is_empty() {
                    state.initial = target;
                }
                state.initial_transition_actions = parse_actions(transition_el, self.model);
            }
        }

        self.model.states.insert(id.clone(), state);
        self.build_children(el, Some(&id));
    }

    fn build_parallel(&mut self, el: &Element, parent: Option<&str>) {
        let id = match el.attr("id") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("skipping <parallel> with missing id attribute");
                return;
            }
        };

        self.model.has_parallel_states = true;
        let order = self.next_document_order();
        let mut state = State::new(id.clone(), StateKind::Parallel, order);
        state.parent = parent.map(|p| p.to_string());

        self.populate_common(&mut state, el);

        self.model.states.insert(id.clone(), state);
        self.build_children(el, Some(&id));
    }

    fn build_final(&mut self, el: &Element, parent: Option<&str>) {
        let id = match el.attr("id") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("skipping <final> with missing id attribute");
                return;
            }
        };

        let order = self.next_document_order();
        let mut state = State::new(id.clone(), StateKind::Final, order);
        state.parent = parent.map(|p| p.to_string());

        self.populate_common(&mut state, el);
        state.donedata = el.find_first_child(TAG_DONEDATA).map(|dd| DoneData {
            params: dd
                .find_all_children(TAG_PARAM)
                .into_iter()
                .map(|p| Param {
                    name: p.attr_or_empty("name").to_string(),
                    expr: p.attr_or_empty("expr").to_string(),
                    location: p.attr_or_empty("location").to_string(),
                })
                .collect(),
            content: dd
                .find_first_child(TAG_CONTENT)
                .map(|c| c.text.clone())
                .unwrap_or_default(),
            content_expr: dd
                .find_first_child(TAG_CONTENT)
                .and_then(|c| c.attr("expr"))
                .unwrap_or("")
                .to_string(),
        });

        self.model.states.insert(id, state);
    }

    fn build_history(&mut self, el: &Element, parent: Option<&str>) {
        let id = match el.attr("id") {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("skipping <history> with missing id attribute");
                return;
            }
        };
        let parent_id = parent.unwrap_or_default().to_string();
        self.model.has_history_states = true;

        let default_target = el
            .find_first_child(TAG_TRANSITION)
            .map(|t| t.attr_or_empty("target").to_string())
            .unwrap_or_default();

        let history_type = if el.attr_or_empty("type") == "deep" {
            HistoryType::Deep
        } else {
            HistoryType::Shallow
        };

        self.model.history_default_targets.insert(id.clone(), default_target.clone());
        self.model.history_states.insert(
            id,
            HistoryInfo {
                parent: parent_id,
                history_type,
                default_target,
                leaf_target: String::new(),
            },
        );
    }

    fn populate_common(&mut self, state: &mut State, el: &Element) {
        state.transitions = el
            .find_all_children(TAG_TRANSITION)
            .into_iter()
            .map(|t| self.parse_transition(t))
            .collect();

        if let Some(onentry) = el.find_first_child(TAG_ONENTRY) {
            state.on_entry = parse_actions(onentry, self.model);
        }
        if let Some(onexit) = el.find_first_child(TAG_ONEXIT) {
            state.on_exit = parse_actions(onexit, self.model);
        }
        if let Some(dm) = el.find_first_child(TAG_DATAMODEL) {
            state.datamodel = parse_data_declarations(dm);
        }

        let invoke_elements = el.find_all_children("invoke");
        if !invoke_elements.is_empty() {
            self.model.has_invoke = true;
        }
        for invoke_el in invoke_elements {
            let (invoke, static_record) = invoke_resolver::resolve(
                invoke_el,
                &state.id,
                state.invokes.len(),
                self.model,
                self.source_path,
                self.out_dir,
            );
            if !invoke.is_static {
                self.model.has_dynamic_invoke = true;
                self.model.has_dynamic_expressions = true;
            }
            if let Some(record) = static_record {
                state.static_invokes.push(record.clone());
                self.model.static_invokes.push(record);
            }
            state.invokes.push(invoke);
        }
    }

    fn parse_transition(&mut self, el: &Element) -> Transition {
        let event = el.attr_or_empty("event").to_string();
        for token in event.split_whitespace() {
            self.model.add_concrete_event(token);
        }

        let transition_type = match el.attr_or_empty("type") {
            "internal" => TransitionType::Internal,
            _ => TransitionType::External,
        };

        let cond = build_expression(el.attr_or_empty("cond"));
        if cond.raw.contains("In(") {
            self.model.uses_in_predicate = true;
        }
        if matches!(cond.kind, ExpressionKind::NeedsEngine | ExpressionKind::ReferencesEventMeta) {
            self.model.needs_jsengine = true;
        }

        let actions = parse_actions(el, self.model);
        if !actions.is_empty() {
            self.model.has_transition_actions = true;
        }

        Transition {
            event,
            target: el.attr_or_empty("target").to_string(),
            cond,
            transition_type,
            actions,
            history_target: None,
        }
    }
}
