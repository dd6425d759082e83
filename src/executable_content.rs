//! Recursive parser for executable content bodies: `<onentry>`, `<onexit>`,
//! `<transition>`, `<finalize>`, and `<if>` branches.
//!
//! Unlike the interpreter this module is modeled on, nothing here is ever
//! run; each recognized element is turned into a plain `Action` value for a
//! downstream code generator to act on.

use log::debug;

use crate::expression_classifier::build_expression;
use crate::model::{Action, Expression, ExpressionKind, IfBranch, Model, Param};
use crate::xml_reader::Element;

const TAG_RAISE: &str = "raise";
const TAG_SEND: &str = "send";
const TAG_ASSIGN: &str = "assign";
const TAG_IF: &str = "if";
const TAG_ELSEIF: &str = "elseif";
const TAG_ELSE: &str = "else";
const TAG_FOREACH: &str = "foreach";
const TAG_LOG: &str = "log";
const TAG_SCRIPT: &str = "script";
const TAG_CANCEL: &str = "cancel";
const TAG_PARAM: &str = "param";
const TAG_CONTENT: &str = "content";

/// Parses the direct children of `container` into a flat action list,
/// feeding the model's event set and feature flags along the way.
pub fn parse_actions(container: &Element, model: &mut Model) -> Vec<Action> {
    let mut actions = Vec::new();
    for child in container.scxml_children() {
        if let Some(action) = parse_one(child, model) {
            actions.push(action);
        }
    }
    actions
}

fn parse_one(el: &Element, model: &mut Model) -> Option<Action> {
    match el.name.as_str() {
        TAG_RAISE => Some(parse_raise(el, model)),
        TAG_SEND => Some(parse_send(el, model)),
        TAG_ASSIGN => Some(parse_assign(el, model)),
        TAG_IF => Some(parse_if(el, model)),
        TAG_FOREACH => Some(parse_foreach(el, model)),
        TAG_LOG => Some(parse_log(el)),
        TAG_SCRIPT => Some(parse_script(el, model)),
        TAG_CANCEL => Some(parse_cancel(el)),
        other => {
            debug!("skipping unrecognized executable-content element <{}>", other);
            None
        }
    }
}

fn parse_raise(el: &Element, model: &mut Model) -> Action {
    let event = el.attr_or_empty("event").to_string();
    model.add_concrete_event(&event);
    Action::Raise { event }
}

fn parse_params(el: &Element) -> Vec<Param> {
    el.find_all_children(TAG_PARAM)
        .into_iter()
        .map(|p| Param {
            name: p.attr_or_empty("name").to_string(),
            expr: p.attr_or_empty("expr").to_string(),
            location: p.attr_or_empty("location").to_string(),
        })
        .collect()
}

fn parse_content(el: &Element) -> (String, String) {
    match el.find_first_child(TAG_CONTENT) {
        Some(c) => (c.text.clone(), c.attr_or_empty("expr").to_string()),
        None => (String::new(), String::new()),
    }
}

fn parse_send(el: &Element, model: &mut Model) -> Action {
    let event = el.attr_or_empty("event").to_string();
    let event_expr = el.attr_or_empty("eventexpr").to_string();
    let target = el.attr_or_empty("target").to_string();
    let target_expr = el.attr_or_empty("targetexpr").to_string();
    let delay = el.attr_or_empty("delay").to_string();
    let delay_expr = el.attr_or_empty("delayexpr").to_string();
    let send_type = el.attr_or_empty("type").to_string();

    model.add_concrete_event(&event);

    let any_dynamic = !event_expr.is_empty()
        || !target_expr.is_empty()
        || !delay_expr.is_empty()
        || el.attr("typeexpr").map(|s| !s.is_empty()).unwrap_or(false);
    if any_dynamic {
        model.has_dynamic_expressions = true;
        model.needs_jsengine = true;
    }

    if target == "#_parent" {
        model.has_parent_communication = true;
    }
    if target == "#_child" {
        model.has_child_communication = true;
    }

    let (content, content_expr) = parse_content(el);

    Action::Send {
        event,
        event_expr,
        target,
        target_expr,
        send_type,
        delay,
        delay_expr,
        id: el.attr_or_empty("id").to_string(),
        id_location: el.attr_or_empty("idlocation").to_string(),
        namelist: el.attr_or_empty("namelist").to_string(),
        params: parse_params(el),
        content,
        content_expr,
    }
}

fn parse_assign(el: &Element, model: &mut Model) -> Action {
    model.needs_jsengine = true;
    Action::Assign {
        location: el.attr_or_empty("location").to_string(),
        expr: el.attr_or_empty("expr").to_string(),
    }
}

fn parse_if(el: &Element, model: &mut Model) -> Action {
    let then_cond = build_expression(el.attr_or_empty("cond"));
    record_in_predicate_flags(&then_cond, model);

    let mut then_actions = Vec::new();
    let mut elseif_branches: Vec<IfBranch> = Vec::new();
    let mut else_actions: Option<Vec<Action>> = None;
    let mut current: &mut Vec<Action> = &mut then_actions;

    for child in el.scxml_children() {
        match child.name.as_str() {
            TAG_ELSEIF => {
                let cond = build_expression(child.attr_or_empty("cond"));
                record_in_predicate_flags(&cond, model);
                elseif_branches.push(IfBranch {
                    cond,
                    actions: Vec::new(),
                });
                current = &mut elseif_branches.last_mut().unwrap().actions;
            }
            TAG_ELSE => {
                else_actions = Some(Vec::new());
                current = else_actions.as_mut().unwrap();
            }
            _ => {
                if let Some(action) = parse_one(child, model) {
                    current.push(action);
                }
            }
        }
    }

    Action::If {
        then_branch: IfBranch {
            cond: then_cond,
            actions: then_actions,
        },
        elseif_branches,
        else_actions,
    }
}

fn record_in_predicate_flags(expr: &Expression, model: &mut Model) {
    if expr.raw.contains("In(") {
        model.uses_in_predicate = true;
    }
    if matches!(expr.kind, ExpressionKind::NeedsEngine | ExpressionKind::ReferencesEventMeta) {
        model.needs_jsengine = true;
    }
}

fn parse_foreach(el: &Element, model: &mut Model) -> Action {
    model.needs_jsengine = true;
    let actions = parse_actions(el, model);
    Action::ForEach {
        array: el.attr_or_empty("array").to_string(),
        item: el.attr_or_empty("item").to_string(),
        index: el.attr_or_empty("index").to_string(),
        actions,
    }
}

fn parse_log(el: &Element) -> Action {
    Action::Log {
        label: el.attr_or_empty("label").to_string(),
        expr: el.attr_or_empty("expr").to_string(),
    }
}

fn parse_script(el: &Element, model: &mut Model) -> Action {
    model.needs_jsengine = true;
    Action::Script {
        src: el.attr_or_empty("src").to_string(),
        content: el.text.clone(),
    }
}

fn parse_cancel(el: &Element) -> Action {
    Action::Cancel {
        send_id: el.attr_or_empty("sendid").to_string(),
        send_id_expr: el.attr_or_empty("sendidexpr").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml_reader::parse_document;
    use std::path::Path;

    fn children_of(xml: &str) -> Element {
        parse_document(xml.as_bytes(), Path::new("t.scxml")).unwrap()
    }

    #[test]
    fn raise_adds_concrete_event() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml"><raise event="go"/></onentry>"#,
        );
        let mut model = Model::new("t");
        let actions = parse_actions(&root, &mut model);
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], Action::Raise { event } if event == "go"));
        assert!(model.events.contains("go"));
    }

    #[test]
    fn send_with_dynamic_target_sets_flags() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml">
                 <send targetexpr="dest" event="ping"/>
               </onentry>"#,
        );
        let mut model = Model::new("t");
        parse_actions(&root, &mut model);
        assert!(model.has_dynamic_expressions);
        assert!(model.needs_jsengine);
    }

    #[test]
    fn send_to_parent_and_child() {
        let root = children_of(
            r##"<onentry xmlns="http://www.w3.org/2005/07/scxml">
                 <send target="#_parent" event="a"/>
                 <send target="#_child" event="b"/>
               </onentry>"##,
        );
        let mut model = Model::new("t");
        parse_actions(&root, &mut model);
        assert!(model.has_parent_communication);
        assert!(model.has_child_communication);
    }

    #[test]
    fn assign_sets_jsengine() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml"><assign location="x" expr="1"/></onentry>"#,
        );
        let mut model = Model::new("t");
        parse_actions(&root, &mut model);
        assert!(model.needs_jsengine);
    }

    #[test]
    fn if_elseif_else_branches_in_order() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml">
                 <if cond="In('a')">
                   <log label="then"/>
                   <elseif cond="In('b')"/>
                   <log label="elseif"/>
                   <else/>
                   <log label="else"/>
                 </if>
               </onentry>"#,
        );
        let mut model = Model::new("t");
        let actions = parse_actions(&root, &mut model);
        match &actions[0] {
            Action::If {
                then_branch,
                elseif_branches,
                else_actions,
            } => {
                assert!(then_branch.cond.is_pure_in_predicate);
                assert_eq!(then_branch.actions.len(), 1);
                assert_eq!(elseif_branches.len(), 1);
                assert_eq!(elseif_branches[0].actions.len(), 1);
                assert_eq!(else_actions.as_ref().unwrap().len(), 1);
            }
            _ => panic!("expected If"),
        }
        assert!(model.uses_in_predicate);
        assert!(!model.needs_jsengine);
    }

    #[test]
    fn if_with_inline_constant_guard_does_not_need_jsengine() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml">
                 <if cond="42"><log label="then"/></if>
               </onentry>"#,
        );
        let mut model = Model::new("t");
        parse_actions(&root, &mut model);
        assert!(!model.needs_jsengine);
    }

    #[test]
    fn foreach_sets_jsengine_and_parses_body() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml">
                 <foreach array="items" item="it"><log expr="it"/></foreach>
               </onentry>"#,
        );
        let mut model = Model::new("t");
        let actions = parse_actions(&root, &mut model);
        assert!(model.needs_jsengine);
        match &actions[0] {
            Action::ForEach { actions, .. } => assert_eq!(actions.len(), 1),
            _ => panic!("expected ForEach"),
        }
    }

    #[test]
    fn script_sets_jsengine() {
        let root = children_of(
            r#"<onentry xmlns="http://www.w3.org/2005/07/scxml"><script>x=1;</script></onentry>"#,
        );
        let mut model = Model::new("t");
        let actions = parse_actions(&root, &mut model);
        assert!(model.needs_jsengine);
        assert!(matches!(&actions[0], Action::Script{ content, .. } if content == "x=1;"));
    }
}
