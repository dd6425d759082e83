//! Post-parse resolution passes: deep-initial resolution, parallel-initial
//! overrides, history target resolution, parallel region computation, and
//! transition-action detection.
//!
//! Resolution never fails: dangling targets are left as authored for a
//! downstream generator or validator to report.

const MAX_DEPTH: u32 = 20;

use crate::model::Model;

pub fn resolve(model: &mut Model) {
    resolve_deep_initial(model);
    resolve_history_targets(model);
    compute_parallel_regions(model);
    detect_transition_actions(model);
}

/// If `model.initial` names more than one state and all of them exist,
/// it is a parallel-initial list: apply the per-region override and leave
/// it as a list. If it names more than one token but not all of them
/// exist, apply overrides for whichever tokens do exist, then fall back to
/// the raw first token without further leaf resolution. Otherwise resolve
/// the single token down to a leaf, capped at `MAX_DEPTH` to tolerate
/// cycles. All three cases mirror the parser this module is modeled on.
fn resolve_deep_initial(model: &mut Model) {
    let tokens: Vec<String> = model.initial.split_whitespace().map(String::from).collect();

    if tokens.len() > 1 {
        apply_parallel_initial_overrides(model, &tokens);
        model.initial = tokens[0].clone();
        return;
    }

    let start = tokens.first().cloned().unwrap_or_default();
    model.initial = resolve_to_leaf(model, &start);
}

fn resolve_to_leaf(model: &Model, start: &str) -> String {
    let mut current = start.to_string();
    for _ in 0..MAX_DEPTH {
        match model.states.get(&current) {
            Some(state) if !state.initial.is_empty() && model.states.contains_key(&state.initial) => {
                current = state.initial.clone();
            }
            _ => break,
        }
    }
    current
}

fn apply_parallel_initial_overrides(model: &mut Model, tokens: &[String]) {
    for token in tokens {
        let parent = model.states.get(token.as_str()).and_then(|s| s.parent.clone());
        if let Some(parent_id) = parent {
            if let Some(parent_state) = model.states.get_mut(&parent_id) {
                parent_state.initial = token.to_string();
            }
        }
    }
}

fn resolve_history_targets(model: &mut Model) {
    let ids: Vec<String> = model.history_states.keys().cloned().collect();
    for id in ids {
        let default_target = model.history_states[&id].default_target.clone();
        let leaf = if default_target.is_empty() {
            String::new()
        } else {
            resolve_to_leaf(model, &default_target)
        };
        if let Some(info) = model.history_states.get_mut(&id) {
            info.leaf_target = if leaf.is_empty() { id.clone() } else { leaf };
        }
    }

    let history_ids: std::collections::HashSet<String> =
        model.history_states.keys().cloned().collect();

    for state in model.states.values_mut() {
        for transition in &mut state.transitions {
            if history_ids.contains(&transition.target) {
                transition.history_target = Some(transition.target.clone());
            }
        }
        if history_ids.contains(&state.initial) {
            if let Some(info) = model.history_states.get(&state.initial) {
                state.initial = info.leaf_target.clone();
            }
        }
    }
}

fn compute_parallel_regions(model: &mut Model) {
    model.parallel_regions.clear();
    let parallel_ids: Vec<String> = model
        .states
        .values()
        .filter(|s| matches!(s.kind, crate::model::StateKind::Parallel))
        .map(|s| s.id.clone())
        .collect();

    for parallel_id in parallel_ids {
        let mut children: Vec<&crate::model::State> = model
            .states
            .values()
            .filter(|s| s.parent.as_deref() == Some(parallel_id.as_str()))
            .collect();
        children.sort_by_key(|s| s.document_order);
        let ids = children.into_iter().map(|s| s.id.clone()).collect();
        model.parallel_regions.insert(parallel_id, ids);
    }
}

fn detect_transition_actions(model: &mut Model) {
    model.has_transition_actions = model
        .states
        .values()
        .flat_map(|s| s.transitions.iter())
        .any(|t| !t.actions.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_tree_builder::build;
    use crate::xml_reader::parse_document;
    use std::path::Path;

    fn build_and_resolve(xml: &str) -> Model {
        let root = parse_document(xml.as_bytes(), Path::new("t.scxml")).unwrap();
        let mut model = Model::new("t");
        build(&root, &mut model, Path::new("t.scxml"), None);
        resolve(&mut model);
        model
    }

    #[test]
    fn s2_deep_initial_resolves_to_leaf() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" initial="s0">
                 <state id="s0" initial="s01"><state id="s01"/></state>
               </scxml>"#,
        );
        assert_eq!(model.initial, "s01");
    }

    #[test]
    fn s3_parallel_initial_override() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" initial="s2p112 s2p122">
                 <parallel id="s2p1">
                   <state id="s2p11" initial="s2p111">
                     <state id="s2p111"/><state id="s2p112"/>
                   </state>
                   <state id="s2p12" initial="s2p121">
                     <state id="s2p121"/><state id="s2p122"/>
                   </state>
                 </parallel>
               </scxml>"#,
        );
        assert_eq!(model.states["s2p11"].initial, "s2p112");
        assert_eq!(model.states["s2p12"].initial, "s2p122");
        assert_eq!(
            model.parallel_regions["s2p1"],
            vec!["s2p11".to_string(), "s2p12".to_string()]
        );
    }

    #[test]
    fn s6_history_leaf_target_and_transition_tag() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <state id="p">
                   <history id="h"><transition target="x"/></history>
                   <state id="x" initial="x1"><state id="x1"/></state>
                   <state id="y"><transition event="go" target="h"/></state>
                 </state>
               </scxml>"#,
        );
        assert_eq!(model.history_states["h"].leaf_target, "x1");
        let transition = &model.states["y"].transitions[0];
        assert_eq!(transition.target, "h");
        assert_eq!(transition.history_target.as_deref(), Some("h"));
    }

    #[test]
    fn multi_token_initial_with_missing_state_falls_back_to_first() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" initial="a missing">
                 <state id="a"/>
               </scxml>"#,
        );
        assert_eq!(model.initial, "a");
    }

    #[test]
    fn multi_token_initial_overrides_existing_tokens_even_when_others_missing() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" initial="s2p112 missing">
                 <parallel id="s2p1">
                   <state id="s2p11" initial="s2p111">
                     <state id="s2p111"/><state id="s2p112"/>
                   </state>
                 </parallel>
               </scxml>"#,
        );
        assert_eq!(model.initial, "s2p112");
        assert_eq!(model.states["s2p11"].initial, "s2p112");
    }

    #[test]
    fn dangling_target_is_left_as_is() {
        let model = build_and_resolve(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <state id="a"><transition event="go" target="nowhere"/></state>
               </scxml>"#,
        );
        assert_eq!(model.states["a"].transitions[0].target, "nowhere");
    }
}
