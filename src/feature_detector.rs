//! Final sweep over resolved transition guards for event-metadata
//! references, aggregating the flags set incrementally during parsing.

use crate::expression_classifier::{classify, EventMetaField};
use crate::model::Model;

/// Summary record mirroring the feature flags on `Model`, useful for the
/// CLI surface and for anything that wants the flags without importing the
/// full `Model` type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSummary {
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
}

/// Scans every transition's guard for `_event.*` references and updates
/// `has_event_metadata`, `needs_jsengine`, and the per-field flags.
pub fn detect(model: &mut Model) -> FeatureSummary {
    let mut fields_to_set = Vec::new();
    let mut found_event_meta = false;
    for state in model.states.values() {
        for transition in &state.transitions {
            let classification = classify(&transition.cond.raw);
            if classification.event_meta_fields.is_empty() {
                continue;
            }
            found_event_meta = true;
            for field in classification.event_meta_fields {
                fields_to_set.push(field);
            }
        }
    }
    if found_event_meta {
        model.has_event_metadata = true;
        model.needs_jsengine = true;
    }
    for field in fields_to_set {
        set_event_meta_flag(model, field);
    }

    FeatureSummary {
        has_dynamic_expressions: model.has_dynamic_expressions,
        has_parallel_states: model.has_parallel_states,
        has_history_states: model.has_history_states,
        has_invoke: model.has_invoke,
        has_dynamic_invoke: model.has_dynamic_invoke,
        has_event_metadata: model.has_event_metadata,
        has_parent_communication: model.has_parent_communication,
        has_child_communication: model.has_child_communication,
        needs_jsengine: model.needs_jsengine,
        uses_in_predicate: model.uses_in_predicate,
        has_transition_actions: model.has_transition_actions,
    }
}

fn set_event_meta_flag(model: &mut Model, field: EventMetaField) {
    match field {
        EventMetaField::Name => model.needs_event_name = true,
        EventMetaField::Data => model.needs_event_data = true,
        EventMetaField::Type => model.needs_event_type = true,
        EventMetaField::SendId => model.needs_event_sendid = true,
        EventMetaField::Origin => model.needs_event_origin = true,
        EventMetaField::OriginType => model.needs_event_origintype = true,
        EventMetaField::InvokeId => model.needs_event_invokeid = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_resolver;
    use crate::state_tree_builder::build;
    use crate::xml_reader::parse_document;
    use std::path::Path;

    fn build_and_detect(xml: &str) -> Model {
        let root = parse_document(xml.as_bytes(), Path::new("t.scxml")).unwrap();
        let mut model = Model::new("t");
        build(&root, &mut model, Path::new("t.scxml"), None);
        model_resolver::resolve(&mut model);
        detect(&mut model);
        model
    }

    #[test]
    fn s4_pure_in_guard_does_not_need_jsengine() {
        let model = build_and_detect(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <state id="a"><transition event="go" cond="In('s1') &amp;&amp; In('s2')"/></state>
               </scxml>"#,
        );
        let transition = &model.states["a"].transitions[0];
        assert!(transition.cond.is_pure_in_predicate);
        assert_eq!(
            transition.cond.native,
            "isStateActive(\"s1\") && isStateActive(\"s2\")"
        );
        assert!(!model.needs_jsengine);
        assert!(model.uses_in_predicate);
    }

    #[test]
    fn s5_mixed_guard_needs_jsengine() {
        let model = build_and_detect(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <state id="a"><transition event="go" cond="In('s1') &amp;&amp; typeof x !== 'undefined'"/></state>
               </scxml>"#,
        );
        let transition = &model.states["a"].transitions[0];
        assert!(!transition.cond.is_pure_in_predicate);
        assert!(model.needs_jsengine);
    }

    #[test]
    fn event_metadata_guard_sets_field_flag() {
        let model = build_and_detect(
            r#"<scxml xmlns="http://www.w3.org/2005/07/scxml">
                 <state id="a"><transition event="go" cond="_event.origin == 'x'"/></state>
               </scxml>"#,
        );
        assert!(model.has_event_metadata);
        assert!(model.needs_event_origin);
        assert!(model.needs_jsengine);
    }
}
