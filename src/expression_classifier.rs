//! Static classification of guard and value expressions.
//!
//! The classifier never evaluates anything; it only decides which runtime
//! facility a generated consumer will need to give the expression meaning.

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{Expression, ExpressionKind};

lazy_static! {
    /// The grammar this recognizes is the specification itself: any number
    /// of `In('literal')` terms combined with `&&`, `||`, parentheses and
    /// whitespace, and nothing else.
    static ref PURE_IN_RE: Regex =
        Regex::new(r"^[\s()&|]*(?:In\('[^']+'\)[\s()&|]*)+$").unwrap();
    static ref IN_CALL_RE: Regex = Regex::new(r"In\('([^']+)'\)").unwrap();
}

const PURE_IN_REJECT: &[&str] = &[
    "typeof", "_event", "function", "var ", "let ", "const ", "return",
];

const NEEDS_ENGINE_MARKERS: &[&str] = &[
    "typeof", "_event.", "function", "var ", "let ", "const ",
];

/// `_event.*` paths understood by the feature detector, paired with the
/// model flag each one sets.
pub const EVENT_META_PATHS: &[(&str, EventMetaField)] = &[
    ("_event.origin", EventMetaField::Origin),
    ("_event.origintype", EventMetaField::OriginType),
    ("_event.sendid", EventMetaField::SendId),
    ("_event.invokeid", EventMetaField::InvokeId),
    ("_event.type", EventMetaField::Type),
    ("_event.name", EventMetaField::Name),
    ("_event.data", EventMetaField::Data),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMetaField {
    Name,
    Data,
    Type,
    SendId,
    Origin,
    OriginType,
    InvokeId,
}

const RESERVED_WORDS: &[&str] = &[
    "return", "break", "continue", "goto", "switch", "case", "default", "if", "else", "while",
    "do", "for", "class", "struct", "typedef", "using", "namespace", "template", "typename",
    "static", "extern", "inline", "virtual", "operator", "new", "delete", "this", "throw", "try",
    "catch", "public", "private", "protected",
];

/// Result of classifying one expression.
pub struct Classification {
    pub kind: ExpressionKind,
    pub event_meta_fields: Vec<EventMetaField>,
}

/// Normalizes XML-escaped boolean operators so `cond="In('a') &amp;&amp;
/// In('b')"` is recognized the same as its unescaped form.
fn normalize_operators(expr: &str) -> String {
    expr.replace("&amp;&amp;", "&&").replace("&amp;|", "||")
}

fn lower_pure_in(normalized: &str) -> String {
    IN_CALL_RE
        .replace_all(normalized, |caps: &regex::Captures| {
            format!("isStateActive(\"{}\")", &caps[1])
        })
        .into_owned()
}

fn matches_reserved_word(trimmed: &str) -> bool {
    for word in RESERVED_WORDS {
        if trimmed == *word {
            return true;
        }
        if let Some(rest) = trimmed.strip_prefix(word) {
            match rest.chars().next() {
                Some(c) if c.is_alphanumeric() || c == '_' => {}
                _ => return true,
            }
        }
    }
    false
}

/// Classifies a single expression string per the algorithm this module is
/// modeled after: empty, pure `In()`, needs-engine, or event-metadata
/// reference, with `pure_in` checked ahead of the reserved-word test so
/// that a guard like `In('s')` is never misclassified.
pub fn classify(raw: &str) -> Classification {
    if raw.is_empty() {
        return Classification {
            kind: ExpressionKind::Empty,
            event_meta_fields: Vec::new(),
        };
    }

    if raw.contains("In(") {
        let normalized = normalize_operators(raw);
        let is_pure = PURE_IN_RE.is_match(&normalized)
            && !PURE_IN_REJECT.iter().any(|bad| normalized.contains(bad));
        if is_pure {
            return Classification {
                kind: ExpressionKind::PureIn,
                event_meta_fields: Vec::new(),
            };
        }
        return Classification {
            kind: ExpressionKind::NeedsEngine,
            event_meta_fields: event_meta_fields_in(raw),
        };
    }

    if NEEDS_ENGINE_MARKERS.iter().any(|m| raw.contains(m)) {
        let fields = event_meta_fields_in(raw);
        if !fields.is_empty() {
            return Classification {
                kind: ExpressionKind::ReferencesEventMeta,
                event_meta_fields: fields,
            };
        }
        return Classification {
            kind: ExpressionKind::NeedsEngine,
            event_meta_fields: Vec::new(),
        };
    }

    let trimmed = raw.trim();
    if matches_reserved_word(trimmed) {
        return Classification {
            kind: ExpressionKind::NeedsEngine,
            event_meta_fields: Vec::new(),
        };
    }

    Classification {
        kind: ExpressionKind::Inline,
        event_meta_fields: Vec::new(),
    }
}

fn event_meta_fields_in(raw: &str) -> Vec<EventMetaField> {
    EVENT_META_PATHS
        .iter()
        .filter(|(path, _)| raw.contains(path))
        .map(|(_, field)| *field)
        .collect()
}

/// Builds the `Expression` value stored on a `Transition` or `Action`.
pub fn build_expression(raw: &str) -> Expression {
    let classification = classify(raw);
    let is_pure_in = matches!(classification.kind, ExpressionKind::PureIn);
    let native = if is_pure_in {
        lower_pure_in(&normalize_operators(raw))
    } else {
        String::new()
    };
    Expression {
        raw: raw.to_string(),
        kind: classification.kind,
        is_pure_in_predicate: is_pure_in,
        native,
    }
}
