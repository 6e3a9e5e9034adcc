//! Human-readable rendering of values
//!
//! [`inspect`] produces a compact single-line rendering in the style of a
//! REPL inspector (`[ 1, 2 ]`, `{ a: 'x' }`, `[Function: name]`).
//! [`truncate`] bounds the width of rendered values in messages.

use crate::value::{ArrayRef, ObjectRef, Value};
use std::fmt::Write as _;

/// Default width for rendered values in messages
pub const DEFAULT_MAX_WIDTH: usize = 80;

/// Marker appended to truncated renderings
pub const OMISSION: &str = " [...]";

/// Render a value
#[must_use]
pub fn inspect(value: &Value) -> String {
    let mut out = String::new();
    Inspector::default().write(&mut out, value);
    out
}

/// Render an argument list without surrounding brackets
#[must_use]
pub fn inspect_args(args: &[Value]) -> String {
    let mut out = String::new();
    let mut inspector = Inspector::default();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        inspector.write(&mut out, arg);
    }
    out
}

/// Collapse line breaks (and the indentation that follows them) into a single space
#[must_use]
pub fn collapse_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            while chars.peek() == Some(&' ') {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Bound `text` to `max_width` characters, ending with [`OMISSION`] when cut
#[must_use]
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let keep = max_width.saturating_sub(OMISSION.chars().count());
    if keep == 0 {
        return OMISSION.to_string();
    }
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(OMISSION);
    out
}

/// Inspect, collapse and truncate in one step
#[must_use]
pub fn for_display(value: &Value, max_width: usize) -> String {
    truncate(&collapse_lines(&inspect(value)), max_width)
}

/// Inspect an argument list, collapse and truncate
#[must_use]
pub fn args_for_display(args: &[Value], max_width: usize) -> String {
    truncate(&collapse_lines(&inspect_args(args)), max_width)
}

#[derive(Default)]
struct Inspector {
    stack: Vec<usize>,
}

impl Inspector {
    fn write(&mut self, out: &mut String, value: &Value) {
        match value {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::String(s) => write_quoted(out, s),
            Value::Array(items) => self.write_array(out, items),
            Value::Object(fields) => self.write_object(out, fields),
            Value::Function(cb) => match cb.name() {
                Some(name) => {
                    let _ = write!(out, "[Function: {name}]");
                }
                None => out.push_str("[Function (anonymous)]"),
            },
            Value::Instance(inst) => {
                out.push_str(inst.class());
                out.push(' ');
                self.write_object(out, inst.fields());
            }
            Value::Wrapped(w) => {
                out.push_str("Wrapped(");
                self.write(out, w.value());
                out.push(')');
            }
        }
    }

    fn write_array(&mut self, out: &mut String, items: &ArrayRef) {
        if self.stack.contains(&items.addr()) {
            out.push_str("[Circular]");
            return;
        }
        let snapshot = items.snapshot();
        if snapshot.is_empty() {
            out.push_str("[]");
            return;
        }

        self.stack.push(items.addr());
        out.push_str("[ ");
        for (i, item) in snapshot.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write(out, item);
        }
        out.push_str(" ]");
        self.stack.pop();
    }

    fn write_object(&mut self, out: &mut String, fields: &ObjectRef) {
        if self.stack.contains(&fields.addr()) {
            out.push_str("[Circular]");
            return;
        }
        let snapshot = fields.snapshot();
        if snapshot.is_empty() {
            out.push_str("{}");
            return;
        }

        self.stack.push(fields.addr());
        out.push_str("{ ");
        for (i, (key, v)) in snapshot.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if is_identifier(key) {
                out.push_str(key);
            } else {
                write_quoted(out, key);
            }
            out.push_str(": ");
            self.write(out, v);
        }
        out.push_str(" }");
        self.stack.pop();
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callback;
    use pretty_assertions::assert_eq;

    #[test]
    fn inspect_scalars() {
        assert_eq!(inspect(&Value::Undefined), "undefined");
        assert_eq!(inspect(&Value::from(3)), "3");
        assert_eq!(inspect(&Value::from(-0.5)), "-0.5");
        assert_eq!(inspect(&Value::Number(f64::NEG_INFINITY)), "-Infinity");
        assert_eq!(inspect(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(inspect(&Value::from("it's")), r"'it\'s'");
    }

    #[test]
    fn inspect_containers() {
        let v = Value::array([
            Value::object([("a", 1)]),
            Value::object([("a", 2)]),
        ]);
        assert_eq!(inspect(&v), "[ { a: 1 }, { a: 2 } ]");
        assert_eq!(inspect(&Value::array(Vec::<Value>::new())), "[]");
        assert_eq!(inspect(&Value::object([("two words", true)])), "{ 'two words': true }");
        assert_eq!(inspect(&Value::instance("Bar", [("a", 1)])), "Bar { a: 1 }");
    }

    #[test]
    fn inspect_functions() {
        assert_eq!(inspect(&Value::from(Callback::identity())), "[Function: identity]");
        assert_eq!(
            inspect(&Value::from(Callback::new(|_| Ok(Value::Null)))),
            "[Function (anonymous)]"
        );
    }

    #[test]
    fn inspect_marks_cycles() {
        let v = Value::array([1]);
        let inner = v.clone();
        v.as_array().unwrap().write().push(inner);
        assert_eq!(inspect(&v), "[ 1, [Circular] ]");
    }

    #[test]
    fn args_render_without_brackets() {
        let args = [Value::array([1, 2, 3]), Value::from(2)];
        assert_eq!(inspect_args(&args), "[ 1, 2, 3 ], 2");
        assert_eq!(inspect_args(&[]), "");
    }

    #[test]
    fn collapse_joins_lines() {
        assert_eq!(collapse_lines("a\n    b\nc"), "a b c");
    }

    #[test]
    fn truncate_bounds_width() {
        assert_eq!(truncate("short", 80), "short");
        let long = "x".repeat(100);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 80);
        assert!(cut.ends_with(OMISSION));
        assert_eq!(truncate("abcdefgh", 3), OMISSION);
    }

    #[test]
    fn truncate_counts_chars() {
        let s = "é".repeat(10);
        assert_eq!(truncate(&s, 10), s);
        assert_eq!(truncate(&s, 8), format!("{}{OMISSION}", "é".repeat(2)));
    }

    #[test]
    fn truncate_does_not_trim_kept_prefix() {
        assert_eq!(truncate("ab cdefghij", 9), "ab  [...]");
    }
}
