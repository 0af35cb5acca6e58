//! Merging of chart override lines into a values tree.
//!
//! Each override uses the helm `--set` syntax: comma-separated `path=value`
//! assignments where the path is dotted and may carry `[n]` list indices.
//! Values are typed the way helm types them: `true`, `false`, `null` and
//! integers without a leading zero become JSON scalars, `{a,b}` becomes a
//! list, anything else stays a string. A backslash escapes the next character.

use dc_k8s::{Error, Result};
use serde_json::{Map, Value};

/// Upper bound on list indices, matching helm.
const MAX_INDEX: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Merge override lines, in order, into one values object. Empty lines are
/// kept by the caller but contribute nothing here.
pub fn merge_overrides(overrides: &[String]) -> Result<Value> {
    let mut values = Value::Object(Map::new());
    for line in overrides {
        if line.is_empty() {
            continue;
        }
        parse_into(line, &mut values)?;
    }
    Ok(values)
}

/// Apply every assignment of one override line to `values`.
pub fn parse_into(line: &str, values: &mut Value) -> Result<()> {
    for assignment in split_unescaped(line, ',') {
        if assignment.is_empty() {
            continue;
        }
        let mut halves = split_unescaped(&assignment, '=').into_iter();
        let key = halves.next().unwrap_or_default();
        let raw: Vec<String> = halves.collect();
        if raw.is_empty() {
            return Err(Error::validation(format!("key \"{key}\" has no value")));
        }
        let path = parse_path(&key)?;
        set(values, &path, typed_value(&raw.join("=")));
    }
    Ok(())
}

/// Split on `separator` outside escapes and `{...}` groups. Escapes are kept.
fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == separator && depth == 0 => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_path(key: &str) -> Result<Vec<Segment>> {
    let mut path = Vec::new();
    for part in split_unescaped(key, '.') {
        let (name, mut rest) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part.as_str(), ""),
        };
        if name.is_empty() {
            return Err(Error::validation(format!("invalid key \"{key}\": empty path segment")));
        }
        path.push(Segment::Key(unescape(name)));

        while let Some(body) = rest.strip_prefix('[') {
            let close = body.find(']').ok_or_else(|| {
                Error::validation(format!("invalid key \"{key}\": unterminated index"))
            })?;
            let index: usize = body[..close].parse().map_err(|_| {
                Error::validation(format!("invalid key \"{key}\": bad index \"{}\"", &body[..close]))
            })?;
            if index > MAX_INDEX {
                return Err(Error::validation(format!(
                    "invalid key \"{key}\": index {index} exceeds {MAX_INDEX}"
                )));
            }
            path.push(Segment::Index(index));
            rest = &body[close + 1..];
        }
        if !rest.is_empty() {
            return Err(Error::validation(format!("invalid key \"{key}\": trailing \"{rest}\"")));
        }
    }
    Ok(path)
}

fn typed_value(raw: &str) -> Value {
    if let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        return Value::Array(
            split_unescaped(inner, ',')
                .iter()
                .map(|item| scalar(&unescape(item)))
                .collect(),
        );
    }
    scalar(&unescape(raw))
}

fn scalar(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if value.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if value == "0" {
        return Value::from(0);
    }
    if !value.starts_with('0') {
        if let Ok(int) = value.parse::<i64>() {
            return Value::from(int);
        }
    }
    Value::String(value.to_string())
}

fn set(target: &mut Value, path: &[Segment], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return;
    };
    match head {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                set(slot, rest, value);
            }
        }
        Segment::Index(index) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(list) = target {
                if list.len() <= *index {
                    list.resize(index + 1, Value::Null);
                }
                set(&mut list[*index], rest, value);
            }
        }
    }
}
