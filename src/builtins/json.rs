//! JSON documents.
//!
//! `JSONGET$` paths are dot-separated; numeric segments index arrays, so
//! `"items.0.name"` is the name of the first item.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{RuntimeError, Vm};

pub(super) fn register(registry: &mut Registry) {
    registry.register_function(Builtin::function("JSONPARSE", Type::Json, vec![Type::String], parse));
    registry.register_function(Builtin::function(
        "JSONGET$",
        Type::String,
        vec![Type::Json, Type::String],
        get,
    ));
    registry.register_function(Builtin::function("JSONSTR$", Type::String, vec![Type::Json], stringify));
}

fn pop_json(vm: &mut Vm) -> Result<serde_json::Value, RuntimeError> {
    match vm.pop_value()? {
        Value::Json(json) => Ok(json),
        Value::Null => Ok(serde_json::Value::Null),
        other => Err(RuntimeError::type_mismatch(format!(
            "expected JSON, found {}",
            other.type_name()
        ))),
    }
}

/// Malformed text is a recoverable error that yields a null document.
fn parse(vm: &mut Vm) -> Result<(), RuntimeError> {
    let text = vm.pop_string()?;
    let json = serde_json::from_str(&text).map_err(|err| {
        RuntimeError::illegal_call(format!("invalid JSON: {}", err)).recoverable()
    })?;
    vm.push(Value::Json(json));
    Ok(())
}

/// The value at `path`: strings unquoted, anything else as JSON text, ""
/// when the path does not exist.
fn get(vm: &mut Vm) -> Result<(), RuntimeError> {
    let path = vm.pop_string()?;
    let json = pop_json(vm)?;
    let text = match lookup(&json, &path) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    vm.push(Value::String(text));
    Ok(())
}

fn lookup<'j>(json: &'j serde_json::Value, path: &str) -> Option<&'j serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(json, |node, segment| match node {
            serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            serde_json::Value::Object(map) => map.get(segment),
            _ => None,
        })
}

fn stringify(vm: &mut Vm) -> Result<(), RuntimeError> {
    let json = pop_json(vm)?;
    vm.push(Value::String(json.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::testing::run;
    use serde_json::json;

    #[test]
    fn test_lookup_paths() {
        let doc = json!({"items": [{"name": "a"}, {"name": "b"}], "n": 3});
        assert_eq!(lookup(&doc, "items.1.name"), Some(&json!("b")));
        assert_eq!(lookup(&doc, "n"), Some(&json!(3)));
        assert_eq!(lookup(&doc, ""), Some(&doc));
        assert_eq!(lookup(&doc, "items.9"), None);
        assert_eq!(lookup(&doc, "n.x"), None);
    }

    #[test]
    fn test_parse_and_get() {
        let source = r#"
DIM doc AS JSON
doc = JSONPARSE("{""user"": {""name"": ""Ada"", ""tags"": [1, 2]}}")
PRINT JSONGET$(doc, "user.name"); "|"; JSONGET$(doc, "user.tags"); "|"; JSONGET$(doc, "missing")
"#;
        assert_eq!(run(source), "Ada|[1,2]|\n");
    }

    #[test]
    fn test_invalid_json_sets_err() {
        let source = "DIM doc AS JSON\ndoc = JSONPARSE(\"{oops\")\nPRINT ERR; JSONSTR$(doc)";
        assert_eq!(run(source), "5null\n");
    }
}
