// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::Value;
use thiserror::Error;

use crate::interpreter::SchemaInterpreter;

#[derive(Debug, Error)]
pub enum TypeParserError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coercion for a schema type name the interpreter doesn't know.
pub trait TypeParser: Send + Sync {
    /// Parse `value` (the field's raw value). The interpreter is passed along so that composite
    /// types can shape their own nested fields.
    fn parse(&self, value: &Value, interpreter: &SchemaInterpreter)
    -> Result<Value, TypeParserError>;
}

struct FnTypeParser<F>(F);

impl<F> TypeParser for FnTypeParser<F>
where
    F: Fn(&Value, &SchemaInterpreter) -> Result<Value, TypeParserError> + Send + Sync,
{
    fn parse(
        &self,
        value: &Value,
        interpreter: &SchemaInterpreter,
    ) -> Result<Value, TypeParserError> {
        (self.0)(value, interpreter)
    }
}

struct TypeParserEntry {
    type_names: Vec<String>,
    parser: Box<dyn TypeParser>,
}

/// Append-only list of custom type parsers.
///
/// Populate it during boot and hand it to [`SchemaInterpreter::new`]; once shared, it can no
/// longer change. When several entries claim the same type name, the earliest registration
/// wins.
#[derive(Default)]
pub struct TypeParserRegistry {
    entries: Vec<TypeParserEntry>,
}

impl TypeParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, S>(&mut self, type_names: I, parser: impl TypeParser + 'static)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_names: Vec<String> = type_names
            .into_iter()
            .map(|name| name.into().to_lowercase())
            .collect();

        tracing::debug!("Registering type parser for {:?}", type_names);

        self.entries.push(TypeParserEntry {
            type_names,
            parser: Box::new(parser),
        });
    }

    pub fn register_fn<I, S, F>(&mut self, type_names: I, parse: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Value, &SchemaInterpreter) -> Result<Value, TypeParserError>
            + Send
            + Sync
            + 'static,
    {
        self.register(type_names, FnTypeParser(parse));
    }

    /// The parser for `type_name` (matched case-insensitively)
    pub fn find(&self, type_name: &str) -> Option<&dyn TypeParser> {
        let type_name = type_name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.type_names.contains(&type_name))
            .map(|entry| entry.parser.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::json;

    struct Upper;

    impl TypeParser for Upper {
        fn parse(
            &self,
            value: &Value,
            _interpreter: &SchemaInterpreter,
        ) -> Result<Value, TypeParserError> {
            value
                .as_str()
                .map(|s| Value::String(s.to_uppercase()))
                .ok_or_else(|| TypeParserError::Invalid("expected a string".to_string()))
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_first_wins() {
        let mut registry = TypeParserRegistry::new();
        registry.register(["Code", "Symbol"], Upper);
        registry.register_fn(["code"], |_: &Value, _: &SchemaInterpreter| Ok(json!("second")));

        assert_eq!(registry.len(), 2);

        let interpreter = SchemaInterpreter::new(Arc::new(TypeParserRegistry::new()));
        let parser = registry.find("CODE").unwrap();
        assert_eq!(parser.parse(&json!("ab"), &interpreter).unwrap(), json!("AB"));

        assert!(registry.find("symbol").is_some());
        assert!(registry.find("unknown").is_none());
    }
}
