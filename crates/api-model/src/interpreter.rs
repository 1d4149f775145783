// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::document::{FieldSpec, FieldType, ParamSchema};
use crate::js::{is_truthy, number_value, parse_float, parse_int, to_js_string};
use crate::type_parser::TypeParserRegistry;

const NAIVE_DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Coerces, defaults, and prunes JSON data according to a [`ParamSchema`].
///
/// The same interpreter shapes inbound parameters and outbound responses. For every key in the
/// union of the data and the schema:
///
/// - a truthy value with a declared field is coerced to the field's type,
/// - an absent key with a declared default takes the default,
/// - a truthy value without a declared field is removed.
///
/// Branch selection follows JavaScript truthiness, not key presence: a falsy value (`0`, `""`,
/// `false`, `null`) is left untouched whether it is declared or not.
pub struct SchemaInterpreter {
    parsers: Arc<TypeParserRegistry>,
}

impl SchemaInterpreter {
    pub fn new(parsers: Arc<TypeParserRegistry>) -> Self {
        Self { parsers }
    }

    pub fn format(&self, data: &mut Map<String, Value>, schema: &ParamSchema) {
        let keys: Vec<String> = data
            .keys()
            .chain(schema.keys().filter(|key| !data.contains_key(*key)))
            .cloned()
            .collect();

        for key in keys {
            let truthy = data.get(&key).is_some_and(is_truthy);

            match schema.get(&key) {
                Some(field) if truthy => {
                    if let Some(value) = data.get_mut(&key) {
                        *value = self.coerce(value.take(), field);
                    }
                }
                Some(field) => {
                    if let (false, Some(default)) = (data.contains_key(&key), &field.default) {
                        data.insert(key, default.clone());
                    }
                }
                None if truthy => {
                    data.shift_remove(&key);
                }
                None => {}
            }
        }
    }

    /// Shape a single value against a field spec, as if it were the only field of an object.
    pub fn format_value(&self, value: Value, field: &FieldSpec) -> Value {
        if is_truthy(&value) {
            self.coerce(value, field)
        } else {
            value
        }
    }

    fn coerce(&self, value: Value, field: &FieldSpec) -> Value {
        match field.field_type() {
            FieldType::String => match value {
                Value::String(_) => value,
                other => Value::String(to_js_string(&other)),
            },
            FieldType::Number => coerce_number(value, parse_float),
            FieldType::Int => coerce_number(value, parse_int),
            FieldType::Array => match (value, &field.item) {
                (Value::Array(items), Some(item)) => Value::Array(
                    items
                        .into_iter()
                        .map(|element| self.format_value(element, item))
                        .collect(),
                ),
                (other, _) => other,
            },
            FieldType::Object => match (value, &field.fields) {
                (Value::Object(mut nested), Some(fields)) => {
                    self.format(&mut nested, fields);
                    Value::Object(nested)
                }
                (other, _) => other,
            },
            FieldType::Date => coerce_date(value),
            FieldType::Custom(type_name) => self.parse_custom(&type_name, value),
            FieldType::Untyped => value,
        }
    }

    fn parse_custom(&self, type_name: &str, value: Value) -> Value {
        let Some(parser) = self.parsers.find(type_name) else {
            return value;
        };

        // a panicking parser fails only its own field
        match catch_unwind(AssertUnwindSafe(|| parser.parse(&value, self))) {
            Ok(Ok(parsed)) => parsed,
            Ok(Err(e)) => {
                tracing::debug!("Type parser for '{}' failed, keeping raw value: {}", type_name, e);
                value
            }
            Err(_) => {
                tracing::debug!("Type parser for '{}' panicked, keeping raw value", type_name);
                value
            }
        }
    }
}

fn coerce_number(value: Value, parse: fn(&str) -> Option<f64>) -> Value {
    if value.is_number() {
        return value;
    }

    match parse(&to_js_string(&value)) {
        Some(n) if n.is_finite() => number_value(n),
        _ => {
            tracing::warn!("Value {} is not a number", value);
            Value::Null
        }
    }
}

/// Dates are accepted as RFC 3339 date-times, `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC),
/// `YYYY-MM-DD`, or epoch milliseconds, and emitted as RFC 3339 UTC with milliseconds.
fn coerce_date(value: Value) -> Value {
    let parsed = match &value {
        Value::String(string) => parse_date(string),
        Value::Number(millis) => millis
            .as_i64()
            .or_else(|| millis.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    };

    match parsed {
        Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => {
            tracing::warn!("Value {} is not a valid date", value);
            Value::Null
        }
    }
}

fn parse_date(string: &str) -> Option<DateTime<Utc>> {
    let string = string.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(string) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(naive_datetime) = NaiveDateTime::parse_from_str(string, NAIVE_DATE_TIME_FORMAT) {
        return Some(naive_datetime.and_utc());
    }

    NaiveDate::parse_from_str(string, NAIVE_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_parser::TypeParserError;
    use serde_json::json;

    fn schema(value: Value) -> ParamSchema {
        serde_json::from_value(value).unwrap()
    }

    fn interpreter() -> SchemaInterpreter {
        SchemaInterpreter::new(Arc::new(TypeParserRegistry::new()))
    }

    fn format_with(interpreter: &SchemaInterpreter, data: Value, schema_value: Value) -> Value {
        let Value::Object(mut data) = data else {
            panic!("test data must be an object");
        };
        interpreter.format(&mut data, &schema(schema_value));
        Value::Object(data)
    }

    fn format(data: Value, schema_value: Value) -> Value {
        format_with(&interpreter(), data, schema_value)
    }

    #[test]
    fn builtin_types_from_strings() {
        let formatted = format(
            json!({
                "name": 42,
                "price": "19.5",
                "weight": "2kg",
                "count": "7",
                "rounded": "7.9",
                "big": "9000000000",
                "tags": ["1", "2"],
                "owner": {"id": "3"},
                "born": "2020-02-29"
            }),
            json!({
                "name": {"type": "string"},
                "price": {"type": "number"},
                "weight": {"type": "Double"},
                "count": {"type": "int"},
                "rounded": {"type": "INT"},
                "big": {"type": "int64"},
                "tags": {"type": "array", "item": {"type": "int"}},
                "owner": {"type": "object", "fields": {"id": {"type": "int"}}},
                "born": {"type": "date"}
            }),
        );

        assert_eq!(
            formatted,
            json!({
                "name": "42",
                "price": 19.5,
                "weight": 2,
                "count": 7,
                "rounded": 7,
                "big": 9000000000i64,
                "tags": [1, 2],
                "owner": {"id": 3},
                "born": "2020-02-29T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn already_typed_values_are_kept() {
        let formatted = format(
            json!({"name": "x", "price": 2.5, "count": 7.5, "flag": true}),
            json!({
                "name": {"type": "string"},
                "price": {"type": "float"},
                "count": {"type": "int"},
                "flag": {"type": "string"}
            }),
        );

        assert_eq!(
            formatted,
            json!({"name": "x", "price": 2.5, "count": 7.5, "flag": "true"})
        );
    }

    #[test]
    fn defaults_fill_absent_keys_only() {
        let formatted = format(
            json!({"limit": 0, "offset": null}),
            json!({
                "limit": {"type": "int", "default": 20},
                "offset": {"type": "int", "default": 0},
                "order": {"type": "string", "default": "asc"},
                "filter": {"type": "string"}
            }),
        );

        assert_eq!(
            formatted,
            json!({"limit": 0, "offset": null, "order": "asc"})
        );
    }

    #[test]
    fn undeclared_truthy_fields_are_pruned_falsy_ones_kept() {
        let formatted = format(
            json!({"id": "1", "junk": "x", "zero": 0, "empty": "", "no": false, "obj": {}}),
            json!({"id": {"type": "int"}}),
        );

        assert_eq!(
            formatted,
            json!({"id": 1, "zero": 0, "empty": "", "no": false})
        );
    }

    #[test]
    fn declared_falsy_fields_are_not_coerced() {
        let formatted = format(
            json!({"count": "", "name": 0, "flag": false}),
            json!({
                "count": {"type": "int"},
                "name": {"type": "string"},
                "flag": {"type": "string"}
            }),
        );

        assert_eq!(formatted, json!({"count": "", "name": 0, "flag": false}));
    }

    #[test]
    fn array_items_are_shaped_independently_and_in_order() {
        let formatted = format(
            json!({
                "points": [
                    {"x": "1", "y": "2", "label": "a"},
                    {"x": "3"},
                    {"x": 0, "y": "4"}
                ]
            }),
            json!({
                "points": {
                    "type": "array",
                    "item": {
                        "type": "object",
                        "fields": {
                            "x": {"type": "int"},
                            "y": {"type": "int", "default": -1}
                        }
                    }
                }
            }),
        );

        assert_eq!(
            formatted,
            json!({
                "points": [
                    {"x": 1, "y": 2},
                    {"x": 3, "y": -1},
                    {"x": 0, "y": 4}
                ]
            })
        );
    }

    #[test]
    fn falsy_array_elements_are_left_alone() {
        let formatted = format(
            json!({"ids": ["1", "", 0, null, "5"]}),
            json!({"ids": {"type": "array", "item": {"type": "int"}}}),
        );

        assert_eq!(formatted, json!({"ids": [1, "", 0, null, 5]}));
    }

    #[test]
    fn nested_objects_only_touch_their_own_schema() {
        let formatted = format(
            json!({
                "user": {"age": "30", "extra": "drop me"},
                "meta": "keep?"
            }),
            json!({
                "user": {"type": "object", "fields": {"age": {"type": "int"}}},
                "meta": {"type": "string"}
            }),
        );

        assert_eq!(formatted, json!({"user": {"age": 30}, "meta": "keep?"}));
    }

    #[test]
    fn structural_mismatches_are_left_unchanged() {
        let formatted = format(
            json!({"tags": "a,b", "user": "bob", "loose": [1, "2"]}),
            json!({
                "tags": {"type": "array", "item": {"type": "string"}},
                "user": {"type": "object", "fields": {"name": {"type": "string"}}},
                "loose": {"type": "array"}
            }),
        );

        assert_eq!(formatted, json!({"tags": "a,b", "user": "bob", "loose": [1, "2"]}));
    }

    #[test_log::test]
    fn invalid_numbers_and_dates_become_null() {
        let formatted = format(
            json!({"n": "abc", "i": "x1", "d": "not a date", "flag": true}),
            json!({
                "n": {"type": "number"},
                "i": {"type": "int"},
                "d": {"type": "date"},
                "flag": {"type": "number"}
            }),
        );

        assert_eq!(
            formatted,
            json!({"n": null, "i": null, "d": null, "flag": null})
        );
    }

    #[test]
    fn date_formats() {
        let formatted = format(
            json!({
                "offset": "2021-06-01T12:30:00+02:00",
                "naive": "2021-06-01T12:30:00.25",
                "millis": 86400000
            }),
            json!({
                "offset": {"type": "date"},
                "naive": {"type": "date"},
                "millis": {"type": "date"}
            }),
        );

        assert_eq!(
            formatted,
            json!({
                "offset": "2021-06-01T10:30:00.000Z",
                "naive": "2021-06-01T12:30:00.250Z",
                "millis": "1970-01-02T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn unknown_custom_type_keeps_raw_value() {
        let formatted = format(json!({"amount": "12 EUR"}), json!({"amount": {"type": "Money"}}));

        assert_eq!(formatted, json!({"amount": "12 EUR"}));
    }

    #[test_log::test]
    fn custom_parsers_can_recurse_and_may_fail() {
        let mut registry = TypeParserRegistry::new();
        registry.register_fn(["Money"], |value: &Value, interpreter: &SchemaInterpreter| {
            let text = value
                .as_str()
                .ok_or_else(|| TypeParserError::Invalid("expected text".to_string()))?;
            let (amount, currency) = text
                .split_once(' ')
                .ok_or_else(|| TypeParserError::Invalid(format!("malformed money '{text}'")))?;

            let money_schema = ParamSchema::from([
                ("amount".to_string(), FieldSpec::of_type("number")),
                ("currency".to_string(), FieldSpec::of_type("string")),
            ]);
            let mut money = Map::new();
            money.insert("amount".to_string(), json!(amount));
            money.insert("currency".to_string(), json!(currency));
            interpreter.format(&mut money, &money_schema);

            Ok(Value::Object(money))
        });
        let interpreter = SchemaInterpreter::new(Arc::new(registry));

        let formatted = format_with(
            &interpreter,
            json!({"price": "12.5 EUR", "cost": "bogus"}),
            json!({"price": {"type": "money"}, "cost": {"type": "Money"}}),
        );

        assert_eq!(
            formatted,
            json!({"price": {"amount": 12.5, "currency": "EUR"}, "cost": "bogus"})
        );
    }

    #[test_log::test]
    fn panicking_parsers_keep_the_raw_value() {
        let mut registry = TypeParserRegistry::new();
        registry.register_fn(["boom"], |_: &Value, _: &SchemaInterpreter| {
            panic!("parser exploded")
        });
        let interpreter = SchemaInterpreter::new(Arc::new(registry));

        let formatted = format_with(
            &interpreter,
            json!({"code": "x1", "count": "3"}),
            json!({"code": {"type": "boom"}, "count": {"type": "int"}}),
        );

        assert_eq!(formatted, json!({"code": "x1", "count": 3}));
    }

    #[test]
    fn response_shaped_through_implicit_object_schema() {
        let field: FieldSpec =
            serde_json::from_value(json!({"fields": {"age": {"type": "int"}}})).unwrap();

        assert_eq!(
            interpreter().format_value(json!({"age": "7"}), &field),
            json!({"age": 7})
        );
        assert_eq!(interpreter().format_value(Value::Null, &field), Value::Null);
    }
}
