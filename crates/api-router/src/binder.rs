// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Assembles the combined parameter object of a request and turns it into the positional
//! arguments of a handler.

use std::sync::Arc;

use api_model::{CONTEXT_PARAMETER, ParamSchema, Params, SchemaInterpreter, UrlParams};
use common::http::Headers;
use serde_json::{Map, Value};

use crate::handler::{Argument, Arguments, HandlerContext};

/// Combine path, query, body and header parameters, each shaped by its declared schema.
///
/// Path parameters form the base; the shaped query (which sees the path parameters too), body
/// and headers are merged over it in that order. A section without a declared schema is shaped
/// against an empty one, so only its falsy values survive.
pub fn extract_parameters(
    interpreter: &SchemaInterpreter,
    params: &Params,
    path_params: &Map<String, Value>,
    query: &Value,
    body: &Value,
    headers: &Headers,
) -> Map<String, Value> {
    let empty = ParamSchema::new();

    let mut combined = path_params.clone();
    if let Some(UrlParams::Schema(url_schema)) = &params.url {
        interpreter.format(&mut combined, url_schema);
    }

    let mut query = as_object(query);
    query.extend(path_params.clone());
    interpreter.format(&mut query, params.query.as_ref().unwrap_or(&empty));
    combined.extend(query);

    let mut body = as_object(body);
    interpreter.format(&mut body, params.body.as_ref().unwrap_or(&empty));
    combined.extend(body);

    let header_schema = params.header.as_ref().unwrap_or(&empty);
    let mut headers = header_object(headers, header_schema);
    interpreter.format(&mut headers, header_schema);
    combined.extend(headers);

    combined
}

/// Resolve each `mapping` entry against `parameters`, in order. `ctx` binds the request
/// context, `ctx.<path>` a value of [`HandlerContext::to_json`]; names that resolve to nothing
/// bind `null`.
pub fn bind_arguments(
    mapping: &[String],
    parameters: &Map<String, Value>,
    context: Arc<HandlerContext>,
) -> Arguments {
    let context_prefix = format!("{CONTEXT_PARAMETER}.");
    let mut context_json: Option<Map<String, Value>> = None;

    let values = mapping
        .iter()
        .map(|name| {
            if name == CONTEXT_PARAMETER {
                return Argument::Context;
            }

            let value = if name.starts_with(&context_prefix) {
                let projection = context_json.get_or_insert_with(|| {
                    Map::from_iter([(CONTEXT_PARAMETER.to_string(), context.to_json())])
                });
                lookup(projection, name).cloned()
            } else {
                lookup(parameters, name).cloned()
            };

            Argument::Value(value.unwrap_or(Value::Null))
        })
        .collect();

    Arguments::new(mapping.to_vec(), values, context)
}

/// Dotted-path lookup (`user.id`, `items.0.name`). A key that literally contains the dots wins
/// over the nested interpretation.
pub fn lookup<'a>(parameters: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = parameters.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let first = segments.next()?;

    segments.try_fold(parameters.get(first)?, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

fn as_object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

// Header names are case-insensitive: a header is keyed by its declared spelling when the schema
// names it, otherwise by its lowercase name.
fn header_object(headers: &Headers, schema: &ParamSchema) -> Map<String, Value> {
    let mut object = Map::new();

    for (name, value) in headers.iter() {
        let key = schema
            .keys()
            .find(|declared| declared.eq_ignore_ascii_case(name))
            .map(String::as_str)
            .unwrap_or(name);

        if !object.contains_key(key) {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    object
}
