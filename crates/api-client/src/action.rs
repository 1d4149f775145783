// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use api_model::{
    ApiMethod, FieldSpec, MethodSpec, Params,
    js::{is_truthy, to_js_string},
};
use http::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use url::Url;

use crate::error::ClientError;

/// The request an action sends for a given argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: http::Method,
    pub url: Url,
    pub body: Option<Value>,
}

/// One declared `(path, method)`, callable with positional arguments.
///
/// Arguments are matched to parameter names by the handler mapping (without `ctx`), the same
/// order the server uses to invoke the handler.
#[derive(Debug, Clone)]
pub struct RemoteAction {
    http: reqwest::Client,
    base_url: Url,
    path: String,
    method: ApiMethod,
    mapping: Vec<String>,
    params: Params,
}

impl RemoteAction {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: Url,
        path: &str,
        method: ApiMethod,
        spec: &MethodSpec,
    ) -> Self {
        Self {
            http,
            base_url,
            path: path.to_string(),
            method,
            mapping: spec
                .handler
                .client_mapping()
                .into_iter()
                .map(str::to_string)
                .collect(),
            params: spec.params.clone(),
        }
    }

    /// Parameter names, in argument order.
    pub fn parameters(&self) -> &[String] {
        &self.mapping
    }

    pub fn arity(&self) -> usize {
        self.mapping.len()
    }

    pub fn method(&self) -> ApiMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn prepare(&self, arguments: &[Value]) -> Result<PreparedRequest, ClientError> {
        if arguments.len() > self.mapping.len() {
            return Err(ClientError::TooManyArguments {
                method: self.method,
                path: self.path.clone(),
                expected: self.mapping.len(),
                given: arguments.len(),
            });
        }

        let mut url = self.base_url.clone();
        {
            let segments = self.path_segments(arguments)?;
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::CannotBeABase(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }

        if let Some(query) = &self.params.query {
            let pairs: Vec<(&str, String)> = query
                .iter()
                .filter_map(|(name, field)| {
                    self.argument(name, field, arguments)
                        .map(|value| (name.as_str(), to_js_string(&value)))
                })
                .collect();

            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }

        let body = match &self.params.body {
            Some(body) if self.method.carries_body() => Some(Value::Object(
                body.iter()
                    .filter_map(|(name, field)| {
                        self.argument(name, field, arguments)
                            .map(|value| (name.clone(), value))
                    })
                    .collect::<Map<_, _>>(),
            )),
            _ => None,
        };

        Ok(PreparedRequest {
            method: self.method.http_method(),
            url,
            body,
        })
    }

    /// Send the request and return the response body as is (`null` when empty).
    pub async fn call(&self, arguments: &[Value]) -> Result<Value, ClientError> {
        let PreparedRequest { method, url, body } = self.prepare(arguments)?;

        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(&body)?);
        }

        let response = request.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_slice(&bytes)?)
        }
    }

    // Path tokens are substituted positionally: the n-th mapping entry replaces its `:name`
    // token (matched case-insensitively) with the n-th argument.
    fn path_segments(&self, arguments: &[Value]) -> Result<Vec<String>, ClientError> {
        let mut segments: Vec<(String, bool)> = self
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| (segment.to_string(), false))
            .collect();

        if self.params.url.as_ref().is_some_and(|url| url.is_declared()) {
            for (position, name) in self.mapping.iter().enumerate() {
                let token = format!(":{name}");
                let pending = segments.iter_mut().find(|(segment, substituted)| {
                    !substituted && segment.eq_ignore_ascii_case(&token)
                });
                let Some((segment, substituted)) = pending else {
                    continue;
                };

                let value = arguments.get(position).ok_or_else(|| {
                    ClientError::MissingPathArgument {
                        method: self.method,
                        path: self.path.clone(),
                        name: name.clone(),
                    }
                })?;

                *segment = to_js_string(value);
                *substituted = true;
            }
        }

        Ok(segments.into_iter().map(|(segment, _)| segment).collect())
    }

    // A truthy positional argument, else the declared default, else nothing.
    fn argument(&self, name: &str, field: &FieldSpec, arguments: &[Value]) -> Option<Value> {
        self.mapping
            .iter()
            .position(|entry| entry == name)
            .and_then(|position| arguments.get(position))
            .filter(|value| is_truthy(value))
            .cloned()
            .or_else(|| field.default.clone())
    }
}
