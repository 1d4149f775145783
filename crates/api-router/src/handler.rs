// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use api_model::HandlerRef;
use async_trait::async_trait;
use common::http::Headers;
use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error("Invalid argument '{name}': {source}")]
    InvalidArgument {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn message(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

/// A bound route handler. The returned value becomes the response body unless it is `null`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, arguments: Arguments) -> Result<Value, HandlerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    /// The `ctx` mapping entry
    Context,
}

/// Positional handler arguments, in the order of the route's mapping.
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Argument>,
    context: Arc<HandlerContext>,
}

impl Arguments {
    pub(crate) fn new(
        names: Vec<String>,
        values: Vec<Argument>,
        context: Arc<HandlerContext>,
    ) -> Self {
        Self {
            names,
            values,
            context,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn argument(&self, position: usize) -> Option<&Argument> {
        self.values.get(position)
    }

    /// The raw value at `position`; `None` past the end or at the context position.
    pub fn value(&self, position: usize) -> Option<&Value> {
        match self.values.get(position) {
            Some(Argument::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Deserialize the value at `position`. A missing value deserializes from `null`.
    pub fn get<T: DeserializeOwned>(&self, position: usize) -> Result<T, HandlerError> {
        let value = self.value(position).cloned().unwrap_or(Value::Null);

        serde_json::from_value(value).map_err(|source| HandlerError::InvalidArgument {
            name: self
                .names
                .get(position)
                .cloned()
                .unwrap_or_else(|| format!("#{position}")),
            source,
        })
    }

    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.context
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

#[derive(Debug)]
struct ResponseState {
    status_code: StatusCode,
    body: Option<Value>,
    headers: Headers,
}

/// The request seen by a handler, plus the response it is allowed to shape.
#[derive(Debug)]
pub struct HandlerContext {
    method: Method,
    path: String,
    path_params: Map<String, Value>,
    query: Value,
    body: Value,
    headers: Headers,
    response: Mutex<ResponseState>,
}

impl HandlerContext {
    pub fn new(
        method: Method,
        path: String,
        path_params: Map<String, Value>,
        query: Value,
        body: Value,
        headers: Headers,
    ) -> Self {
        Self {
            method,
            path,
            path_params,
            query,
            body,
            headers,
            response: Mutex::new(ResponseState {
                status_code: StatusCode::OK,
                body: None,
                headers: Headers::new(),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_params(&self) -> &Map<String, Value> {
        &self.path_params
    }

    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn header(&self, key: &str) -> Option<String> {
        self.headers.get(key)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn status_code(&self) -> StatusCode {
        self.response().status_code
    }

    pub fn set_status_code(&self, status_code: StatusCode) {
        self.response().status_code = status_code;
    }

    pub fn set_body(&self, body: Value) {
        self.response().body = Some(body);
    }

    pub fn take_body(&self) -> Option<Value> {
        self.response().body.take()
    }

    pub fn set_header(&self, key: &str, value: &str) {
        let mut response = self.response();
        response.headers.remove(key);
        response.headers.insert(key.to_string(), value.to_string());
    }

    /// The request as JSON, the value `ctx.*` mapping entries are resolved against.
    pub fn to_json(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();

        json!({
            "method": self.method.as_str(),
            "path": self.path,
            "params": self.path_params,
            "query": self.query,
            "body": self.body,
            "headers": headers,
        })
    }

    pub(crate) fn take_response(&self) -> (StatusCode, Option<Value>, Headers) {
        let mut response = self.response();
        (
            response.status_code,
            response.body.take(),
            std::mem::take(&mut response.headers),
        )
    }

    fn response(&self) -> MutexGuard<'_, ResponseState> {
        // a handler that panicked mid-update leaves a usable state behind
        self.response
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct BoundAction<S, F> {
    receiver: Arc<S>,
    action: F,
}

#[async_trait]
impl<S, F, Fut> Handler for BoundAction<S, F>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn call(&self, arguments: Arguments) -> Result<Value, HandlerError> {
        (self.action)(self.receiver.clone(), arguments).await
    }
}

/// A set of actions sharing one receiver.
///
/// Every action registered here is invoked with the namespace's state as its receiver: actions
/// of a group see the group's state, root actions see the root namespace's state.
pub struct Namespace<S> {
    state: Arc<S>,
    actions: IndexMap<String, Arc<dyn Handler>>,
}

impl<S: Send + Sync + 'static> Namespace<S> {
    pub fn new(state: S) -> Self {
        Self::from_arc(Arc::new(state))
    }

    pub fn from_arc(state: Arc<S>) -> Self {
        Self {
            state,
            actions: IndexMap::new(),
        }
    }

    pub fn action<F, Fut>(mut self, name: &str, action: F) -> Self
    where
        F: Fn(Arc<S>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.actions.insert(
            name.to_string(),
            Arc::new(BoundAction {
                receiver: self.state.clone(),
                action,
            }),
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandlerKey {
    group: Option<String>,
    action: String,
}

/// Explicit `(group, action)` to handler map, consulted once per route at boot.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKey, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register actions addressed by `action` alone.
    pub fn root<S>(mut self, namespace: Namespace<S>) -> Self {
        self.insert(None, namespace.actions);
        self
    }

    /// Register actions addressed by `group` + `action`.
    pub fn group<S>(mut self, group: &str, namespace: Namespace<S>) -> Self {
        self.insert(Some(group), namespace.actions);
        self
    }

    fn insert(&mut self, group: Option<&str>, actions: IndexMap<String, Arc<dyn Handler>>) {
        for (action, handler) in actions {
            let key = HandlerKey {
                group: group.map(str::to_string),
                action,
            };
            if self.handlers.insert(key.clone(), handler).is_some() {
                tracing::warn!("Handler {:?} registered more than once, keeping the latest", key);
            }
        }
    }

    pub fn resolve(&self, handler: &HandlerRef) -> Option<Arc<dyn Handler>> {
        self.handlers
            .get(&HandlerKey {
                group: handler.group.clone(),
                action: handler.action.clone(),
            })
            .cloned()
    }

}
