// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use api_model::{ApiMethod, MethodSpec, RouteTable, SchemaInterpreter, UrlParams};
use async_trait::async_trait;
use common::{
    env_const::get_api_http_path,
    http::{Headers, RequestPayload, ResponseBody, ResponsePayload},
    router::Router,
};
use futures::FutureExt;
use http::{Method, StatusCode};
use nano_env::Environment;
use serde_json::{Value, json};

use crate::{
    binder::{bind_arguments, extract_parameters},
    error::ApiLoadingError,
    handler::{Handler, HandlerContext, HandlerError, HandlerRegistry},
    path::PathTemplate,
};

/// Name of the introspection endpoint, relative to an API's base path.
pub const INTROSPECTION_FILE: &str = "api.json";

#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub prefix: String,
    pub http_path: String,
}

impl ApiOptions {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            http_path: "/api".to_string(),
        }
    }

    /// Options whose root path comes from `NANO_API_HTTP_PATH`.
    pub fn from_env(prefix: &str, env: &dyn Environment) -> Self {
        Self::new(prefix).with_http_path(&get_api_http_path(env))
    }

    pub fn with_http_path(mut self, http_path: &str) -> Self {
        self.http_path = http_path.to_string();
        self
    }

    /// `{http_path}/{prefix}/v{version}`, without a trailing slash
    pub fn base_path(&self, version: u32) -> String {
        let version = format!("v{version}");

        let segments: Vec<&str> = self
            .http_path
            .split('/')
            .chain(self.prefix.split('/'))
            .chain(std::iter::once(version.as_str()))
            .filter(|segment| !segment.is_empty())
            .collect();

        format!("/{}", segments.join("/"))
    }
}

struct Dispatcher {
    method: Method,
    api_method: ApiMethod,
    route: String,
    template: PathTemplate,
    spec: MethodSpec,
    handler: Arc<dyn Handler>,
}

/// Serves one route definition document: the introspection endpoint plus one dispatcher per
/// declared `(path, method)`.
pub struct ApiRouter {
    base_path: String,
    table: Arc<RouteTable>,
    interpreter: Arc<SchemaInterpreter>,
    dispatchers: Vec<Dispatcher>,
}

impl ApiRouter {
    /// Bind every declared operation to its handler. Fails on the first operation whose
    /// handler is not registered.
    pub fn new(
        table: Arc<RouteTable>,
        handlers: &HandlerRegistry,
        interpreter: Arc<SchemaInterpreter>,
        options: &ApiOptions,
    ) -> Result<Self, ApiLoadingError> {
        let base_path = options.base_path(table.version());

        let dispatchers = table
            .document()
            .operations()
            .map(|(route, api_method, spec)| {
                let handler = handlers.resolve(&spec.handler).ok_or_else(|| {
                    ApiLoadingError::UnresolvedHandler {
                        method: api_method,
                        path: route.to_string(),
                        handler: spec.handler.to_string(),
                    }
                })?;

                let template = PathTemplate::parse(route);
                if let Some(UrlParams::Schema(url_schema)) = &spec.params.url {
                    let unknown = url_schema
                        .keys()
                        .find(|name| !template.parameter_names().any(|token| token == *name));
                    if let Some(name) = unknown {
                        return Err(ApiLoadingError::UnknownPathParameter {
                            method: api_method,
                            path: route.to_string(),
                            name: name.clone(),
                        });
                    }
                }

                tracing::debug!(
                    "Registered {} {}/{} -> {}",
                    api_method,
                    base_path,
                    route.trim_start_matches('/'),
                    spec.handler
                );

                Ok(Dispatcher {
                    method: api_method.http_method(),
                    api_method,
                    route: route.to_string(),
                    template,
                    spec: spec.clone(),
                    handler,
                })
            })
            .collect::<Result<Vec<_>, ApiLoadingError>>()?;

        Ok(Self {
            base_path,
            table,
            interpreter,
            dispatchers,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn introspection_path(&self) -> String {
        format!("{}/{INTROSPECTION_FILE}", self.base_path)
    }

    fn relative_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(&self.base_path)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    fn find_dispatcher(
        &self,
        method: &Method,
        relative: &str,
    ) -> Option<(&Dispatcher, serde_json::Map<String, Value>)> {
        self.dispatchers.iter().find_map(|dispatcher| {
            if &dispatcher.method != method {
                return None;
            }
            dispatcher
                .template
                .matches(relative)
                .map(|params| (dispatcher, params))
        })
    }

    async fn dispatch(
        &self,
        dispatcher: &Dispatcher,
        path_params: serde_json::Map<String, Value>,
        request: &mut (dyn RequestPayload + Send),
    ) -> ResponsePayload {
        let head = request.get_head();
        let method = head.get_method();
        let path = head.get_path();
        let query = head.get_query();
        let headers = head.get_all_headers();
        let body = request.take_body();

        let context = Arc::new(HandlerContext::new(
            method,
            path,
            path_params,
            query,
            body,
            headers,
        ));

        let outcome = AssertUnwindSafe(self.invoke(dispatcher, context.clone()))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(panic)),
        };

        let (status_code, body, headers) = context.take_response();

        match error {
            None => response(status_code, body, headers),
            Some(message) => {
                tracing::error!(
                    "Handler {} for {} {} failed: {}",
                    dispatcher.spec.handler,
                    dispatcher.api_method,
                    dispatcher.route,
                    message
                );
                response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some(json!({ "message": message })),
                    headers,
                )
            }
        }
    }

    async fn invoke(
        &self,
        dispatcher: &Dispatcher,
        context: Arc<HandlerContext>,
    ) -> Result<(), HandlerError> {
        let parameters = extract_parameters(
            &self.interpreter,
            &dispatcher.spec.params,
            context.path_params(),
            context.query(),
            context.body(),
            context.headers(),
        );

        let arguments = bind_arguments(
            dispatcher.spec.handler.server_mapping(),
            &parameters,
            context.clone(),
        );

        let result = dispatcher.handler.call(arguments).await?;
        if !result.is_null() {
            context.set_body(result);
        }

        // the response is shaped for the status the handler left behind
        if let Some(schema) = dispatcher.spec.response_schema(context.status_code()) {
            if let Some(body) = context.take_body() {
                context.set_body(self.interpreter.format_value(body, schema));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Router for ApiRouter {
    async fn route(&self, request: &mut (dyn RequestPayload + Send)) -> Option<ResponsePayload> {
        let head = request.get_head();
        let method = head.get_method();
        let path = head.get_path();
        let relative = self.relative_path(&path)?;

        let head_request = method == Method::HEAD;

        if (method == Method::GET || head_request)
            && relative.trim_matches('/') == INTROSPECTION_FILE
        {
            let response = ResponsePayload::json(StatusCode::OK, self.table.raw(), Headers::new());
            return Some(if head_request {
                without_body(response)
            } else {
                response
            });
        }

        // HEAD falls back to the GET dispatcher of the same path
        let (dispatcher, path_params) = self
            .find_dispatcher(&method, relative)
            .or_else(|| {
                head_request
                    .then(|| self.find_dispatcher(&Method::GET, relative))
                    .flatten()
            })?;

        let response = self.dispatch(dispatcher, path_params, request).await;
        Some(if head_request {
            without_body(response)
        } else {
            response
        })
    }
}

fn response(status_code: StatusCode, body: Option<Value>, headers: Headers) -> ResponsePayload {
    match body {
        Some(body) => ResponsePayload::json(status_code, &body, headers),
        None => ResponsePayload::empty(status_code, headers),
    }
}

fn without_body(response: ResponsePayload) -> ResponsePayload {
    ResponsePayload {
        body: ResponseBody::None,
        ..response
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(message) => *message,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "Handler panicked".to_string(),
        },
    }
}
