// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Hosts a [`Router`] inside actix-web.

mod request;

use std::{io::ErrorKind, net::SocketAddr, sync::Arc};

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    dev::Server,
    middleware,
    web::{self, ServiceConfig},
};
use common::{
    env_const::{DEFAULT_SERVER_PORT, NANO_SERVER_PORT, get_server_host},
    http::{RequestHead, RequestPayload, ResponseBody, ResponsePayload},
    router::Router,
};
use nano_env::{EnvError, Environment};
use request::ActixRequestHead;
use serde_json::Value;
use thiserror::Error;
use tracing_actix_web::TracingLogger;

pub type SharedRouter = Arc<dyn Router + Send + Sync>;

#[derive(Error)]
pub enum ServerError {
    #[error("Port {0} is already in use. Check if there is another process running at that port.")]
    PortInUse(u16),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Env(#[from] EnvError),
}

// Delegates to `Display`, so that a server exiting with an error prints a readable message
impl std::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub fn configure_router(router: SharedRouter) -> impl FnOnce(&mut ServiceConfig) {
    move |app| {
        app.app_data(web::Data::from(router))
            .default_service(web::to(resolve));
    }
}

/// A bound, not yet running, server.
pub struct BoundServer {
    pub server: Server,
    pub addrs: Vec<SocketAddr>,
}

/// Bind a server for `router` to `NANO_SERVER_HOST`:`NANO_SERVER_PORT`.
pub fn bind_server(
    router: SharedRouter,
    env: &dyn Environment,
) -> Result<BoundServer, ServerError> {
    let server_port = nano_env::get_parsed(env, NANO_SERVER_PORT, DEFAULT_SERVER_PORT)?;
    let server_host = get_server_host(env);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .configure(configure_router(router.clone()))
    })
    .bind((server_host.as_str(), server_port))
    .map_err(|e| {
        if e.kind() == ErrorKind::AddrInUse {
            ServerError::PortInUse(server_port)
        } else {
            ServerError::Io(e)
        }
    })?;

    let addrs = server.addrs();
    tracing::debug!("Bound server to {:?}", addrs);

    Ok(BoundServer {
        server: server.run(),
        addrs,
    })
}

struct ActixRequestPayload {
    head: ActixRequestHead,
    body: Value,
}

impl RequestPayload for ActixRequestPayload {
    fn get_head(&self) -> &(dyn RequestHead + Send + Sync) {
        &self.head
    }

    fn take_body(&mut self) -> Value {
        self.body.take()
    }
}

async fn resolve(
    http_request: HttpRequest,
    body: Option<web::Json<Value>>,
    query: web::Query<Value>,
    router: web::Data<dyn Router + Send + Sync>,
) -> HttpResponse {
    let mut request = ActixRequestPayload {
        head: ActixRequestHead::from_request(&http_request, query.into_inner()),
        body: body.map(|b| b.into_inner()).unwrap_or(Value::Null),
    };

    match router.route(&mut request).await {
        Some(response) => to_http_response(response),
        None => HttpResponse::NotFound().finish(),
    }
}

fn to_http_response(response: ResponsePayload) -> HttpResponse {
    let ResponsePayload {
        body,
        headers,
        status_code,
    } = response;

    let Ok(actix_status_code) = actix_web::http::StatusCode::from_u16(status_code.as_u16()) else {
        tracing::error!("Invalid status code: {}", status_code);
        return HttpResponse::InternalServerError().finish();
    };

    let mut builder = HttpResponse::build(actix_status_code);

    for header in headers.into_iter() {
        builder.append_header(header);
    }

    match body {
        ResponseBody::Bytes(bytes) => builder.body(bytes),
        ResponseBody::None => builder.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{TestRequest, call_service, init_service, read_body_json};
    use async_trait::async_trait;
    use common::http::Headers;
    use serde_json::json;

    struct EchoRouter;

    #[async_trait]
    impl Router for EchoRouter {
        async fn route(
            &self,
            request: &mut (dyn RequestPayload + Send),
        ) -> Option<ResponsePayload> {
            let head = request.get_head();
            if head.get_path() == "/missing" {
                return None;
            }

            let echo = json!({
                "method": head.get_method().as_str(),
                "path": head.get_path(),
                "query": head.get_query(),
                "tenant": head.get_header("X-Tenant"),
            });
            let body = request.take_body();

            let mut headers = Headers::new();
            headers.insert("x-echo".into(), "yes".into());

            Some(ResponsePayload::json(
                http::StatusCode::CREATED,
                &json!({"request": echo, "body": body}),
                headers,
            ))
        }
    }

    #[actix_web::test]
    async fn requests_are_forwarded_to_the_router() {
        let app = init_service(
            App::new()
                .wrap(middleware::NormalizePath::new(
                    middleware::TrailingSlash::Trim,
                ))
                .configure(configure_router(Arc::new(EchoRouter))),
        )
        .await;

        let request = TestRequest::patch()
            .uri("/api/items/?limit=5")
            .insert_header(("X-Tenant", "acme"))
            .set_json(json!({"name": "x"}))
            .to_request();
        let response = call_service(&app, request).await;

        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(
            response.headers().get("x-echo").and_then(|v| v.to_str().ok()),
            Some("yes")
        );

        let body: Value = read_body_json(response).await;
        assert_eq!(
            body,
            json!({
                "request": {
                    "method": "PATCH",
                    "path": "/api/items",
                    "query": {"limit": "5"},
                    "tenant": "acme"
                },
                "body": {"name": "x"}
            })
        );

        let request = TestRequest::get().uri("/missing").to_request();
        let response = call_service(&app, request).await;
        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn port_must_be_numeric() {
        let env = nano_env::MapEnvironment::from([(NANO_SERVER_PORT, "http")]);

        assert!(matches!(
            bind_server(Arc::new(EchoRouter), &env),
            Err(ServerError::Env(_))
        ));
    }
}
