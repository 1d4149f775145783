// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A real server and a synthesized client sharing one route definition document.

use std::sync::Arc;

use api_client::{ApiClient, ClientError};
use api_model::RouteTable;
use api_router::{ApiProvider, HandlerError, HandlerRegistry, Namespace};
use common::env_const::{NANO_SERVER_HOST, NANO_SERVER_PORT};
use http::StatusCode;
use nano_env::MapEnvironment;
use serde_json::{Value, json};
use server_actix::{BoundServer, bind_server};

struct Users {
    greeting: &'static str,
}

struct Root {
    version: &'static str,
}

fn shop_document() -> Value {
    json!({
        "version": 1,
        "routes": {
            "users/:id": {
                "get": {
                    "handler": {"group": "users", "action": "getUser", "mapping": ["ctx", "id"]},
                    "params": {"url": {"id": {"type": "int"}}},
                    "response": {"200": {"schema": {"fields": {
                        "id": {"type": "int"},
                        "greeting": {"type": "string"},
                        "age": {"type": "int"}
                    }}}}
                }
            },
            "users": {
                "post": {
                    "handler": {"group": "users", "action": "create", "mapping": ["name", "age"]},
                    "params": {"body": {
                        "name": {"type": "string"},
                        "age": {"type": "int", "default": 18}
                    }},
                    "response": {"201": {"schema": {"fields": {
                        "name": {"type": "string"},
                        "age": {"type": "int"}
                    }}}}
                }
            },
            "users/:id/name": {
                "update": {
                    "handler": {
                        "group": "users",
                        "action": "rename",
                        "mapping": ["ctx", "id", "name"]
                    },
                    "params": {"url": true, "body": {"name": {"type": "string"}}}
                }
            },
            "search": {
                "handler": {"action": "search", "mapping": ["q", "limit"]},
                "params": {"query": {
                    "q": {"type": "string"},
                    "limit": {"type": "int", "default": 10}
                }}
            },
            "version": {
                "handler": {"action": "version"}
            },
            "fail": {
                "handler": {"action": "fail"}
            }
        }
    })
}

fn directory_document() -> Value {
    json!({
        "version": 1,
        "routes": {
            "users/:id": {
                "get": {
                    "handler": {"action": "getUser", "mapping": ["id"]},
                    "params": {"url": true}
                }
            },
            "people/:id": {
                "get": {
                    "handler": {"action": "getPerson", "mapping": ["ctx", "id"]},
                    "params": {"url": true},
                    "response": {"200": {"schema": {"fields": {"age": {"type": "int"}}}}}
                }
            }
        }
    })
}

fn shop_handlers() -> HandlerRegistry {
    HandlerRegistry::new()
        .group(
            "users",
            Namespace::new(Users { greeting: "hello" })
                .action("getUser", |this: Arc<Users>, arguments| async move {
                    let id: u64 = arguments.get(1)?;
                    if id == 404 {
                        arguments.context().set_status_code(StatusCode::NOT_FOUND);
                        return Ok(json!({"message": format!("no user {id}")}));
                    }
                    Ok(json!({"id": id, "greeting": this.greeting, "age": "7", "secret": "s"}))
                })
                .action("create", |_, arguments| async move {
                    let age: u32 = arguments.get(1)?;
                    arguments.context().set_status_code(StatusCode::CREATED);
                    Ok(json!({"name": arguments.get::<String>(0)?, "age": age.to_string()}))
                })
                .action("rename", |_, arguments| async move {
                    let context = arguments.context();
                    Ok(json!({
                        "method": context.method().as_str(),
                        "id": arguments.get::<String>(1)?,
                        "name": arguments.get::<String>(2)?
                    }))
                }),
        )
        .root(
            Namespace::new(Root { version: "1.2.3" })
                .action("search", |_, arguments| async move {
                    Ok(json!({"q": arguments.get::<String>(0)?, "limit": arguments.get::<u32>(1)?}))
                })
                .action("version", |this: Arc<Root>, _| async move { Ok(json!(this.version)) })
                .action("fail", |_, _| async { Err(HandlerError::message("boom")) }),
        )
}

fn directory_handlers() -> HandlerRegistry {
    HandlerRegistry::new().root(
        Namespace::new(())
            .action("getUser", |_, arguments| async move {
                Ok(json!({"path": arguments.context().path(), "id": arguments.get::<String>(0)?}))
            })
            .action("getPerson", |_, _| async { Ok(json!({"age": "7"})) }),
    )
}

/// Start a server with the shop and directory APIs, returning its address.
fn start_server() -> String {
    let mut provider = ApiProvider::new(Arc::new(MapEnvironment::new()));
    provider
        .register_api(
            "shop",
            shop_handlers(),
            RouteTable::from_value(shop_document()).unwrap(),
            None,
        )
        .register_api(
            "people",
            directory_handlers(),
            RouteTable::from_value(directory_document()).unwrap(),
            Some("directory"),
        );

    let env = MapEnvironment::from([(NANO_SERVER_HOST, "127.0.0.1"), (NANO_SERVER_PORT, "0")]);
    let BoundServer { server, addrs } =
        bind_server(Arc::new(provider.into_router().unwrap()), &env).unwrap();
    actix_web::rt::spawn(server);

    format!("http://{}", addrs[0])
}

#[actix_web::test]
async fn url_parameters_are_substituted() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/directory/v1"))
        .await
        .unwrap();

    let result = client.call("getUser", &[json!(42)]).await.unwrap();
    assert_eq!(
        result,
        json!({"path": "/api/directory/v1/users/42", "id": "42"})
    );
}

#[actix_web::test]
async fn responses_are_shaped_by_the_server() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/directory/v1/"))
        .await
        .unwrap();

    let result = client.call("getPerson", &[json!(1)]).await.unwrap();
    assert_eq!(result, json!({"age": 7}));
}

#[actix_web::test]
async fn grouped_and_root_actions() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/shop/v1"))
        .await
        .unwrap();

    let user = client.call("users.getUser", &[json!(42)]).await.unwrap();
    assert_eq!(user, json!({"id": 42, "greeting": "hello", "age": 7}));

    let version = client.call("version", &[]).await.unwrap();
    assert_eq!(version, json!("1.2.3"));
}

#[actix_web::test]
async fn bodies_and_defaults() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/shop/v1"))
        .await
        .unwrap();

    let created = client.call("users.create", &[json!("Ada")]).await.unwrap();
    assert_eq!(created, json!({"name": "Ada", "age": 18}));

    let created = client
        .call("users.create", &[json!(1815), json!("36")])
        .await
        .unwrap();
    assert_eq!(created, json!({"name": "1815", "age": 36}));

    let rename = client.group("users").unwrap().get("rename").unwrap();
    assert_eq!(rename.parameters(), ["id", "name"]);

    let renamed = rename.call(&[json!(7), json!("Grace")]).await.unwrap();
    assert_eq!(
        renamed,
        json!({"method": "PATCH", "id": "7", "name": "Grace"})
    );
}

#[actix_web::test]
async fn query_parameters() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/shop/v1"))
        .await
        .unwrap();

    let found = client.call("search", &[json!("lamp")]).await.unwrap();
    assert_eq!(found, json!({"q": "lamp", "limit": 10}));

    let found = client
        .call("search", &[json!("lamp"), json!(3)])
        .await
        .unwrap();
    assert_eq!(found, json!({"q": "lamp", "limit": 3}));
}

#[test_log::test(actix_web::test)]
async fn failures_reach_the_caller() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/shop/v1"))
        .await
        .unwrap();

    match client.call("fail", &[]).await {
        Err(ClientError::Request(e)) => {
            assert_eq!(e.status(), Some(StatusCode::INTERNAL_SERVER_ERROR))
        }
        other => panic!("unexpected {other:?}"),
    }

    match client.call("users.getUser", &[json!(404)]).await {
        Err(ClientError::Request(e)) => assert_eq!(e.status(), Some(StatusCode::NOT_FOUND)),
        other => panic!("unexpected {other:?}"),
    }

    let response = reqwest::get(format!("{address}/api/shop/v1/fail")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
    assert_eq!(body, json!({"message": "boom"}));

    assert!(matches!(
        ApiClient::load(&format!("{address}/api/unknown/v1")).await,
        Err(ClientError::Request(_))
    ));
}

#[actix_web::test]
async fn client_and_server_share_argument_positions() {
    let address = start_server();
    let client = ApiClient::load(&format!("{address}/api/shop/v1"))
        .await
        .unwrap();

    let table = RouteTable::from_value(shop_document()).unwrap();
    assert_eq!(client.document().routes.len(), table.document().routes.len());

    for (_, _, spec) in table.document().operations() {
        let name = spec.handler.to_string();
        let action = client.find(&name).unwrap();

        let expected: Vec<&str> = spec
            .handler
            .server_mapping()
            .iter()
            .map(String::as_str)
            .filter(|entry| *entry != "ctx")
            .collect();
        assert_eq!(action.parameters(), expected, "{name}");
    }
}
