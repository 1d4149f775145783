// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! In-memory request types for exercising routers without a transport.

use http::Method;
use serde_json::{Map, Value};

use crate::http::{Headers, RequestHead, RequestPayload};

pub struct MemoryRequestHead {
    method: Method,
    path: String,
    query: Map<String, Value>,
    headers: Headers,
}

impl RequestHead for MemoryRequestHead {
    fn get_headers(&self, key: &str) -> Vec<String> {
        self.headers.get_all(key)
    }

    fn get_all_headers(&self) -> Headers {
        self.headers.clone()
    }

    fn get_path(&self) -> String {
        self.path.clone()
    }

    fn get_query(&self) -> Value {
        Value::Object(self.query.clone())
    }

    fn get_method(&self) -> Method {
        self.method.clone()
    }
}

pub struct MemoryRequest {
    head: MemoryRequestHead,
    body: Value,
}

impl MemoryRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            head: MemoryRequestHead {
                method,
                path: path.to_string(),
                query: Map::new(),
                headers: Headers::new(),
            },
            body: Value::Null,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.head
            .query
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.head.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

impl RequestPayload for MemoryRequest {
    fn get_head(&self) -> &(dyn RequestHead + Send + Sync) {
        &self.head
    }

    fn take_body(&mut self) -> Value {
        self.body.take()
    }
}
