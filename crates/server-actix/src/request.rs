// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use actix_web::{HttpRequest, http::header::HeaderMap};
use common::http::{Headers, RequestHead};
use serde_json::Value;

pub struct ActixRequestHead {
    // we cannot refer to HttpRequest directly, as it holds an Rc (and therefore does
    // not impl Send or Sync)
    headers: HeaderMap,
    method: actix_web::http::Method,
    path: String,
    query: Value,
}

impl ActixRequestHead {
    pub fn from_request(req: &HttpRequest, query: Value) -> ActixRequestHead {
        ActixRequestHead {
            headers: req.headers().clone(),
            method: req.method().clone(),
            path: req.path().to_string(),
            query,
        }
    }
}

impl RequestHead for ActixRequestHead {
    fn get_headers(&self, key: &str) -> Vec<String> {
        self.headers
            .get_all(key.to_lowercase())
            .filter_map(|h| h.to_str().ok())
            .map(|h| h.to_string())
            .collect()
    }

    fn get_all_headers(&self) -> Headers {
        Headers::from_vec(
            self.headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect(),
        )
    }

    fn get_method(&self) -> http::Method {
        // Actix uses http-0.2. However, the rest of the system uses
        // http-1.x, so we need to convert between the two.
        match http::Method::from_bytes(self.method.as_str().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                tracing::error!("Unsupported method: {}", self.method);
                http::Method::GET
            }
        }
    }

    fn get_path(&self) -> String {
        self.path.clone()
    }

    fn get_query(&self) -> Value {
        self.query.clone()
    }
}
