// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use http::{Method, StatusCode};
use serde_json::Value;

pub const CONTENT_TYPE_JSON: &str = "application/json";

pub trait RequestPayload {
    fn get_head(&self) -> &(dyn RequestHead + Send + Sync);
    fn take_body(&mut self) -> Value;
}

#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn from_vec(vec: Vec<(String, String)>) -> Self {
        Self {
            inner: vec
                .into_iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let key = key.to_lowercase();
        self.inner
            .iter()
            .find(|(k, _)| k == &key)
            .map(|(_, v)| v.clone())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        let key = key.to_lowercase();
        self.inner
            .iter()
            .filter(|(k, _)| k == &key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.inner.push((key.to_lowercase(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn remove(&mut self, key: &str) {
        let key = key.to_lowercase();
        self.inner.retain(|(k, _)| k != &key);
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[derive(Debug)]
pub struct ResponsePayload {
    pub body: ResponseBody,
    pub headers: Headers,
    pub status_code: StatusCode,
}

impl ResponsePayload {
    /// A response carrying `body` serialized as JSON.
    pub fn json(status_code: StatusCode, body: &Value, mut headers: Headers) -> Self {
        headers.remove(http::header::CONTENT_TYPE.as_str());
        headers.insert(
            http::header::CONTENT_TYPE.to_string(),
            CONTENT_TYPE_JSON.to_string(),
        );

        Self {
            body: ResponseBody::Bytes(body.to_string().into_bytes()),
            headers,
            status_code,
        }
    }

    pub fn empty(status_code: StatusCode, headers: Headers) -> Self {
        Self {
            body: ResponseBody::None,
            headers,
            status_code,
        }
    }
}

#[derive(Debug)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    None,
}

impl ResponseBody {
    /// Parse the body as JSON (`Value::Null` for an empty body).
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            ResponseBody::Bytes(bytes) if !bytes.is_empty() => serde_json::from_slice(bytes),
            _ => Ok(Value::Null),
        }
    }
}

/// Represents a HTTP request from which information can be extracted
pub trait RequestHead {
    // return all header values that have the following key
    fn get_headers(&self, key: &str) -> Vec<String>;

    // return the first header
    fn get_header(&self, key: &str) -> Option<String> {
        self.get_headers(&key.to_lowercase()).first().cloned()
    }

    // return every header, with lowercase names
    fn get_all_headers(&self) -> Headers;

    fn get_path(&self) -> String;

    /// The query string decoded into a JSON object of strings
    fn get_query(&self) -> Value;

    fn get_method(&self) -> Method;
}
