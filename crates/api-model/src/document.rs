// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::{Map, Value};

/// The mapping entry that refers to the server-side request context. Clients never pass it.
pub const CONTEXT_PARAMETER: &str = "ctx";

/// Field name to field specification, in declaration order.
pub type ParamSchema = IndexMap<String, FieldSpec>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefinitionDocument {
    pub version: u32,
    #[serde(default)]
    pub routes: IndexMap<String, RouteSpec>,
}

impl RouteDefinitionDocument {
    /// Every `(path, method, spec)` triple in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, ApiMethod, &MethodSpec)> {
        self.routes.iter().flat_map(|(path, route)| {
            route
                .methods
                .iter()
                .map(move |(method, spec)| (path.as_str(), *method, spec))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    /// Partial update, sent as `PATCH` on the wire
    Update,
    Delete,
    Head,
}

impl ApiMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "get" => Some(ApiMethod::Get),
            "post" => Some(ApiMethod::Post),
            "put" => Some(ApiMethod::Put),
            "update" | "patch" => Some(ApiMethod::Update),
            "delete" => Some(ApiMethod::Delete),
            "head" => Some(ApiMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "get",
            ApiMethod::Post => "post",
            ApiMethod::Put => "put",
            ApiMethod::Update => "update",
            ApiMethod::Delete => "delete",
            ApiMethod::Head => "head",
        }
    }

    pub fn http_method(&self) -> http::Method {
        match self {
            ApiMethod::Get => http::Method::GET,
            ApiMethod::Post => http::Method::POST,
            ApiMethod::Put => http::Method::PUT,
            ApiMethod::Update => http::Method::PATCH,
            ApiMethod::Delete => http::Method::DELETE,
            ApiMethod::Head => http::Method::HEAD,
        }
    }

    /// Whether a client sends declared body parameters for this method
    pub fn carries_body(&self) -> bool {
        matches!(self, ApiMethod::Post | ApiMethod::Put | ApiMethod::Update)
    }
}

impl Display for ApiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The methods declared for a single path.
///
/// A route without any method-name keys is an implicit `GET` whose method spec is the whole
/// object. That decision is taken once, while the document is deserialized.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RouteSpec {
    pub methods: IndexMap<ApiMethod, MethodSpec>,
}

impl<'de> Deserialize<'de> for RouteSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Map::<String, Value>::deserialize(deserializer)?;

        let explicit = entries.keys().any(|key| ApiMethod::from_name(key).is_some());

        let methods = if explicit {
            entries
                .into_iter()
                .map(|(key, value)| {
                    let method = ApiMethod::from_name(&key).ok_or_else(|| {
                        D::Error::custom(format!(
                            "unexpected key '{key}' among route methods (expected one of get, post, put, update, delete, head)"
                        ))
                    })?;
                    let spec: MethodSpec = serde_json::from_value(value)
                        .map_err(|e| D::Error::custom(format!("method '{key}': {e}")))?;
                    Ok((method, spec))
                })
                .collect::<Result<IndexMap<_, _>, D::Error>>()?
        } else {
            let spec: MethodSpec =
                serde_json::from_value(Value::Object(entries)).map_err(D::Error::custom)?;
            IndexMap::from([(ApiMethod::Get, spec)])
        };

        Ok(RouteSpec { methods })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSpec {
    pub handler: HandlerRef,
    #[serde(default)]
    pub params: Params,
    /// Keyed by status code (`"200"`, `"404"`, ...)
    #[serde(default)]
    pub response: IndexMap<String, ResponseSpec>,
}

impl MethodSpec {
    pub fn response_schema(&self, status_code: http::StatusCode) -> Option<&FieldSpec> {
        self.response
            .get(status_code.as_str())
            .and_then(|response| response.schema.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Vec<String>>,
}

impl HandlerRef {
    /// The positional parameter names used to invoke the handler (including `ctx`).
    pub fn server_mapping(&self) -> &[String] {
        self.mapping.as_deref().unwrap_or_default()
    }

    /// The positional parameter names a client passes, which is the server mapping without
    /// the `ctx` entry.
    pub fn client_mapping(&self) -> Vec<&str> {
        self.server_mapping()
            .iter()
            .map(String::as_str)
            .filter(|name| *name != CONTEXT_PARAMETER)
            .collect()
    }
}

impl Display for HandlerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{group}.{}", self.action),
            None => f.write_str(&self.action),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<ParamSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ParamSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<ParamSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<UrlParams>,
}

/// `params.url` is either a flag (`"url": true`) or a schema of the path parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlParams {
    Flag(bool),
    Schema(ParamSchema),
}

impl UrlParams {
    pub fn is_declared(&self) -> bool {
        match self {
            UrlParams::Flag(flag) => *flag,
            UrlParams::Schema(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FieldSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// `Some(Value::Null)` for an explicit `"default": null`
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<ParamSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<FieldSpec>>,
}

impl FieldSpec {
    pub fn of_type(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    /// The coercion to apply. Without an explicit type, `fields` implies an object and `item`
    /// an array.
    pub fn field_type(&self) -> FieldType {
        match &self.type_name {
            Some(type_name) => FieldType::from_name(type_name),
            None if self.fields.is_some() => FieldType::Object,
            None if self.item.is_some() => FieldType::Array,
            None => FieldType::Untyped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Int,
    Array,
    Object,
    Date,
    /// A type name resolved through the type parser registry
    Custom(String),
    Untyped,
}

impl FieldType {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "string" => FieldType::String,
            "number" | "double" | "float" => FieldType::Number,
            "int" | "int64" => FieldType::Int,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            "date" => FieldType::Date,
            _ => FieldType::Custom(name.to_string()),
        }
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
