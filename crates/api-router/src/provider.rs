// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{path::Path, sync::Arc};

use api_model::{RouteTable, SchemaInterpreter, TypeParserRegistry};
use common::router::{CompositeRouter, Router};
use indexmap::IndexMap;
use nano_env::Environment;

use crate::{
    api_router::{ApiOptions, ApiRouter},
    error::ApiLoadingError,
    handler::HandlerRegistry,
};

struct ApiRegistration {
    handlers: HandlerRegistry,
    table: Arc<RouteTable>,
    options: ApiOptions,
}

/// Collects the APIs of every module during boot, then exposes them all at once.
///
/// Type parsers registered through [`ApiProvider::type_parsers_mut`] are frozen when the
/// router is built and shared by every API.
pub struct ApiProvider {
    env: Arc<dyn Environment>,
    type_parsers: TypeParserRegistry,
    apis: IndexMap<String, ApiRegistration>,
}

impl ApiProvider {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            type_parsers: TypeParserRegistry::new(),
            apis: IndexMap::new(),
        }
    }

    pub fn type_parsers_mut(&mut self) -> &mut TypeParserRegistry {
        &mut self.type_parsers
    }

    /// Register the API of `module`. The prefix defaults to the module name; registering the
    /// same module again replaces its previous API.
    pub fn register_api(
        &mut self,
        module: &str,
        handlers: HandlerRegistry,
        table: RouteTable,
        prefix: Option<&str>,
    ) -> &mut Self {
        let options = ApiOptions::from_env(prefix.unwrap_or(module), self.env.as_ref());

        let registration = ApiRegistration {
            handlers,
            table: Arc::new(table),
            options,
        };

        if self.apis.insert(module.to_string(), registration).is_some() {
            tracing::debug!("Replaced the API of module '{}'", module);
        }
        self
    }

    pub fn register_api_file(
        &mut self,
        module: &str,
        handlers: HandlerRegistry,
        document: impl AsRef<Path>,
        prefix: Option<&str>,
    ) -> Result<&mut Self, ApiLoadingError> {
        let table =
            RouteTable::from_file(document).map_err(|source| ApiLoadingError::Document {
                module: module.to_string(),
                source,
            })?;

        Ok(self.register_api(module, handlers, table, prefix))
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }

    /// Bind every registered API, in registration order.
    pub fn build(self) -> Result<Vec<ApiRouter>, ApiLoadingError> {
        let interpreter = Arc::new(SchemaInterpreter::new(Arc::new(self.type_parsers)));

        self.apis
            .into_values()
            .map(|api| {
                ApiRouter::new(api.table, &api.handlers, interpreter.clone(), &api.options)
            })
            .collect()
    }

    /// A single router serving every registered API; unmatched requests get a 404.
    pub fn into_router(self) -> Result<CompositeRouter, ApiLoadingError> {
        let routers = self
            .build()?
            .into_iter()
            .map(|router| Box::new(router) as Box<dyn Router + Send + Sync>)
            .collect();

        Ok(CompositeRouter::new(routers))
    }
}
