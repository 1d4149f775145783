// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use api_model::{RouteDefinitionDocument, RouteTable};
use indexmap::IndexMap;
use url::Url;

use crate::{action::RemoteAction, error::ClientError};

const DEFINITION_FILE: &str = "api.json";

/// Callables synthesized from a served route definition document.
///
/// Grouped handlers are reached through [`ApiClient::group`], the others through
/// [`ApiClient::action`]. When two routes name the same action, the later one wins.
#[derive(Debug)]
pub struct ApiClient {
    base_url: Url,
    table: RouteTable,
    actions: IndexMap<String, RemoteAction>,
    groups: IndexMap<String, IndexMap<String, RemoteAction>>,
}

impl ApiClient {
    /// Fetch `{definition_url}api.json` and build a client for it. `definition_url` is the
    /// API base path, such as `http://localhost:9876/api/shop/v1/`.
    pub async fn load(definition_url: &str) -> Result<Self, ClientError> {
        Self::load_with(reqwest::Client::new(), definition_url).await
    }

    pub async fn load_with(
        http: reqwest::Client,
        definition_url: &str,
    ) -> Result<Self, ClientError> {
        let base_url = definition_base(definition_url)?;
        let document_url = base_url.join(DEFINITION_FILE)?;

        tracing::debug!("Loading route definitions from {}", document_url);

        let response = http.get(document_url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let table = RouteTable::from_reader(bytes.as_ref())?;

        Ok(Self::from_table(http, base_url, table))
    }

    pub fn from_table(http: reqwest::Client, base_url: Url, table: RouteTable) -> Self {
        let mut actions = IndexMap::new();
        let mut groups: IndexMap<String, IndexMap<String, RemoteAction>> = IndexMap::new();

        for (path, method, spec) in table.document().operations() {
            let action = RemoteAction::new(http.clone(), base_url.clone(), path, method, spec);
            let name = spec.handler.action.clone();

            let replaced = match &spec.handler.group {
                Some(group) => groups
                    .entry(group.clone())
                    .or_default()
                    .insert(name, action),
                None => actions.insert(name, action),
            };

            if replaced.is_some() {
                tracing::debug!("Action {} is declared more than once", spec.handler);
            }
        }

        Self {
            base_url,
            table,
            actions,
            groups,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn document(&self) -> &RouteDefinitionDocument {
        self.table.document()
    }

    /// An action declared without a group
    pub fn action(&self, name: &str) -> Option<&RemoteAction> {
        self.actions.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&IndexMap<String, RemoteAction>> {
        self.groups.get(name)
    }

    /// Look up `group.action` or a plain `action`.
    pub fn find(&self, name: &str) -> Option<&RemoteAction> {
        match name.split_once('.') {
            Some((group, action)) => self.group(group).and_then(|group| group.get(action)),
            None => self.action(name),
        }
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: &[serde_json::Value],
    ) -> Result<serde_json::Value, ClientError> {
        self.find(name)
            .ok_or_else(|| ClientError::UnknownAction(name.to_string()))?
            .call(arguments)
            .await
    }
}

fn definition_base(definition_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(definition_url)?;
    if url.cannot_be_a_base() {
        return Err(ClientError::CannotBeABase(definition_url.to_string()));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
