// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use api_model::{ApiMethod, DocumentError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL {0} cannot carry a path")]
    CannotBeABase(String),

    #[error("Invalid route definition document: {0}")]
    Document(#[from] DocumentError),

    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{method} {path} takes {expected} arguments, {given} given")]
    TooManyArguments {
        method: ApiMethod,
        path: String,
        expected: usize,
        given: usize,
    },

    #[error("{method} {path} needs a value for the path parameter '{name}'")]
    MissingPathArgument {
        method: ApiMethod,
        path: String,
        name: String,
    },

    #[error("No action '{0}'")]
    UnknownAction(String),
}
