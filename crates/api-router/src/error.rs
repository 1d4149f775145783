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
pub enum ApiLoadingError {
    #[error("No handler '{handler}' registered for {method} {path}")]
    UnresolvedHandler {
        method: ApiMethod,
        path: String,
        handler: String,
    },

    #[error("{method} {path} declares url parameter '{name}', which is not in the path")]
    UnknownPathParameter {
        method: ApiMethod,
        path: String,
        name: String,
    },

    #[error("Failed to load the route definitions of '{module}': {source}")]
    Document {
        module: String,
        #[source]
        source: DocumentError,
    },
}
