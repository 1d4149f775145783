// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Server side of the route definition document: binds every `(path, method)` to a typed
//! handler at boot, and dispatches requests through parameter extraction, schema shaping,
//! invocation, and response shaping.

mod api_router;
pub mod binder;
mod error;
pub mod handler;
pub mod path;
mod provider;

pub use api_router::{ApiOptions, ApiRouter, INTROSPECTION_FILE};
pub use error::ApiLoadingError;
pub use handler::{
    Argument, Arguments, Handler, HandlerContext, HandlerError, HandlerRegistry, Namespace,
};
pub use provider::ApiProvider;
