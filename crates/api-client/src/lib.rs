// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Client side of the route definition document: fetches the document an API serves and
//! turns every declared operation into a callable taking positional arguments.

mod action;
mod client;
mod error;

pub use action::{PreparedRequest, RemoteAction};
pub use client::ApiClient;
pub use error::ClientError;
