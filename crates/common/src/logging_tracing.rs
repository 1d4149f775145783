// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Tracing configuration setup.
//!
//! The API layer is instrumented with Rust's `tracing` framework.
//!
//! Calling the `init` function will initialize a global tracing subscriber based on the value of
//! the `NANO_LOG` environment variable which follows the same conventions as `RUST_LOG`. This will
//! provide console logging at `WARN` level unless configured otherwise.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};

use nano_env::Environment;

use crate::env_const::NANO_LOG;

/// Initialize the tracing subscriber.
///
/// Creates a compact `tracing_subscriber::fmt` layer filtered by `NANO_LOG`.
pub fn init(env: &dyn Environment) -> Result<(), LoggingError> {
    let filter = create_filter(env.get(NANO_LOG).as_deref())?;
    let fmt_layer = tracing_subscriber::fmt::layer().compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

fn create_filter(directives: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());

    match directives {
        Some(directives) => Ok(builder.parse(directives)?),
        None => Ok(builder.parse("")?),
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid NANO_LOG directives: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}
