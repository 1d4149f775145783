// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod map;

pub use map::MapEnvironment;

use std::str::FromStr;

/// Source of configuration values.
///
/// Everything configurable in the API layer (log filter, HTTP root path, server
/// port) is looked up through this trait, so tests can substitute a
/// [`MapEnvironment`] for the process environment.
pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or_else(&self, key: &str, default_value: &str) -> String {
        self.get(key).unwrap_or_else(|| default_value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid value {value} for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

/// Parse the value for `key`, falling back to `default_value` when unset.
pub fn get_parsed<T>(env: &dyn Environment, key: &str, default_value: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(key) {
        Some(value) => value.trim().parse::<T>().map_err(|e| EnvError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            message: e.to_string(),
        }),
        None => Ok(default_value),
    }
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
