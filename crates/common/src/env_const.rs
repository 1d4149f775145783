// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use nano_env::Environment;

pub const NANO_LOG: &str = "NANO_LOG";

pub const NANO_API_HTTP_PATH: &str = "NANO_API_HTTP_PATH";

pub const NANO_SERVER_HOST: &str = "NANO_SERVER_HOST";
pub const NANO_SERVER_PORT: &str = "NANO_SERVER_PORT";

pub const DEFAULT_SERVER_PORT: u16 = 9876;

pub fn get_api_http_path(env: &dyn Environment) -> String {
    let path = env.get_or_else(NANO_API_HTTP_PATH, "/api");
    let path = path.trim_end_matches('/');

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub fn get_server_host(env: &dyn Environment) -> String {
    env.get_or_else(NANO_SERVER_HOST, "0.0.0.0")
}
