// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fs::File, io::BufReader, io::Read, path::Path};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::RouteDefinitionDocument;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Malformed route definition document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No such file {0}")]
    FileNotFound(String),

    #[error("Failed to open file {0}")]
    FileOpen(String, #[source] std::io::Error),
}

/// A parsed route definition document together with the exact JSON it was parsed from.
///
/// Built once at boot and read-only afterwards. The raw form is what the introspection endpoint
/// serves, so clients see the document verbatim.
#[derive(Debug, Clone)]
pub struct RouteTable {
    raw: Value,
    document: RouteDefinitionDocument,
}

impl RouteTable {
    pub fn from_value(raw: Value) -> Result<Self, DocumentError> {
        let document = RouteDefinitionDocument::deserialize(&raw)?;
        Ok(Self { raw, document })
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DocumentError> {
        let raw: Value = serde_json::from_reader(reader)?;
        Self::from_value(raw)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Err(DocumentError::FileNotFound(display));
        }

        let file = File::open(path).map_err(|e| DocumentError::FileOpen(display, e))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn document(&self) -> &RouteDefinitionDocument {
        &self.document
    }

    pub fn version(&self) -> u32 {
        self.document.version
    }
}

impl std::str::FromStr for RouteTable {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_value(serde_json::from_str(s)?)
    }
}
