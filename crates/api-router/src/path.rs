// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Matching of declared route paths (`users/:id/posts`) against request paths.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Parameter(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();

        Self { segments }
    }

    /// Match `path` (already stripped of the API base path), returning the decoded path
    /// parameters on success.
    pub fn matches(&self, path: &str) -> Option<Map<String, Value>> {
        let mut parts = path.split('/').filter(|part| !part.is_empty());
        let mut params = Map::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Parameter(name) => {
                    let value = percent_decode_str(part).decode_utf8_lossy();
                    params.insert(name.clone(), Value::String(value.into_owned()));
                }
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}
