// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The route-definition document shared by the server dispatch engine and the client
//! invocation synthesizer, and the schema interpreter that shapes request parameters and
//! responses according to it.

pub mod document;
pub mod interpreter;
pub mod js;
pub mod route_table;
pub mod type_parser;

pub use document::{
    ApiMethod, CONTEXT_PARAMETER, FieldSpec, FieldType, HandlerRef, MethodSpec, ParamSchema,
    Params, ResponseSpec, RouteDefinitionDocument, RouteSpec, UrlParams,
};
pub use interpreter::SchemaInterpreter;
pub use route_table::{DocumentError, RouteTable};
pub use type_parser::{TypeParser, TypeParserError, TypeParserRegistry};
