// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Request descriptors

use std::collections::BTreeMap;

use coordinator_types::Route;

use crate::params::{Options, ParamValue};

/// A route plus everything needed to turn it into a concrete request.
///
/// Built per call site and consumed by the call. The decode target is the
/// type parameter of [`crate::CoordinatorClient::execute`].
#[derive(Debug)]
pub struct Request {
    pub route: &'static Route,
    pub interpolations: BTreeMap<String, String>,
    pub options: Options,
    pub body: Option<reqwest::Body>,
}

impl Request {
    pub fn new(route: &'static Route) -> Self {
        Self {
            route,
            interpolations: BTreeMap::new(),
            options: Options::new(),
            body: None,
        }
    }

    /// Set the value substituted for `:name` in the route path
    pub fn interpolate(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.interpolations.insert(name.into(), value.into());
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options.extend(options);
        self
    }

    /// Raw request body. Only valid on query-encoded routes, since a
    /// form-encoded route's body is its parameters.
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }
}
