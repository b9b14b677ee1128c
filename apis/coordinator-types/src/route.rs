// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Named route templates
//!
//! A route pairs an HTTP method with a path template such as
//! `/api/tasks/:id` and declares how request parameters travel: appended
//! to the query string or sent as an URL-encoded form body.

use std::collections::BTreeMap;

use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {route} requires a value for :{name}")]
    MissingInterpolation { route: &'static str, name: String },
}

/// HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Where a route's parameters are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamEncoding {
    /// Parameters are appended to the URL query string
    Query,
    /// Parameters form an `application/x-www-form-urlencoded` body
    Form,
}

/// An immutable, named endpoint template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub encoding: ParamEncoding,
}

impl Route {
    pub const fn new(
        name: &'static str,
        method: Method,
        path: &'static str,
        encoding: ParamEncoding,
    ) -> Self {
        Self {
            name,
            method,
            path,
            encoding,
        }
    }

    pub fn requires_form_encode(&self) -> bool {
        self.encoding == ParamEncoding::Form
    }

    /// Substitute every `:name` segment with its percent-encoded value.
    ///
    /// Values for names the template does not mention are ignored. A
    /// placeholder without a value, or with an empty one, is an error since
    /// it would silently address a different endpoint.
    pub fn interpolate(&self, values: &BTreeMap<String, String>) -> Result<String, RouteError> {
        let mut segments = Vec::new();
        for segment in self.path.split('/') {
            match segment.strip_prefix(':') {
                Some(name) => {
                    let value = values
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| RouteError::MissingInterpolation {
                            route: self.name,
                            name: name.to_string(),
                        })?;
                    segments.push(urlencoding::encode(value).into_owned());
                }
                None => segments.push(segment.to_string()),
            }
        }
        Ok(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHOW: Route = Route::new("show", Method::Get, "/api/things/:id/parts/:part", ParamEncoding::Query);

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_interpolate_all_placeholders() {
        let path = SHOW
            .interpolate(&values(&[("id", "42"), ("part", "log"), ("extra", "x")]))
            .unwrap();
        assert_eq!(path, "/api/things/42/parts/log");
    }

    #[test]
    fn test_interpolate_percent_encodes_values() {
        let path = SHOW
            .interpolate(&values(&[("id", "a b/c"), ("part", "x")]))
            .unwrap();
        assert_eq!(path, "/api/things/a%20b%2Fc/parts/x");
    }

    #[test]
    fn test_interpolate_missing_value() {
        let err = SHOW.interpolate(&values(&[("id", "42")])).unwrap_err();
        assert_eq!(
            err,
            RouteError::MissingInterpolation {
                route: "show",
                name: "part".to_string()
            }
        );

        let err = SHOW
            .interpolate(&values(&[("id", ""), ("part", "x")]))
            .unwrap_err();
        assert!(matches!(err, RouteError::MissingInterpolation { .. }));
    }

    #[test]
    fn test_method_and_encoding() {
        assert_eq!(Method::Post.to_string(), "POST");
        assert!(!SHOW.requires_form_encode());
    }
}
