// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Request parameter encoding
//!
//! Parameters are a closed set of value shapes. Each shape flattens into
//! zero or more `key=value` pairs, which then land in the query string or
//! in a form body depending on the route.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::ClientError;

/// Option bag attached to a request. Sorted, so encoding is deterministic.
pub type Options = BTreeMap<String, ParamValue>;

/// A single request parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    /// Expanded into one pair per element, in order
    StringList(Vec<String>),
    /// Formatted as a plain decimal, never in exponent notation
    Number(f64),
    /// Arbitrary structured data, carried as base64-encoded JSON.
    ///
    /// This is an escape hatch, not a serialization contract: peers that
    /// do not decode the same way see an opaque string.
    Opaque(serde_json::Value),
}

impl ParamValue {
    /// Capture a structured value as an opaque parameter.
    ///
    /// Fails with [`ClientError::Encoding`] when the value cannot be
    /// represented (for example a map with non-string keys).
    pub fn opaque<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(ParamValue::Opaque)
            .map_err(|e| ClientError::Encoding(format!("opaque parameter: {}", e)))
    }

    fn push_pairs(&self, key: &str, out: &mut Vec<(String, String)>) -> Result<(), ClientError> {
        match self {
            ParamValue::String(s) => out.push((key.to_string(), s.clone())),
            ParamValue::StringList(items) => {
                out.extend(items.iter().map(|s| (key.to_string(), s.clone())));
            }
            ParamValue::Number(n) => out.push((key.to_string(), format_number(key, *n)?)),
            ParamValue::Opaque(value) => {
                let raw = serde_json::to_vec(value)
                    .map_err(|e| ClientError::Encoding(format!("{}: {}", key, e)))?;
                out.push((key.to_string(), STANDARD.encode(raw)));
            }
        }
        Ok(())
    }
}

fn format_number(key: &str, n: f64) -> Result<String, ClientError> {
    if !n.is_finite() {
        return Err(ClientError::Encoding(format!(
            "{}: non-finite number {}",
            key, n
        )));
    }
    // f64's Display is the shortest round-trip decimal with no exponent
    Ok(n.to_string())
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::StringList(items)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(items: Vec<&str>) -> Self {
        ParamValue::StringList(items.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ParamValue {
    fn from(items: &[&str]) -> Self {
        ParamValue::StringList(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Number(f64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Number(f64::from(n))
    }
}

/// Flatten an option bag into key/value pairs.
///
/// Nothing is emitted unless every value encodes, so a failure never
/// leaves a half-built request behind.
pub fn encode_pairs(options: &Options) -> Result<Vec<(String, String)>, ClientError> {
    let mut pairs = Vec::with_capacity(options.len());
    for (key, value) in options {
        value.push_pairs(key, &mut pairs)?;
    }
    Ok(pairs)
}

/// Encode an option bag as an `application/x-www-form-urlencoded` body
pub fn encode_form(options: &Options) -> Result<String, ClientError> {
    let pairs = encode_pairs(options)?;
    Ok(url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish())
}

/// Append an option bag to the query string of `url`
pub fn append_query(url: &mut url::Url, options: &Options) -> Result<(), ClientError> {
    let pairs = encode_pairs(options)?;
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(())
}
