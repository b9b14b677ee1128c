// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! TLS trust root loading for build agent HTTP clients
//!
//! Agents talk to coordinators that are frequently fronted by a private CA.
//! The trust store built here starts from the operating system's roots,
//! falls back to the bundled Mozilla roots when the system store is empty
//! or unreadable, and then appends an optional operator-supplied CA bundle.
//!
//! The provider is pinned to `ring`; see the workspace `Cargo.toml` before
//! changing it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    /// The extra CA file could not be read. Never downgraded to
    /// system-only trust.
    #[error("Failed to read CA file {}: {source}", path.display())]
    ReadCa {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS configuration error: {0}")]
    Config(#[from] rustls::Error),
}

/// A root store together with where its anchors came from
pub struct TrustRoots {
    pub store: RootCertStore,
    /// Anchors taken from the system store or the bundled fallback
    pub system: usize,
    /// Anchors taken from the extra CA file
    pub extra: usize,
}

/// Build the root store: system roots merged with `extra_ca`, if given.
pub fn load_roots(extra_ca: Option<&Path>) -> Result<TrustRoots, TlsError> {
    let mut store = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        tracing::debug!(error = %error, "Error loading a system certificate");
    }
    let (mut system, _) = store.add_parsable_certificates(native.certs);

    if system == 0 {
        tracing::warn!("No usable system certificates, falling back to bundled roots");
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        system = store.len();
    }

    let mut extra = 0;
    if let Some(path) = extra_ca {
        let pem = std::fs::read(path).map_err(|source| TlsError::ReadCa {
            path: path.to_path_buf(),
            source,
        })?;

        let mut certs = Vec::new();
        for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
            match cert {
                Ok(cert) => certs.push(cert),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed PEM block");
                }
            }
        }

        let (added, ignored) = store.add_parsable_certificates(certs);
        if ignored > 0 {
            tracing::warn!(path = %path.display(), ignored, "Ignored unparsable certificates");
        }
        if added == 0 {
            tracing::warn!(
                path = %path.display(),
                "No certs appended, using system certs only"
            );
        } else {
            tracing::info!(path = %path.display(), added, "Trusting extra CA certificates");
        }
        extra = added;
    }

    Ok(TrustRoots {
        store,
        system,
        extra,
    })
}

/// Build a rustls client configuration trusting [`load_roots`].
pub fn client_config(extra_ca: Option<&Path>) -> Result<ClientConfig, TlsError> {
    let roots = load_roots(extra_ca)?;

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots.store)
    .with_no_client_auth();

    Ok(config)
}
