// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use openssl::x509::X509;
use serde::Deserialize;

/// A trusted root certificate and the name it is known by
#[derive(Clone, Debug)]
pub struct Anchor {
    pub label: String,
    pub cert: X509,
}

impl Anchor {
    pub fn new(label: &str, cert: X509) -> Self {
        Self {
            label: label.to_string(),
            cert,
        }
    }
}

/// The JSON form of an anchor
#[derive(Deserialize, Debug)]
pub(super) struct AnchorEntry {
    label: String,

    /// The root certificate serialised using the textual encoding described
    /// in §5.1 of RFC7468
    certificate: String,
}

impl AnchorEntry {
    pub(super) fn parse(self) -> Result<Anchor, Error> {
        let cert = X509::from_pem(self.certificate.as_bytes())
            .map_err(|e| Error::Certificate(format!("anchor {}: {e}", self.label)))?;

        Ok(Anchor {
            label: self.label,
            cert,
        })
    }
}
