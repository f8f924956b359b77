// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::anchor::{Anchor, AnchorEntry};
use super::certs::parse_certificates;
use super::errors::Error;
use super::IAnchorStore;
use openssl::x509::X509;

/// The store where the trusted root certificates are stashed.  Anchors keep
/// the order in which they were loaded and are unique by label.
#[derive(Debug)]
pub struct MemoAnchorStore {
    p: Vec<Anchor>,
}

impl Default for MemoAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoAnchorStore {
    /// Returns a new empty MemoAnchorStore
    pub fn new() -> Self {
        Self {
            p: Default::default(),
        }
    }

    /// Add a single anchor
    pub fn add(&mut self, label: &str, cert: X509) -> Result<(), Error> {
        if self.p.iter().any(|a| a.label == label) {
            return Err(Error::Syntax(format!("duplicated anchor label {label}")));
        }

        self.p.push(Anchor::new(label, cert));

        Ok(())
    }

    /// Add to an existing (and possibly empty) MemoAnchorStore the anchors
    /// loaded from the given JSON file
    pub fn load_json(&mut self, j: &str) -> Result<(), Error> {
        let entries: Vec<AnchorEntry> =
            serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))?;

        for e in entries {
            let a = e.parse()?;
            self.add(&a.label, a.cert)?;
        }

        Ok(())
    }

    /// Add every certificate found in a PEM bundle (or a single DER
    /// certificate).  When there is more than one, labels are suffixed with
    /// their position in the bundle.
    pub fn load_pem(&mut self, label: &str, buf: &[u8]) -> Result<(), Error> {
        let certs = parse_certificates(buf)?;
        let single = certs.len() == 1;

        for (i, c) in certs.into_iter().enumerate() {
            if single {
                self.add(label, c)?;
            } else {
                self.add(&format!("{label}-{i}"), c)?;
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.p.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }
}

impl IAnchorStore for MemoAnchorStore {
    fn anchors(&self) -> Vec<Anchor> {
        self.p.clone()
    }

    fn lookup(&self, label: &str) -> Option<Anchor> {
        self.p.iter().find(|a| a.label == label).cloned()
    }
}
