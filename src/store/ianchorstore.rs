// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::anchor::Anchor;

/// Interface to the store where the trusted root certificates are stashed.
pub trait IAnchorStore {
    /// All the anchors in the store, in the order they were added
    fn anchors(&self) -> Vec<Anchor>;

    /// Lookup an anchor from the store given its label
    fn lookup(&self, label: &str) -> Option<Anchor>;
}
