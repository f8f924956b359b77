// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

pub use self::anchor::Anchor;
pub use self::certs::parse_certificates;
pub use self::errors::Error;
pub use self::ianchorstore::IAnchorStore;
pub use self::memo_anchorstore::MemoAnchorStore;

mod anchor;
mod certs;
mod errors;
mod ianchorstore;
mod memo_anchorstore;
