// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Hardware key attestation decoding and verification.
//!
//! This crate provides an API to decode and verify the key attestations
//! produced by network HSMs, where a module proves that a named key was
//! generated inside it and never left it.
//!
//! The API allows:
//! * Decoding the (optionally gzip-compressed) binary attestation, including
//!   the PKCS#11 attributes of the attested key objects
//! * Rebuilding the attested public key as a SubjectPublicKeyInfo
//! * Building certificate chains from two or more independent roots and
//!   checking that they agree on the signing key
//! * Verifying the attestation signature
//! * Verifying smart-card (PIV) attestation certificates against a root

pub mod attestation;
pub mod store;
pub mod verify;
