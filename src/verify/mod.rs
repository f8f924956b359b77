// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The verify module establishes trust in a decoded attestation.
//!
//! [`ConsensusValidator`] builds one certificate chain per configured root,
//! requires all of the resulting leaf certificates to carry the same public
//! key, and checks the attestation signature under that key.
//! [`PivValidator`] covers the single-root case where the attestation is
//! itself a certificate.
//!
//! # Example
//!
//! ```
//! use keyattest::attestation::Envelope;
//! use keyattest::store::{parse_certificates, MemoAnchorStore};
//! use keyattest::verify::ConsensusValidator;
//!
//! const ATTESTATION: &[u8] = include_bytes!("../../testdata/attestation-p256.bin.gz");
//! const CERTS: &[u8] = include_bytes!("../../testdata/cert-chain.pem");
//! const ANCHORS: &str = include_str!("../../testdata/anchors.json");
//!
//! let mut tas = MemoAnchorStore::new();
//! tas.load_json(ANCHORS).expect("loading trust anchors");
//!
//! let v = ConsensusValidator::new(&tas).expect("configuring validator");
//!
//! let e = Envelope::decode(ATTESTATION).expect("decoding attestation");
//! let pool = parse_certificates(CERTS).expect("parsing certificates");
//!
//! let res = v.verify(&e, &pool);
//! assert!(res.is_success());
//! ```

pub use self::chain::{build_chain, Predicate, TrustChain};
pub use self::consensus::ConsensusValidator;
pub use self::errors::Error;
pub use self::piv::PivValidator;
pub use self::result::VerificationResult;

pub mod cert;
mod chain;
mod consensus;
mod errors;
mod piv;
mod result;
#[cfg(test)]
mod testutil;
