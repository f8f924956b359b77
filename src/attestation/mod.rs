// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The attestation module decodes the binary key attestation returned by an
//! HSM into an [`Envelope`], and rebuilds the attested public key from the
//! attributes of its first key object.
//!
//! # Example
//!
//! ```
//! use keyattest::attestation::{AttributeTag, Envelope, KeyType};
//!
//! const ATTESTATION: &[u8] = include_bytes!("../../testdata/attestation-p256.bin.gz");
//!
//! // gzip framing is detected and removed
//! let e = Envelope::decode(ATTESTATION).expect("decoding attestation");
//! assert!(e.compressed);
//!
//! let key = &e.first_key;
//! assert_eq!(key.key_type(), Some(KeyType::Ec));
//! println!("label: {:?}", key.get(AttributeTag::Label));
//!
//! // the attested key, as an SPKI
//! let pk = key.public_key().expect("rebuilding public key");
//! println!("{} {}", pk.algorithm, hex::encode(pk.key_id_sha256()));
//! ```

pub use self::attribute::{interpret, AttributeTag, AttributeValue, KeyType, ObjectClass};
pub use self::envelope::{
    Envelope, InfoHeader, KeyObject, RequestFlag, RequestFlagSet, ResponseHeader, SIGNATURE_LEN,
};
pub use self::errors::Error;
pub use self::public_key::{load_public_key, Curve, KeyAlgorithm, KeyUsage, PublicKey};

mod attribute;
mod envelope;
mod errors;
mod public_key;
mod reader;
#[cfg(test)]
pub(crate) mod testutil;
