// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::attribute::{AttributeTag, KeyType};
use super::envelope::KeyObject;
use super::errors::Error;
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcKey, EcPoint};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, PKeyRef, Public};
use openssl::rsa::Rsa;
use openssl::x509::{X509Req, X509};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Curve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl Curve {
    /// Pick the curve from the length of an uncompressed `04 || X || Y` point
    fn from_point_len(len: usize) -> Option<Self> {
        match len {
            65 => Some(Curve::P256),
            97 => Some(Curve::P384),
            133 => Some(Curve::P521),
            _ => None,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        match nid {
            Nid::X9_62_PRIME256V1 => Some(Curve::P256),
            Nid::SECP384R1 => Some(Curve::P384),
            Nid::SECP521R1 => Some(Curve::P521),
            _ => None,
        }
    }

    pub fn nid(&self) -> Nid {
        match self {
            Curve::P256 => Nid::X9_62_PRIME256V1,
            Curve::P384 => Nid::SECP384R1,
            Curve::P521 => Nid::SECP521R1,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum KeyAlgorithm {
    Rsa { bits: u32 },
    Ec(Curve),
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA-{bits}"),
            KeyAlgorithm::Ec(c) => write!(f, "EC {c}"),
        }
    }
}

/// What the key object says the key is for.  Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum KeyUsage {
    Signature,
    Encryption,
    KeyAgreement,
    Unspecified,
}

/// A public key in SubjectPublicKeyInfo form
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublicKey {
    pub algorithm: KeyAlgorithm,
    pub usage: KeyUsage,
    #[serde_as(as = "serde_with::hex::Hex")]
    spki: Vec<u8>,
}

fn crypto(e: ErrorStack) -> Error {
    Error::Crypto(e.to_string())
}

impl PublicKey {
    /// Wrap a key already held by OpenSSL (RSA or one of the supported
    /// NIST curves)
    pub fn from_pkey(pkey: &PKeyRef<Public>) -> Result<Self, Error> {
        let algorithm = match pkey.id() {
            Id::RSA => KeyAlgorithm::Rsa { bits: pkey.bits() },
            Id::EC => {
                let ec = pkey.ec_key().map_err(crypto)?;
                let curve = ec
                    .group()
                    .curve_name()
                    .and_then(Curve::from_nid)
                    .ok_or_else(|| Error::UnsupportedKeyType("unsupported curve".to_string()))?;
                KeyAlgorithm::Ec(curve)
            }
            other => {
                return Err(Error::UnsupportedKeyType(format!(
                    "key algorithm {other:?}"
                )))
            }
        };

        Ok(Self {
            algorithm,
            usage: KeyUsage::Unspecified,
            spki: pkey.public_key_to_der().map_err(crypto)?,
        })
    }

    pub fn to_der(&self) -> &[u8] {
        &self.spki
    }

    pub fn to_pem(&self) -> Result<Vec<u8>, Error> {
        self.to_pkey()?.public_key_to_pem().map_err(crypto)
    }

    pub fn to_pkey(&self) -> Result<PKey<Public>, Error> {
        PKey::public_key_from_der(&self.spki).map_err(crypto)
    }

    pub fn key_id_sha1(&self) -> [u8; 20] {
        openssl::sha::sha1(&self.spki)
    }

    pub fn key_id_sha256(&self) -> [u8; 32] {
        openssl::sha::sha256(&self.spki)
    }

    /// Whether `other` is the same key, regardless of where it came from
    pub fn matches(&self, other: &PublicKey) -> bool {
        self.key_id_sha256() == other.key_id_sha256()
    }
}

impl KeyObject {
    /// Rebuild the public half of this key object as an SPKI.  Only RSA and
    /// EC (P-256, P-384, P-521) keys are supported.
    pub fn public_key(&self) -> Result<PublicKey, Error> {
        let signing = self.flag(AttributeTag::Sign) || self.flag(AttributeTag::Verify);

        match self.key_type() {
            Some(KeyType::Rsa) => {
                let n = BigNum::from_slice(self.bytes(AttributeTag::Modulus)?).map_err(crypto)?;
                let e = BigNum::from_slice(self.bytes(AttributeTag::PublicExponent)?)
                    .map_err(crypto)?;

                let rsa = Rsa::from_public_components(n, e).map_err(crypto)?;
                let pkey = PKey::from_rsa(rsa).map_err(crypto)?;

                let usage = if signing {
                    KeyUsage::Signature
                } else if self.flag(AttributeTag::Encrypt) || self.flag(AttributeTag::Decrypt) {
                    KeyUsage::Encryption
                } else {
                    KeyUsage::Unspecified
                };

                Ok(PublicKey {
                    algorithm: KeyAlgorithm::Rsa { bits: pkey.bits() },
                    usage,
                    spki: pkey.public_key_to_der().map_err(crypto)?,
                })
            }
            Some(KeyType::Ec) => {
                // the EC point lives in the modulus attribute
                let point = self.bytes(AttributeTag::Modulus)?;
                let curve = Curve::from_point_len(point.len()).ok_or_else(|| {
                    Error::UnsupportedKeyType(format!(
                        "unsupported curve ({} byte point)",
                        point.len()
                    ))
                })?;

                let group = EcGroup::from_curve_name(curve.nid()).map_err(crypto)?;
                let mut ctx = BigNumContext::new().map_err(crypto)?;
                let p = EcPoint::from_bytes(&group, point, &mut ctx).map_err(crypto)?;
                let ec = EcKey::from_public_key(&group, &p).map_err(crypto)?;
                let pkey = PKey::from_ec_key(ec).map_err(crypto)?;

                Ok(PublicKey {
                    algorithm: KeyAlgorithm::Ec(curve),
                    usage: if signing {
                        KeyUsage::Signature
                    } else {
                        KeyUsage::KeyAgreement
                    },
                    spki: pkey.public_key_to_der().map_err(crypto)?,
                })
            }
            Some(other) => Err(Error::UnsupportedKeyType(other.to_string())),
            None => Err(Error::MissingAttribute(format!("{}", AttributeTag::KeyType))),
        }
    }
}

/// Load a public key from an SPKI, an X.509 certificate or a PKCS#10 CSR,
/// each in either PEM or DER form.
pub fn load_public_key(buf: &[u8]) -> Result<PublicKey, Error> {
    let pkey = if buf.starts_with(b"-----BEGIN") {
        PKey::public_key_from_pem(buf)
            .or_else(|_| X509::from_pem(buf).and_then(|c| c.public_key()))
            .or_else(|_| X509Req::from_pem(buf).and_then(|r| r.public_key()))
    } else {
        PKey::public_key_from_der(buf)
            .or_else(|_| X509::from_der(buf).and_then(|c| c.public_key()))
            .or_else(|_| X509Req::from_der(buf).and_then(|r| r.public_key()))
    }
    .map_err(|e| Error::Crypto(format!("not an SPKI, certificate or CSR: {e}")))?;

    PublicKey::from_pkey(&pkey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::attribute::AttributeValue;
    use crate::attestation::Envelope;
    use openssl::ec::PointConversionForm;
    use openssl::hash::MessageDigest;
    use openssl::pkey::Private;
    use openssl::sign::{Signer, Verifier};
    use openssl::x509::X509ReqBuilder;

    const TEST_DATA: &[u8] = b"test data to sign";
    const TEST_ATTESTATION_GZ: &[u8] = include_bytes!("../../testdata/attestation-p256.bin.gz");
    const TEST_ROOT_PEM: &[u8] = include_bytes!("../../testdata/manufacturer-root.pem");

    fn key_object(attrs: Vec<(AttributeTag, AttributeValue)>) -> KeyObject {
        KeyObject {
            handle: 1,
            attribute_count: attrs.len() as u32,
            attributes: attrs.into_iter().collect(),
            ..Default::default()
        }
    }

    fn sign(key: &PKey<Private>) -> Vec<u8> {
        let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
        signer.update(TEST_DATA).unwrap();
        signer.sign_to_vec().unwrap()
    }

    fn verify(key: &PublicKey, sig: &[u8]) -> bool {
        let pkey = key.to_pkey().unwrap();
        let mut verifier = Verifier::new(MessageDigest::sha256(), &pkey).unwrap();
        verifier.update(TEST_DATA).unwrap();
        verifier.verify(sig).unwrap()
    }

    #[test]
    fn rsa_2048_ok() {
        let rsa = Rsa::generate(2048).unwrap();

        let ko = key_object(vec![
            (AttributeTag::KeyType, AttributeValue::KeyType(KeyType::Rsa)),
            (AttributeTag::Modulus, AttributeValue::Bytes(rsa.n().to_vec())),
            (
                AttributeTag::PublicExponent,
                AttributeValue::Bytes(rsa.e().to_vec()),
            ),
            (AttributeTag::Verify, AttributeValue::Bool(true)),
        ]);

        let private = PKey::from_rsa(rsa).unwrap();
        let sig = sign(&private);

        let pk = ko.public_key().unwrap();
        assert_eq!(pk.algorithm, KeyAlgorithm::Rsa { bits: 2048 });
        assert_eq!(pk.usage, KeyUsage::Signature);
        assert_eq!(pk.to_der(), private.public_key_to_der().unwrap().as_slice());
        assert!(verify(&pk, &sig));
    }

    #[test]
    fn rsa_encryption_usage() {
        let rsa = Rsa::generate(2048).unwrap();

        let ko = key_object(vec![
            (AttributeTag::KeyType, AttributeValue::KeyType(KeyType::Rsa)),
            (AttributeTag::Modulus, AttributeValue::Bytes(rsa.n().to_vec())),
            (
                AttributeTag::PublicExponent,
                AttributeValue::Bytes(rsa.e().to_vec()),
            ),
            (AttributeTag::Sign, AttributeValue::Bool(false)),
            (AttributeTag::Encrypt, AttributeValue::Bool(true)),
        ]);

        assert_eq!(ko.public_key().unwrap().usage, KeyUsage::Encryption);
    }

    fn ec_round_trip(nid: Nid, point_len: usize, curve: Curve) {
        let group = EcGroup::from_curve_name(nid).unwrap();
        let ec = EcKey::generate(&group).unwrap();

        let mut ctx = BigNumContext::new().unwrap();
        let point = ec
            .public_key()
            .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx)
            .unwrap();
        assert_eq!(point.len(), point_len);

        let ko = key_object(vec![
            (AttributeTag::KeyType, AttributeValue::KeyType(KeyType::Ec)),
            (AttributeTag::Modulus, AttributeValue::Bytes(point)),
            (AttributeTag::Sign, AttributeValue::Bool(true)),
        ]);

        let private = PKey::from_ec_key(ec).unwrap();
        let sig = sign(&private);

        let pk = ko.public_key().unwrap();
        assert_eq!(pk.algorithm, KeyAlgorithm::Ec(curve));
        assert_eq!(pk.usage, KeyUsage::Signature);
        assert!(verify(&pk, &sig));
    }

    #[test]
    fn ec_p256_ok() {
        ec_round_trip(Nid::X9_62_PRIME256V1, 65, Curve::P256);
    }

    #[test]
    fn ec_p384_ok() {
        ec_round_trip(Nid::SECP384R1, 97, Curve::P384);
    }

    #[test]
    fn ec_p521_ok() {
        ec_round_trip(Nid::SECP521R1, 133, Curve::P521);
    }

    #[test]
    fn ec_without_signing_flags_is_key_agreement() {
        let e = Envelope::decode(TEST_ATTESTATION_GZ).unwrap();
        let mut ko = e.first_key.clone();
        ko.attributes.remove(&AttributeTag::Sign);
        ko.attributes.remove(&AttributeTag::Verify);

        assert_eq!(ko.public_key().unwrap().usage, KeyUsage::KeyAgreement);
    }

    #[test]
    fn ec_unsupported_curve() {
        let ko = key_object(vec![
            (AttributeTag::KeyType, AttributeValue::KeyType(KeyType::Ec)),
            (AttributeTag::Modulus, AttributeValue::Bytes(vec![0x04; 57])),
        ]);

        assert!(matches!(
            ko.public_key().unwrap_err(),
            Error::UnsupportedKeyType(_)
        ));
    }

    #[test]
    fn unsupported_key_type() {
        let ko = key_object(vec![(
            AttributeTag::KeyType,
            AttributeValue::KeyType(KeyType::Aes),
        )]);

        assert_eq!(
            ko.public_key().unwrap_err(),
            Error::UnsupportedKeyType("CKK_AES".to_string())
        );
    }

    #[test]
    fn missing_modulus() {
        let ko = key_object(vec![(
            AttributeTag::KeyType,
            AttributeValue::KeyType(KeyType::Rsa),
        )]);

        assert!(matches!(
            ko.public_key().unwrap_err(),
            Error::MissingAttribute(_)
        ));
    }

    #[test]
    fn real_attestation_key() {
        let e = Envelope::decode(TEST_ATTESTATION_GZ).unwrap();
        let pk = e.first_key.public_key().unwrap();

        assert_eq!(pk.algorithm, KeyAlgorithm::Ec(Curve::P256));

        // the exported key reads back as the same key
        let pem = pk.to_pem().unwrap();
        let again = load_public_key(&pem).unwrap();
        assert!(pk.matches(&again));
        assert_eq!(again.to_der(), pk.to_der());
    }

    #[test]
    fn load_from_certificate() {
        let pk = load_public_key(TEST_ROOT_PEM).unwrap();
        assert!(matches!(pk.algorithm, KeyAlgorithm::Rsa { .. }));

        let cert = X509::from_pem(TEST_ROOT_PEM).unwrap();
        let from_der = load_public_key(&cert.to_der().unwrap()).unwrap();
        assert!(pk.matches(&from_der));
        assert_eq!(pk.key_id_sha1(), from_der.key_id_sha1());
    }

    #[test]
    fn load_from_csr() {
        let group = EcGroup::from_curve_name(Nid::SECP384R1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

        let mut builder = X509ReqBuilder::new().unwrap();
        builder.set_pubkey(&key).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let csr = builder.build();

        let from_pem = load_public_key(&csr.to_pem().unwrap()).unwrap();
        let from_der = load_public_key(&csr.to_der().unwrap()).unwrap();

        assert_eq!(from_pem.algorithm, KeyAlgorithm::Ec(Curve::P384));
        assert!(from_pem.matches(&from_der));
        assert_eq!(from_pem.to_der(), key.public_key_to_der().unwrap().as_slice());
    }

    #[test]
    fn load_garbage() {
        assert!(matches!(
            load_public_key(b"not a key").unwrap_err(),
            Error::Crypto(_)
        ));
    }
}
