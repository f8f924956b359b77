// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Thin helpers over the OpenSSL certificate API.  Only issuer/subject
//! linkage and raw signatures are looked at: validity periods, extensions
//! and revocation are not.

use super::errors::Error;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::sign::Verifier;
use openssl::x509::{X509NameRef, X509Ref};
use std::cmp::Ordering;

pub(crate) fn crypto(e: ErrorStack) -> Error {
    Error::Crypto(e.to_string())
}

fn names_match(a: &X509NameRef, b: &X509NameRef) -> bool {
    matches!(a.try_cmp(b), Ok(Ordering::Equal))
}

/// Whether `cert` names `issuer` as its issuer
pub fn issued_by(cert: &X509Ref, issuer: &X509Ref) -> bool {
    names_match(cert.issuer_name(), issuer.subject_name())
}

pub fn is_self_issued(cert: &X509Ref) -> bool {
    names_match(cert.issuer_name(), cert.subject_name())
}

/// Whether the signature on `cert` verifies under the public key of
/// `issuer`.  A malformed signature counts as a failed one.
pub fn signed_by(cert: &X509Ref, issuer: &X509Ref) -> Result<bool, Error> {
    let key = issuer.public_key().map_err(crypto)?;

    Ok(cert.verify(&key).unwrap_or(false))
}

/// DER equality
pub fn same_cert(a: &X509Ref, b: &X509Ref) -> bool {
    match (a.to_der(), b.to_der()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// SHA-256 over the certificate's SubjectPublicKeyInfo
pub fn key_id(cert: &X509Ref) -> Result<[u8; 32], Error> {
    let spki = cert
        .public_key()
        .and_then(|k| k.public_key_to_der())
        .map_err(crypto)?;

    Ok(openssl::sha::sha256(&spki))
}

/// RSASSA-PKCS1-v1.5 with SHA-256 under the certificate's key
pub fn verify_signature(cert: &X509Ref, data: &[u8], sig: &[u8]) -> Result<bool, Error> {
    let key = cert.public_key().map_err(crypto)?;

    let mut verifier = Verifier::new(MessageDigest::sha256(), &key).map_err(crypto)?;
    verifier.update(data).map_err(crypto)?;

    Ok(verifier.verify(sig).unwrap_or(false))
}

/// The subject common name, or the full subject when there is none
pub fn describe(cert: &X509Ref) -> String {
    let subject = cert.subject_name();

    if let Some(cn) = subject
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|e| e.data().as_utf8().ok())
    {
        return cn.to_string();
    }

    subject
        .entries()
        .filter_map(|e| {
            let v = e.data().as_utf8().ok()?;
            let k = e.object().nid().short_name().unwrap_or("?");
            Some(format!("{k}={v}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
