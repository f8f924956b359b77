// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::cert::{describe, issued_by, same_cert, signed_by};
use super::errors::Error;
use openssl::x509::{X509Ref, X509};
use tracing::debug;

/// An ordered certificate path: the anchor first, the leaf last.  Each
/// certificate is issued by, and signed under the key of, the one before it.
#[derive(Clone, Debug)]
pub struct TrustChain {
    certs: Vec<X509>,
}

impl TrustChain {
    pub(crate) fn new(certs: Vec<X509>) -> Self {
        Self { certs }
    }

    pub fn certs(&self) -> &[X509] {
        &self.certs
    }

    pub fn anchor(&self) -> Option<&X509Ref> {
        self.certs.first().map(|c| &**c)
    }

    pub fn leaf(&self) -> Option<&X509Ref> {
        self.certs.last().map(|c| &**c)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// One line per certificate, anchor first
    pub fn describe(&self) -> Vec<String> {
        self.certs.iter().map(|c| describe(c)).collect()
    }
}

/// Optional extra condition a pool certificate must meet to be picked
pub type Predicate<'a> = &'a dyn Fn(&X509Ref) -> bool;

/// Walk down from `anchor` through `pool`.  At each step the first pool
/// certificate issued by the current tail (and accepted by `predicate`) is
/// checked against the tail's key and appended; a signature that does not
/// verify aborts the walk.  The walk ends when no certificate is issued by
/// the tail, and takes at most `pool.len()` steps.
///
/// Returns `None` when nothing in the pool is issued by the anchor.
pub fn build_chain(
    anchor: &X509Ref,
    pool: &[X509],
    predicate: Option<Predicate>,
) -> Result<Option<TrustChain>, Error> {
    let mut certs: Vec<X509> = vec![anchor.to_owned()];

    for _ in 0..pool.len() {
        let Some(tail) = certs.last() else { break };

        let next = pool.iter().find(|c| {
            let c: &X509Ref = c;
            issued_by(c, tail)
                && !certs.iter().any(|p| same_cert(p, c))
                && predicate.map_or(true, |p| p(c))
        });

        let Some(next) = next else { break };

        if !signed_by(next, tail)? {
            return Err(Error::ChainBuild(format!(
                "signature on \"{}\" does not verify under \"{}\"",
                describe(next),
                describe(tail)
            )));
        }

        debug!(
            issuer = %describe(tail),
            subject = %describe(next),
            "chain link verified"
        );

        certs.push(next.clone());
    }

    if certs.len() == 1 {
        return Ok(None);
    }

    Ok(Some(TrustChain::new(certs)))
}
