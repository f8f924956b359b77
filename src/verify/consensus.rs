// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::cert::{describe, key_id, verify_signature};
use super::chain::{build_chain, TrustChain};
use super::errors::Error;
use super::result::VerificationResult;
use crate::attestation::Envelope;
use crate::store::{Anchor, IAnchorStore};
use openssl::x509::X509;
use tracing::{debug, warn};

/// Verifies attestations against two or more independently operated roots.
/// Every root must lead to a leaf certificate, all the leaves must carry the
/// same public key, and that key must have signed the attestation.
#[derive(Debug)]
pub struct ConsensusValidator {
    anchors: Vec<Anchor>,
}

impl ConsensusValidator {
    pub fn new(store: &impl IAnchorStore) -> Result<Self, Error> {
        let anchors = store.anchors();

        if anchors.len() < 2 {
            return Err(Error::Config(format!(
                "at least two trust anchors are needed, got {}",
                anchors.len()
            )));
        }

        Ok(Self { anchors })
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Verify `envelope` using `pool` as the source of intermediate and leaf
    /// certificates.  The chain reported on success is the one rooted at the
    /// first anchor.
    pub fn verify(&self, envelope: &Envelope, pool: &[X509]) -> VerificationResult {
        let res = self.verify_inner(envelope, pool);

        if let VerificationResult::Failure { error, .. } = &res {
            warn!(%error, "attestation verification failed");
        }

        res
    }

    fn verify_inner(&self, envelope: &Envelope, pool: &[X509]) -> VerificationResult {
        let mut chains: Vec<TrustChain> = Vec::with_capacity(self.anchors.len());

        for a in self.anchors.iter() {
            match build_chain(&a.cert, pool, None) {
                Ok(Some(c)) => {
                    debug!(anchor = %a.label, len = c.len(), "chain built");
                    chains.push(c);
                }
                Ok(None) => {
                    return VerificationResult::failure(Error::ChainBuild(format!(
                        "no certificate chain from anchor {}",
                        a.label
                    )))
                }
                Err(e) => return VerificationResult::failure(e),
            }
        }

        let mut ids = Vec::with_capacity(chains.len());
        for c in chains.iter() {
            let Some(leaf) = c.leaf() else {
                return VerificationResult::failure(Error::ChainBuild("empty chain".to_string()));
            };
            match key_id(leaf) {
                Ok(id) => ids.push(id),
                Err(e) => return VerificationResult::failure(e),
            }
        }

        if ids.windows(2).any(|w| w[0] != w[1]) {
            return VerificationResult::failure(Error::Consensus(
                "public key mismatch between independently-rooted chains".to_string(),
            ));
        }

        let Some(chain) = chains.into_iter().next() else {
            return VerificationResult::failure(Error::ChainBuild("no chains".to_string()));
        };
        let Some(signer) = chain.leaf().map(|l| l.to_owned()) else {
            return VerificationResult::failure(Error::ChainBuild("empty chain".to_string()));
        };

        match verify_signature(&signer, &envelope.signed_data, &envelope.signature) {
            Ok(true) => {
                debug!(signer = %describe(&signer), "attestation signature verified");
                VerificationResult::Success { chain, signer }
            }
            Ok(false) => VerificationResult::Failure {
                error: Error::Signature(format!(
                    "attestation signature does not verify under \"{}\"",
                    describe(&signer)
                )),
                signer: Some(signer),
                chain: Some(chain),
            },
            Err(error) => VerificationResult::Failure {
                error,
                signer: Some(signer),
                chain: Some(chain),
            },
        }
    }
}
