// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::cert::{describe, is_self_issued, issued_by, same_cert, signed_by};
use super::chain::TrustChain;
use super::errors::Error;
use super::result::VerificationResult;
use crate::store::{Anchor, IAnchorStore};
use openssl::x509::{X509Ref, X509};
use tracing::{debug, warn};

/// Verifies smart-card (PIV) attestation certificates: the certificate must
/// chain up to one of the configured roots.
#[derive(Debug)]
pub struct PivValidator {
    roots: Vec<Anchor>,
}

impl PivValidator {
    pub fn new(store: &impl IAnchorStore) -> Result<Self, Error> {
        let roots = store.anchors();

        if roots.is_empty() {
            return Err(Error::Config("no trusted root configured".to_string()));
        }

        Ok(Self { roots })
    }

    /// Walk up from `attestation` through `pool` and the trusted roots.  On
    /// success the chain is reported root first and the signer is the
    /// attestation certificate itself.
    pub fn verify(&self, attestation: &X509Ref, pool: &[X509]) -> VerificationResult {
        let candidates: Vec<&X509> = pool
            .iter()
            .chain(self.roots.iter().map(|r| &r.cert))
            .collect();

        let mut path: Vec<X509> = vec![attestation.to_owned()];

        for _ in 0..candidates.len() {
            let Some(tail) = path.last() else { break };

            if is_self_issued(tail) {
                break;
            }

            let issuer = candidates
                .iter()
                .copied()
                .find(|c| issued_by(tail, c) && !path.iter().any(|p| same_cert(p, c)));

            let Some(issuer) = issuer else { break };

            match signed_by(tail, issuer) {
                Ok(true) => {}
                Ok(false) => {
                    let error = Error::ChainBuild(format!(
                        "signature on \"{}\" does not verify under \"{}\"",
                        describe(tail),
                        describe(issuer)
                    ));
                    warn!(%error, "attestation verification failed");
                    return VerificationResult::failure(error);
                }
                Err(e) => return VerificationResult::failure(e),
            }

            debug!(subject = %describe(tail), issuer = %describe(issuer), "chain link verified");

            path.push(issuer.clone());
        }

        path.reverse();

        let trusted = path
            .first()
            .is_some_and(|top| self.roots.iter().any(|r| same_cert(&r.cert, top)));

        let chain = TrustChain::new(path);
        let signer = attestation.to_owned();

        if !trusted {
            let error = Error::UntrustedRoot(
                "the attestation chain does not end at a trusted root".to_string(),
            );
            warn!(%error, "attestation verification failed");
            return VerificationResult::Failure {
                error,
                signer: Some(signer),
                chain: Some(chain),
            };
        }

        VerificationResult::Success { chain, signer }
    }
}
