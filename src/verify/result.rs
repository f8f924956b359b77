// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::chain::TrustChain;
use super::errors::Error;
use openssl::x509::{X509Ref, X509};

/// Outcome of a single verification.  On failure, whatever had been
/// established before the failing step is kept for diagnostics.
#[derive(Debug)]
pub enum VerificationResult {
    Success {
        chain: TrustChain,
        signer: X509,
    },
    Failure {
        error: Error,
        signer: Option<X509>,
        chain: Option<TrustChain>,
    },
}

impl VerificationResult {
    pub(crate) fn failure(error: Error) -> Self {
        VerificationResult::Failure {
            error,
            signer: None,
            chain: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            VerificationResult::Success { .. } => None,
            VerificationResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn signer(&self) -> Option<&X509Ref> {
        match self {
            VerificationResult::Success { signer, .. } => Some(&**signer),
            VerificationResult::Failure { signer, .. } => signer.as_deref(),
        }
    }

    pub fn chain(&self) -> Option<&TrustChain> {
        match self {
            VerificationResult::Success { chain, .. } => Some(chain),
            VerificationResult::Failure { chain, .. } => chain.as_ref(),
        }
    }

    /// Turn the outcome into a plain `Result`, dropping diagnostics
    pub fn into_result(self) -> Result<(TrustChain, X509), Error> {
        match self {
            VerificationResult::Success { chain, signer } => Ok((chain, signer)),
            VerificationResult::Failure { error, .. } => Err(error),
        }
    }
}
