// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Chain building failed: {0}")]
    ChainBuild(String),
    #[error("Consensus failed: {0}")]
    Consensus(String),
    #[error("Signature verification failed: {0}")]
    Signature(String),
    #[error("Untrusted root: {0}")]
    UntrustedRoot(String),
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e)
            | Error::ChainBuild(e)
            | Error::Consensus(e)
            | Error::Signature(e)
            | Error::UntrustedRoot(e)
            | Error::Crypto(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
