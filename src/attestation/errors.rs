// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Truncated input: {0}")]
    Truncated(String),
    #[error("Offset out of bounds: {0}")]
    Offset(String),
    #[error("Corrupted compression: {0}")]
    Compression(String),
    #[error("Malformed attribute: {0}")]
    Attribute(String),
    #[error("Duplicated attribute: {0}")]
    DuplicatedAttribute(String),
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Truncated(e)
            | Error::Offset(e)
            | Error::Compression(e)
            | Error::Attribute(e)
            | Error::DuplicatedAttribute(e)
            | Error::MissingAttribute(e)
            | Error::UnsupportedKeyType(e)
            | Error::Crypto(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
