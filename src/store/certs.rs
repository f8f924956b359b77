// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use openssl::x509::X509;

/// Parse a certificate pool: either a bundle of PEM certificates or a single
/// DER certificate.  Bundle order is preserved.
pub fn parse_certificates(buf: &[u8]) -> Result<Vec<X509>, Error> {
    let certs = if is_pem(buf) {
        X509::stack_from_pem(buf).map_err(|e| Error::Certificate(e.to_string()))?
    } else {
        vec![X509::from_der(buf).map_err(|e| Error::Certificate(e.to_string()))?]
    };

    if certs.is_empty() {
        return Err(Error::Certificate("no certificates found".to_string()));
    }

    Ok(certs)
}

fn is_pem(buf: &[u8]) -> bool {
    buf.windows(11).any(|w| w == b"-----BEGIN ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CHAIN_PEM: &[u8] = include_bytes!("../../testdata/cert-chain.pem");
    const TEST_ROOT_PEM: &[u8] = include_bytes!("../../testdata/owner-root.pem");

    #[test]
    fn parse_pem_bundle() {
        let certs = parse_certificates(TEST_CHAIN_PEM).unwrap();
        assert_eq!(certs.len(), 4);
    }

    #[test]
    fn parse_single_der() {
        let der = X509::from_pem(TEST_ROOT_PEM).unwrap().to_der().unwrap();

        let certs = parse_certificates(&der).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].to_der().unwrap(), der);
    }

    #[test]
    fn parse_garbage() {
        assert!(matches!(
            parse_certificates(b"\x30\x03\x02\x01\x00").unwrap_err(),
            Error::Certificate(_)
        ));
        assert!(parse_certificates(b"").is_err());
    }
}
