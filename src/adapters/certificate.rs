//! Certificate parsing and loading, grounded in `x509-parser` (pulled in
//! from outside the teacher crate — `skylock-core` never parses X.509
//! itself, but the root workspace's GUI crate links `x509-parser`-style
//! tooling for TLS cert inspection, and the spec's certificate-bound
//! mint path needs exactly this).

use crate::domain::CertificateChain;
use crate::error::{CoreError, ErrorKind, Result};
use crate::traits::CertificateSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use x509_parser::prelude::{FromDer, X509Certificate};

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| CoreError::new(ErrorKind::CertInvalid, format!("malformed certificate: {e}"), "certificate", "-"))?;
    Ok(cert)
}

fn to_chrono(ts: x509_parser::time::ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts.timestamp(), 0).ok_or_else(|| {
        CoreError::new(ErrorKind::CertInvalid, "certificate timestamp out of range", "certificate", "-")
    })
}

/// `notAfter` of the leaf certificate, used to seed `ExpiryPlanner` for
/// certificate-bound mints.
pub fn not_after(der: &[u8]) -> Result<DateTime<Utc>> {
    let cert = parse(der)?;
    to_chrono(cert.validity().not_after)
}

/// `(notBefore, notAfter)`, used by `CryptoFacade` to gate `sign`/`verify`
/// on the certificate's validity window.
pub fn validity(der: &[u8]) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let cert = parse(der)?;
    Ok((to_chrono(cert.validity().not_before)?, to_chrono(cert.validity().not_after)?))
}

/// The DER-encoded SubjectPublicKeyInfo carried by the certificate,
/// extracted so `HsmVault::store_certificate` can index by public key
/// the same way `store_keypair` does.
pub fn public_key_der(der: &[u8]) -> Result<Vec<u8>> {
    let cert = parse(der)?;
    Ok(cert.public_key().raw.to_vec())
}

/// Fixed, in-process table of `(application_id, reference_id) ->
/// certificate chain + private key`. Production deployments load these
/// from a secrets manager or a file on disk; this adapter exists for
/// tests and for demo configurations that pre-provision a handful of
/// certificates.
#[derive(Default)]
pub struct StaticCertificateSource {
    entries: RwLock<HashMap<(String, Option<String>), (CertificateChain, Vec<u8>)>>,
}

impl StaticCertificateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        application_id: impl Into<String>,
        reference_id: Option<impl Into<String>>,
        chain: CertificateChain,
        private_key_der: Vec<u8>,
    ) {
        let key = (application_id.into(), reference_id.map(Into::into));
        self.entries
            .write()
            .expect("certificate source lock poisoned")
            .insert(key, (chain, private_key_der));
    }
}

#[async_trait]
impl CertificateSource for StaticCertificateSource {
    async fn load(&self, application_id: &str, reference_id: Option<&str>) -> Result<(CertificateChain, Vec<u8>)> {
        let key = (application_id.to_string(), reference_id.map(ToString::to_string));
        self.entries
            .read()
            .expect("certificate source lock poisoned")
            .get(&key)
            .cloned()
            .ok_or_else(|| {
                CoreError::new(
                    ErrorKind::CertInvalid,
                    format!("no certificate registered for application {application_id}"),
                    "static_certificate_source",
                    application_id,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};

    fn self_signed_der() -> Vec<u8> {
        let key_pair = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec!["example.test".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        cert.der().to_vec()
    }

    #[test]
    fn parses_validity_window_from_a_self_signed_certificate() {
        let der = self_signed_der();
        let (not_before, not_after_ts) = validity(&der).unwrap();
        assert!(not_before < not_after_ts);
        assert_eq!(not_after(&der).unwrap(), not_after_ts);
    }

    #[test]
    fn extracts_a_non_empty_public_key() {
        let der = self_signed_der();
        assert!(!public_key_der(&der).unwrap().is_empty());
    }
}
