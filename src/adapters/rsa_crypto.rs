//! RSA-4096 implementation of [`crate::traits::AsymmetricCrypto`] and
//! [`crate::traits::KeypairGenerator`], grounded in the teacher's
//! `SecureRsaPrivateKey` (`rsa` + `pkcs8` + `zeroize`).
//!
//! Two distinct primitive pairs live here because the system this core
//! generalizes overloads RSA both ways:
//!
//! - `public_encrypt`/`private_decrypt`: PKCS#1 v1.5 type-2 padding,
//!   ordinary confidentiality. Used to wrap/unwrap DB-resident private
//!   keys under a master public key.
//! - `private_encrypt`/`public_decrypt`: PKCS#1 v1.5 type-1 padding, the
//!   raw "sign with the private key" primitive applied directly to
//!   caller data rather than a digest. This is the quirk `encrypt`/
//!   `sign`/`verify` rely on; it is not a confidentiality guarantee.

use crate::error::{CoreError, ErrorKind, Result};
use crate::traits::{AsymmetricCrypto, KeypairGenerator};
use num_bigint_dig::BigUint;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Short identifier for a public key, for logging and diagnostics —
/// never a substitute for comparing the DER bytes themselves.
pub fn fingerprint(public_key_der: &[u8]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(public_key_der);
    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..16]))
}

const KEY_BITS: usize = 4096;

fn crypto_failure(component: &str, message: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::CryptoFailure, message, component, "-")
}

pub struct RsaCrypto;

impl RsaCrypto {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RsaCrypto {
    fn default() -> Self {
        Self::new()
    }
}

impl AsymmetricCrypto for RsaCrypto {
    fn public_encrypt(&self, public_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let public_key = RsaPublicKey::from_public_key_der(public_key_der)
            .map_err(|e| crypto_failure("rsa_crypto", format!("invalid SPKI public key: {e}")))?;
        let mut rng = OsRng;
        public_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, data)
            .map_err(|e| crypto_failure("rsa_crypto", format!("public_encrypt failed: {e}")))
    }

    fn private_decrypt(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let private_key = RsaPrivateKey::from_pkcs8_der(private_key_der)
            .map_err(|e| crypto_failure("rsa_crypto", format!("invalid PKCS#8 private key: {e}")))?;
        private_key
            .decrypt(Pkcs1v15Encrypt, data)
            .map_err(|e| crypto_failure("rsa_crypto", format!("private_decrypt failed: {e}")))
    }

    fn private_encrypt(&self, private_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let private_key = RsaPrivateKey::from_pkcs8_der(private_key_der)
            .map_err(|e| crypto_failure("rsa_crypto", format!("invalid PKCS#8 private key: {e}")))?;
        let key_size = private_key.size();
        let padded = pkcs1_v15_pad_type1(data, key_size)?;

        let m = BigUint::from_bytes_be(&padded);
        let c = m.modpow(private_key.d(), private_key.n());
        Ok(left_pad(&c.to_bytes_be(), key_size))
    }

    fn public_decrypt(&self, public_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let public_key = RsaPublicKey::from_public_key_der(public_key_der)
            .map_err(|e| crypto_failure("rsa_crypto", format!("invalid SPKI public key: {e}")))?;
        let key_size = public_key.size();
        if data.len() != key_size {
            return Err(crypto_failure(
                "rsa_crypto",
                format!("public_decrypt input length {} does not match key size {key_size}", data.len()),
            ));
        }

        let c = BigUint::from_bytes_be(data);
        let m = c.modpow(public_key.e(), public_key.n());
        let padded = left_pad(&m.to_bytes_be(), key_size);
        pkcs1_v15_unpad_type1(&padded)
    }
}

impl KeypairGenerator for RsaCrypto {
    fn generate_rsa(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| crypto_failure("rsa_crypto", format!("key generation failed: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_der = Zeroizing::new(
            private_key
                .to_pkcs8_der()
                .map_err(|e| crypto_failure("rsa_crypto", format!("pkcs8 encoding failed: {e}")))?,
        );
        let public_der = public_key
            .to_public_key_der()
            .map_err(|e| crypto_failure("rsa_crypto", format!("spki encoding failed: {e}")))?;

        Ok((public_der.as_bytes().to_vec(), private_der.as_bytes().to_vec()))
    }
}

/// PKCS#1 v1.5 type-1 padding (`0x00 0x01 FF..FF 0x00 data`), the scheme
/// used to pad data before a raw private-key exponentiation.
fn pkcs1_v15_pad_type1(data: &[u8], key_size: usize) -> Result<Vec<u8>> {
    if data.len() + 11 > key_size {
        return Err(crypto_failure(
            "rsa_crypto",
            format!("data of {} bytes too large for a {key_size}-byte key", data.len()),
        ));
    }
    let mut padded = Vec::with_capacity(key_size);
    padded.push(0x00);
    padded.push(0x01);
    padded.resize(key_size - data.len() - 1, 0xFF);
    padded.push(0x00);
    padded.extend_from_slice(data);
    Ok(padded)
}

fn pkcs1_v15_unpad_type1(padded: &[u8]) -> Result<Vec<u8>> {
    if padded.len() < 11 || padded[0] != 0x00 || padded[1] != 0x01 {
        return Err(crypto_failure("rsa_crypto", "malformed type-1 padding"));
    }
    let rest = &padded[2..];
    let separator = rest
        .iter()
        .position(|&b| b != 0xFF)
        .ok_or_else(|| crypto_failure("rsa_crypto", "malformed type-1 padding: no separator"))?;
    if rest[separator] != 0x00 {
        return Err(crypto_failure("rsa_crypto", "malformed type-1 padding: missing separator byte"));
    }
    Ok(rest[separator + 1..].to_vec())
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_encrypt_round_trips_through_public_decrypt() {
        let crypto = RsaCrypto::new();
        let (public_der, private_der) = crypto.generate_rsa().unwrap();

        let data = b"scope-bound signature payload";
        let signed = crypto.private_encrypt(&private_der, data).unwrap();
        let recovered = crypto.public_decrypt(&public_der, &signed).unwrap();

        assert_eq!(recovered, data);
    }

    #[test]
    fn public_encrypt_round_trips_through_private_decrypt() {
        let crypto = RsaCrypto::new();
        let (public_der, private_der) = crypto.generate_rsa().unwrap();

        let data = b"wrapped private key bytes";
        let wrapped = crypto.public_encrypt(&public_der, data).unwrap();
        let unwrapped = crypto.private_decrypt(&private_der, &wrapped).unwrap();

        assert_eq!(unwrapped, data);
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_keys() {
        let crypto = RsaCrypto::new();
        let (public_der_a, _) = crypto.generate_rsa().unwrap();
        let (public_der_b, _) = crypto.generate_rsa().unwrap();

        assert_eq!(fingerprint(&public_der_a).unwrap(), fingerprint(&public_der_a).unwrap());
        assert_ne!(fingerprint(&public_der_a).unwrap(), fingerprint(&public_der_b).unwrap());
    }
}
