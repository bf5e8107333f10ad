use rand::rngs::OsRng;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};

use crate::client::LottoClient;
use crate::config::URL_RSA_KEY;
use crate::error::{LottoError, Result};
use crate::types::RsaKeyResponse;

/// Public key parameters the portal rotates server-side. Fetched fresh for
/// every login attempt, never cached.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub modulus: BigUint,
    pub exponent: BigUint,
}

pub async fn fetch_key_material(client: &LottoClient) -> Result<KeyMaterial> {
    let response = client.get(URL_RSA_KEY).await?;
    let parsed: RsaKeyResponse = serde_json::from_str(&response.text)
        .map_err(|e| LottoError::CipherInit(format!("key response is not JSON: {e}")))?;
    let data = parsed
        .data
        .ok_or_else(|| LottoError::CipherInit("key response carries no data".to_string()))?;

    Ok(KeyMaterial {
        modulus: parse_hex("rsaModulus", &data.rsa_modulus)?,
        exponent: parse_hex("publicExponent", &data.public_exponent)?,
    })
}

/// PKCS#1 v1.5 encryption of one credential field, hex-encoded the way the
/// portal's login form scripts do it.
pub fn encrypt(key: &KeyMaterial, plaintext: &str) -> Result<String> {
    let public_key = RsaPublicKey::new(key.modulus.clone(), key.exponent.clone())
        .map_err(|e| LottoError::CipherInit(format!("bad key material: {e}")))?;
    let ciphertext = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| LottoError::CipherInit(format!("encryption failed: {e}")))?;
    Ok(hex::encode(ciphertext))
}

fn parse_hex(field: &str, value: &str) -> Result<BigUint> {
    BigUint::parse_bytes(value.trim().as_bytes(), 16)
        .ok_or_else(|| LottoError::CipherInit(format!("{field} is not a hex number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 512-bit test modulus; PKCS#1 v1.5 encryption only needs modular
    // arithmetic, not a real factorable key.
    const TEST_MODULUS: &str = "c5f1a3b2d4e6f8091a2b3c4d5e6f70819293a4b5c6d7e8f901234567\
89abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdb1";
    const TEST_EXPONENT: &str = "10001";

    fn test_key() -> KeyMaterial {
        KeyMaterial {
            modulus: parse_hex("rsaModulus", TEST_MODULUS).unwrap(),
            exponent: parse_hex("publicExponent", TEST_EXPONENT).unwrap(),
        }
    }

    #[test]
    fn ciphertext_is_hex_of_modulus_width() {
        let encrypted = encrypt(&test_key(), "user1234").unwrap();
        assert_eq!(encrypted.len(), 128);
        assert!(encrypted.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn padding_randomizes_each_call() {
        let key = test_key();
        assert_ne!(encrypt(&key, "pw").unwrap(), encrypt(&key, "pw").unwrap());
    }

    #[test]
    fn malformed_hex_is_a_cipher_init_error() {
        assert!(matches!(
            parse_hex("rsaModulus", "not hex at all"),
            Err(LottoError::CipherInit(_))
        ));
    }
}
