// src/crypto.rs
//! secp256k1 primitives shared by the key stores and both signer kinds.
//!
//! Signatures follow the Ethereum personal-message convention: the payload is
//! hashed with the `\x19Ethereum Signed Message:\n<len>` prefix and the result
//! is laid out as `r || s || v` with `v = 27 + recovery id`. Local and remote
//! signers therefore produce interchangeable signatures.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

use crate::error::KeyStoreError;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of an account address.
pub const ADDRESS_LENGTH: usize = 20;

/// Ethereum-style account address (last 20 bytes of the keccak256 of the public key).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed form, as expected on JSON-RPC boundaries.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Lowercase hex without prefix. Packaging scripts parse this exact shape.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_prefixed_hex())
    }
}

impl FromStr for Address {
    type Err = KeyStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(KeyStoreError::Crypto(format!(
                "invalid address '{}': expected {} hex characters",
                s,
                ADDRESS_LENGTH * 2
            )));
        }

        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| KeyStoreError::Crypto(format!("invalid address '{}': {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash `data` the way `personal_sign` / clef `text/plain` signing does.
pub fn hash_with_ethereum_prefix(data: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", data.len());
    let mut hasher = Keccak::v256();
    hasher.update(prefix.as_bytes());
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// 33-byte compressed SEC1 encoding of a public key.
pub fn encode_public_key(public_key: &VerifyingKey) -> Vec<u8> {
    public_key.to_encoded_point(true).as_bytes().to_vec()
}

/// Derive the account address of a public key.
pub fn address_of(public_key: &VerifyingKey) -> Address {
    let uncompressed = public_key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    let mut bytes = [0u8; ADDRESS_LENGTH];
    bytes.copy_from_slice(&hash[32 - ADDRESS_LENGTH..]);
    Address(bytes)
}

/// Sign `data` with the Ethereum message prefix, returning `r || s || v`.
pub fn sign(key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
    let hash = hash_with_ethereum_prefix(data);
    let (signature, recovery_id): (Signature, RecoveryId) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| KeyStoreError::Crypto(format!("signing failed: {}", e)))?;

    let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
    out.extend_from_slice(&signature.to_bytes());
    out.push(27 + recovery_id.to_byte());
    Ok(out)
}

/// Recover the public key that produced `signature` over `data`.
pub fn recover(signature: &[u8], data: &[u8]) -> Result<VerifyingKey, KeyStoreError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(KeyStoreError::Crypto(format!(
            "invalid signature length: expected {}, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }

    let v = match signature[64] {
        v @ (27 | 28) => v - 27,
        v @ (0 | 1) => v,
        other => {
            return Err(KeyStoreError::Crypto(format!(
                "invalid signature recovery byte {}",
                other
            )))
        }
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| KeyStoreError::Crypto("invalid recovery id".into()))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| KeyStoreError::Crypto(format!("malformed signature: {}", e)))?;

    let hash = hash_with_ethereum_prefix(data);
    VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| KeyStoreError::Crypto(format!("public key recovery failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one() -> SigningKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        SigningKey::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_address_of_known_key() {
        // private key 0x..01 is a well known vector
        let address = address_of(key_one().verifying_key());
        assert_eq!(address.to_string(), "7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = key_one();
        let sig = sign(&key, b"hello ant").unwrap();
        assert_eq!(sig.len(), SIGNATURE_LENGTH);
        assert!(sig[64] == 27 || sig[64] == 28);

        let recovered = recover(&sig, b"hello ant").unwrap();
        assert_eq!(&recovered, key.verifying_key());

        let other = recover(&sig, b"something else").unwrap();
        assert_ne!(&other, key.verifying_key());
    }

    #[test]
    fn test_recover_rejects_bad_length() {
        assert!(recover(&[0u8; 64], b"data").is_err());
    }

    #[test]
    fn test_compressed_public_key_encoding() {
        let encoded = encode_public_key(key_one().verifying_key());
        assert_eq!(encoded.len(), 33);
        assert_eq!(
            hex::encode(encoded),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_address_parsing() {
        let a: Address = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap();
        let b: Address = "7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_prefixed_hex(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");

        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz5f4552091a69125d5dfcb7b8c2659029395bdf".parse::<Address>().is_err());
    }
}
