// Copyright (c) 2024 The Fury Developers

#![deny(unsafe_code)]

//! Secp256k1 key support for Terra accounts.
//!
//! This crate provides Terra-compatible key derivation and signing using
//! the secp256k1 elliptic curve, following BIP-32/BIP-39/BIP-44 standards.
//!
//! # Examples
//!
//! ```
//! use fury_crypto_secp256k1::Secp256k1Keypair;
//!
//! // Derive from a BIP-39 mnemonic
//! let mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
//! let keypair = Secp256k1Keypair::from_mnemonic(mnemonic, "", 0).unwrap();
//!
//! // Get the bech32 account address
//! let address = keypair.account_address("terra").unwrap();
//! assert!(address.starts_with("terra1"));
//!
//! // Sign the sha256 digest of some bytes
//! let signature = keypair.sign_sha256(b"sign doc").unwrap();
//! assert_eq!(signature.len(), 64); // r (32) + s (32)
//! ```

use bech32::{FromBase32, ToBase32, Variant};
use bip39::{Language, Mnemonic, MnemonicType, Seed};
use hmac::{Hmac, Mac};
use k256::{
    ecdsa::{
        signature::hazmat::{PrehashSigner, PrehashVerifier},
        Signature, SigningKey, VerifyingKey,
    },
    elliptic_curve::bigint::{Encoding, Limb},
    SecretKey, U256,
};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha512 = Hmac<Sha512>;

/// Errors that can occur during key operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid mnemonic phrase")]
    InvalidMnemonic,

    #[error("Key derivation failed: {0}")]
    DerivationError(String),

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("Invalid signature")]
    InvalidSignature,
}

/// BIP-44 path components for Terra
const BIP44_PURPOSE: u32 = 44;
const TERRA_COIN_TYPE: u32 = 330;

/// Hardened key offset
const HARDENED: u32 = 0x80000000;

/// Length of an account address payload (ripemd160 output).
pub const ADDRESS_LENGTH: usize = 20;

/// A secp256k1 keypair for Terra account operations.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Secp256k1Keypair {
    #[zeroize(skip)] // SigningKey implements its own zeroization
    signing_key: SigningKey,
}

impl core::fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Secp256k1Keypair {{ public_key: {:02x?} }}",
            self.public_key_compressed()
        )
    }
}

impl Secp256k1Keypair {
    /// Generate a fresh 24-word mnemonic and the keypair at index 0.
    ///
    /// The phrase is returned so callers can log or persist it.
    pub fn generate() -> Result<(String, Self), Error> {
        let mnemonic = Mnemonic::new(MnemonicType::Words24, Language::English);
        let seed = Seed::new(&mnemonic, "");
        let keypair = Self::from_seed(seed.as_bytes(), 0)?;
        Ok((mnemonic.phrase().to_string(), keypair))
    }

    /// Create a keypair from a BIP-39 mnemonic phrase.
    ///
    /// Uses the Terra derivation path: m/44'/330'/0'/0/{index}
    pub fn from_mnemonic(mnemonic: &str, password: &str, index: u32) -> Result<Self, Error> {
        let mnemonic =
            Mnemonic::from_phrase(mnemonic, Language::English).map_err(|_| Error::InvalidMnemonic)?;

        let seed = Seed::new(&mnemonic, password);
        Self::from_seed(seed.as_bytes(), index)
    }

    /// Create a keypair from a 64-byte BIP-39 seed.
    pub fn from_seed(seed: &[u8], index: u32) -> Result<Self, Error> {
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| Error::DerivationError(e.to_string()))?;
        mac.update(seed);
        let result = mac.finalize().into_bytes();

        let mut key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        key.copy_from_slice(&result[..32]);
        chain_code.copy_from_slice(&result[32..]);

        let path = [
            BIP44_PURPOSE | HARDENED,   // 44'
            TERRA_COIN_TYPE | HARDENED, // 330'
            HARDENED,                   // 0'
            0,                          // 0 (not hardened)
            index,                      // index (not hardened)
        ];

        for &child_index in &path {
            let (new_key, new_chain) =
                derive_child(&key, &chain_code, child_index).map_err(Error::DerivationError)?;
            key = new_key;
            chain_code = new_chain;
        }

        let secret_key =
            SecretKey::from_bytes((&key).into()).map_err(|_| Error::InvalidPrivateKey)?;

        key.zeroize();
        chain_code.zeroize();

        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }

    /// Create a keypair from raw 32-byte private key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        let secret_key =
            SecretKey::from_bytes(bytes.into()).map_err(|_| Error::InvalidPrivateKey)?;

        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }

    /// Get the public key as compressed bytes (33 bytes: 0x02/0x03 || x).
    pub fn public_key_compressed(&self) -> [u8; 33] {
        let verifying_key = self.signing_key.verifying_key();
        let point = verifying_key.to_encoded_point(true);
        let mut result = [0u8; 33];
        result.copy_from_slice(point.as_bytes());
        result
    }

    /// Get the raw 20-byte account address: ripemd160(sha256(compressed_pk)).
    pub fn address_bytes(&self) -> [u8; ADDRESS_LENGTH] {
        let sha = Sha256::digest(self.public_key_compressed());
        Ripemd160::digest(sha).into()
    }

    /// Get the bech32 account address under the given human readable part.
    pub fn account_address(&self, hrp: &str) -> Result<String, Error> {
        bech32::encode(hrp, self.address_bytes().to_base32(), Variant::Bech32)
            .map_err(|e| Error::InvalidAddress(e.to_string()))
    }

    /// Sign sha256(message).
    ///
    /// Returns a 64-byte signature: r (32) || s (32), with s in low form.
    pub fn sign_sha256(&self, message: &[u8]) -> Result<[u8; 64], Error> {
        let digest: [u8; 32] = Sha256::digest(message).into();
        self.sign_hash(&digest)
    }

    /// Sign a raw 32-byte hash.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<[u8; 64], Error> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(hash)
            .map_err(|e| Error::SigningError(e.to_string()))?;

        let mut result = [0u8; 64];
        result.copy_from_slice(&signature.to_bytes());
        Ok(result)
    }
}

/// Verify a 64-byte signature over sha256(message) against a SEC1 public key.
pub fn verify_sha256(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), Error> {
    let verifying_key =
        VerifyingKey::from_sec1_bytes(public_key).map_err(|_| Error::InvalidSignature)?;
    let signature = Signature::from_slice(signature).map_err(|_| Error::InvalidSignature)?;
    let digest = Sha256::digest(message);

    verifying_key
        .verify_prehash(&digest, &signature)
        .map_err(|_| Error::InvalidSignature)
}

/// Decode a bech32 account address into its human readable part and payload.
pub fn decode_address(address: &str) -> Result<(String, [u8; ADDRESS_LENGTH]), Error> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| Error::InvalidAddress(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(Error::InvalidAddress("expected bech32 variant".to_string()));
    }

    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| Error::InvalidAddress(e.to_string()))?;
    let payload: [u8; ADDRESS_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidAddress(format!("expected 20 bytes, got {}", bytes.len())))?;

    Ok((hrp, payload))
}

/// Derive a child key from a parent key and chain code.
fn derive_child(
    parent_key: &[u8; 32],
    parent_chain: &[u8; 32],
    index: u32,
) -> Result<([u8; 32], [u8; 32]), String> {
    let mut mac = HmacSha512::new_from_slice(parent_chain).map_err(|e| e.to_string())?;

    if index >= HARDENED {
        // Hardened derivation: use 0x00 || parent_key || index
        mac.update(&[0x00]);
        mac.update(parent_key);
    } else {
        // Normal derivation: use compressed public key || index
        let secret = SecretKey::from_bytes(parent_key.into())
            .map_err(|_| "Invalid parent key".to_string())?;
        let signing = SigningKey::from(secret);
        let pubkey = signing.verifying_key().to_encoded_point(true);
        mac.update(pubkey.as_bytes());
    }

    mac.update(&index.to_be_bytes());
    let result = mac.finalize().into_bytes();

    let mut derived_key = [0u8; 32];
    derived_key.copy_from_slice(&result[..32]);

    let parent_u256 = U256::from_be_slice(parent_key);
    let derived_u256 = U256::from_be_slice(&derived_key);

    // secp256k1 curve order
    let n = U256::from_be_hex("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");

    // Add and reduce mod n
    let (sum, overflow) = parent_u256.adc(&derived_u256, Limb::ZERO);
    let new_key_u256 = if overflow.0 != 0 || sum >= n {
        sum.wrapping_sub(&n)
    } else {
        sum
    };

    let new_key: [u8; 32] = new_key_u256.to_be_bytes();

    let mut new_chain = [0u8; 32];
    new_chain.copy_from_slice(&result[32..]);

    Ok((new_key, new_chain))
}
