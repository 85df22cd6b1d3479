//! StrKey encoding of ledger account IDs and secret seeds.
//!
//! A StrKey is `base32(version || payload || crc16_xmodem_le)` without padding.
//! Account IDs start with `G`, secret seeds with `S`.

use base32::Alphabet;
use crc::{Crc, CRC_16_XMODEM};
use ed25519_dalek::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use shared::{Error, Keypair, Result};
use zeroize::Zeroize;

const VERSION_ACCOUNT_ID: u8 = 6 << 3;
const VERSION_SECRET_SEED: u8 = 18 << 3;

const ALPHABET: Alphabet = Alphabet::RFC4648 { padding: false };
const CHECKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Length of an encoded account ID or seed
pub const STRKEY_LEN: usize = 56;

/// First character of every account ID
pub const ACCOUNT_ID_PREFIX: char = 'G';

/// Raw length: version byte, 32-byte key, 2-byte checksum
const DECODED_LEN: usize = 35;

fn encode(version: u8, payload: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(DECODED_LEN);
    data.push(version);
    data.extend_from_slice(payload);
    let crc = CHECKSUM.checksum(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    base32::encode(ALPHABET, &data)
}

fn decode(version: u8, encoded: &str) -> Result<[u8; 32]> {
    if encoded.len() != STRKEY_LEN {
        return Err(Error::InvalidAddress(format!(
            "expected {} characters, got {}",
            STRKEY_LEN,
            encoded.len()
        )));
    }

    let data = base32::decode(ALPHABET, encoded)
        .ok_or_else(|| Error::InvalidAddress("not valid base32".to_string()))?;

    if data.len() != DECODED_LEN {
        return Err(Error::InvalidAddress(format!(
            "decoded to {} bytes, expected {}",
            data.len(),
            DECODED_LEN
        )));
    }

    if data[0] != version {
        return Err(Error::InvalidAddress("unexpected version byte".to_string()));
    }

    let (body, checksum) = data.split_at(DECODED_LEN - 2);
    let expected = CHECKSUM.checksum(body).to_le_bytes();
    if checksum != expected {
        return Err(Error::InvalidAddress("checksum mismatch".to_string()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&body[1..]);
    Ok(key)
}

pub fn encode_account_id(public_key: &[u8; 32]) -> String {
    encode(VERSION_ACCOUNT_ID, public_key)
}

pub fn encode_secret_seed(seed: &[u8; 32]) -> String {
    encode(VERSION_SECRET_SEED, seed)
}

pub fn decode_account_id(account_id: &str) -> Result<[u8; 32]> {
    decode(VERSION_ACCOUNT_ID, account_id)
}

pub fn decode_secret_seed(seed: &str) -> Result<[u8; 32]> {
    decode(VERSION_SECRET_SEED, seed)
}

/// Full validation, including version byte and checksum
pub fn is_valid_account_id(account_id: &str) -> bool {
    decode_account_id(account_id).is_ok()
}

/// Shape-only check: length, prefix and base32 alphabet
pub fn looks_like_account_id(candidate: &str) -> bool {
    candidate.len() == STRKEY_LEN
        && candidate.starts_with(ACCOUNT_ID_PREFIX)
        && candidate.bytes().all(is_base32_char)
}

pub fn is_base32_char(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'2'..=b'7')
}

/// Derive the account ID that belongs to a secret seed
pub fn account_id_from_seed(secret_seed: &str) -> Result<String> {
    let mut seed = decode_secret_seed(secret_seed)?;
    let public = public_key_bytes(&seed);
    seed.zeroize();
    Ok(encode_account_id(&public?))
}

fn public_key_bytes(seed: &[u8; 32]) -> Result<[u8; 32]> {
    let secret = SecretKey::from_bytes(seed)
        .map_err(|e| Error::Internal(format!("Invalid ed25519 seed: {}", e)))?;
    Ok(PublicKey::from(&secret).to_bytes())
}

/// Generate a fresh keypair locally. The account is not created or funded
/// on the ledger.
pub fn generate_keypair() -> Result<Keypair> {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);

    let public = public_key_bytes(&seed);
    let secret_key = encode_secret_seed(&seed);
    seed.zeroize();

    Ok(Keypair::new(encode_account_id(&public?), secret_key))
}
