// Payload encryption: AES-256-CBC with a random IV.
// Envelope layout: iv (16 bytes) + ciphertext. The plaintext is prefixed with
// KEY_MARKER before encryption so a wrong key is detected on decrypt.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::Aes256;
use log::{debug, warn};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::config::MAX_KEY_LENGTH;
use crate::error::{Result, StegoError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const KEY_MARKER: &[u8] = b"ENCRYPTED#";
pub const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// One way of running AES-256-CBC. Both backends read and write the same
/// `iv + ciphertext` envelope; they differ in key padding and IV source.
pub trait SymmetricCipher {
    fn name(&self) -> &'static str;

    /// Stretches a 1..=32 byte key to the 32 bytes AES-256 needs.
    fn prepare_key(&self, key: &[u8]) -> [u8; MAX_KEY_LENGTH];

    fn generate_iv(&self) -> [u8; IV_LEN];

    /// Rejects an IV this backend could never have produced.
    fn check_iv(&self, _iv: &[u8]) -> Result<()> {
        Ok(())
    }

    fn encrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Default backend: the `cbc` mode crate, OS randomness for the IV, and a
/// NUL-padded key.
pub struct PlatformCbc;

impl SymmetricCipher for PlatformCbc {
    fn name(&self) -> &'static str {
        "aes-256-cbc"
    }

    fn prepare_key(&self, key: &[u8]) -> [u8; MAX_KEY_LENGTH] {
        pad_key(key, 0)
    }

    fn generate_iv(&self) -> [u8; IV_LEN] {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    fn encrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| StegoError::InvalidConfiguration(e.to_string()))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| StegoError::InvalidConfiguration(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| StegoError::AuthenticationFailure)
    }
}

/// Compatibility backend: CBC chaining and PKCS#7 padding done here over the
/// raw AES block, key padded with ASCII '0'.
///
/// The IV is 16 lowercase hex characters, i.e. only 64 bits of randomness.
/// That is weaker than [`PlatformCbc`] and kept only so images written in this
/// mode by older tools still decode.
pub struct FallbackCbc;

impl SymmetricCipher for FallbackCbc {
    fn name(&self) -> &'static str {
        "aes-256-cbc (fallback)"
    }

    fn prepare_key(&self, key: &[u8]) -> [u8; MAX_KEY_LENGTH] {
        pad_key(key, b'0')
    }

    fn generate_iv(&self) -> [u8; IV_LEN] {
        let mut rng = rand::thread_rng();
        let mut iv = [0u8; IV_LEN];
        for b in iv.iter_mut() {
            *b = HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())];
        }
        iv
    }

    fn check_iv(&self, iv: &[u8]) -> Result<()> {
        if iv.iter().all(|b| HEX_DIGITS.contains(b)) {
            Ok(())
        } else {
            Err(StegoError::AuthenticationFailure)
        }
    }

    fn encrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256::new_from_slice(key).map_err(|e| StegoError::InvalidConfiguration(e.to_string()))?;

        let pad = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
        let mut out = Vec::with_capacity(plaintext.len() + pad);
        out.extend_from_slice(plaintext);
        out.resize(plaintext.len() + pad, pad as u8);

        let mut prev = *iv;
        for chunk in out.chunks_exact_mut(BLOCK_LEN) {
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
            prev.copy_from_slice(chunk);
        }
        Ok(out)
    }

    fn decrypt_blocks(&self, key: &[u8; MAX_KEY_LENGTH], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(StegoError::AuthenticationFailure);
        }
        let cipher = Aes256::new_from_slice(key).map_err(|e| StegoError::InvalidConfiguration(e.to_string()))?;

        let mut out = ciphertext.to_vec();
        let mut prev = *iv;
        for chunk in out.chunks_exact_mut(BLOCK_LEN) {
            let mut saved = [0u8; BLOCK_LEN];
            saved.copy_from_slice(chunk);
            cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            prev = saved;
        }

        let pad = *out.last().ok_or(StegoError::AuthenticationFailure)? as usize;
        if pad == 0 || pad > BLOCK_LEN || out[out.len() - pad..].iter().any(|&b| b as usize != pad) {
            return Err(StegoError::AuthenticationFailure);
        }
        out.truncate(out.len() - pad);
        Ok(out)
    }
}

fn pad_key(key: &[u8], fill: u8) -> [u8; MAX_KEY_LENGTH] {
    let mut out = [fill; MAX_KEY_LENGTH];
    let n = key.len().min(MAX_KEY_LENGTH);
    out[..n].copy_from_slice(&key[..n]);
    out
}

pub fn backend(use_fallback: bool) -> &'static dyn SymmetricCipher {
    if use_fallback {
        &FallbackCbc
    } else {
        &PlatformCbc
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(StegoError::InvalidConfiguration(format!(
            "encryption key must be 1 to {} bytes, got {}",
            MAX_KEY_LENGTH,
            key.len()
        )));
    }
    Ok(())
}

/// Encrypt `plaintext` under `key`. Returns `iv + ciphertext`.
pub fn encrypt(plaintext: &[u8], key: &str, use_fallback: bool) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    check_key(key)?;
    let cipher = backend(use_fallback);
    if use_fallback {
        warn!("using fallback cipher; its IV carries only 64 bits of randomness");
    }

    let mut marked = Vec::with_capacity(KEY_MARKER.len() + plaintext.len());
    marked.extend_from_slice(KEY_MARKER);
    marked.extend_from_slice(plaintext);

    let key_bytes = cipher.prepare_key(key.as_bytes());
    let iv = cipher.generate_iv();
    let ciphertext = cipher.encrypt_blocks(&key_bytes, &iv, &marked)?;
    debug!("{}: {} plaintext bytes -> {} ciphertext bytes", cipher.name(), marked.len(), ciphertext.len());

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an `iv + ciphertext` envelope and strip the key marker.
pub fn decrypt(envelope: &[u8], key: &str, use_fallback: bool) -> Result<Vec<u8>> {
    if envelope.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    check_key(key)?;
    if envelope.len() <= IV_LEN {
        return Err(StegoError::AuthenticationFailure);
    }
    let cipher = backend(use_fallback);
    let (iv_bytes, ciphertext) = envelope.split_at(IV_LEN);
    cipher.check_iv(iv_bytes)?;
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);

    let key_bytes = cipher.prepare_key(key.as_bytes());
    let plaintext = cipher.decrypt_blocks(&key_bytes, &iv, ciphertext)?;
    let rest = plaintext
        .strip_prefix(KEY_MARKER)
        .ok_or(StegoError::AuthenticationFailure)?;
    if rest.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    Ok(rest.to_vec())
}
