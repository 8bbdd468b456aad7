// Plaintext framing, applied before encryption:
//   [ORIGINAL_FILENAME:<base64 name>#]CHECKSUM_MD5:<md5 hex of body>#<zlib body>
// Tag values use the base64 and hex alphabets, so they never contain '#'.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};
use md5::{Digest, Md5};

use crate::error::{Result, StegoError};

pub const FILENAME_TAG: &[u8] = b"ORIGINAL_FILENAME:";
pub const CHECKSUM_TAG: &[u8] = b"CHECKSUM_MD5:";
pub const TAG_END: u8 = b'#';

/// Payload and filename recovered from a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unframed {
    pub payload: Vec<u8>,
    pub original_filename: Option<String>,
}

fn compression_for(level: i32) -> Compression {
    if level < 0 {
        Compression::default()
    } else {
        Compression::new(level as u32)
    }
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Compress `payload` and prepend the checksum and optional filename tags.
pub fn wrap(payload: &[u8], level: i32, original_filename: Option<&str>) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Err(StegoError::EmptyPayload);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), compression_for(level));
    encoder
        .write_all(payload)
        .map_err(|e| StegoError::CompressionFailure(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StegoError::CompressionFailure(e.to_string()))?;
    if compressed.is_empty() {
        return Err(StegoError::CompressionFailure("compressor produced no output".to_string()));
    }
    debug!("compressed {} bytes to {} (level {})", payload.len(), compressed.len(), level);

    let checksum = md5_hex(&compressed);
    let name_b64 = original_filename.map(|n| base64::engine::general_purpose::STANDARD.encode(n.as_bytes()));

    let mut out = Vec::with_capacity(
        compressed.len()
            + CHECKSUM_TAG.len()
            + checksum.len()
            + 1
            + name_b64.as_ref().map_or(0, |n| FILENAME_TAG.len() + n.len() + 1),
    );
    if let Some(name) = &name_b64 {
        out.extend_from_slice(FILENAME_TAG);
        out.extend_from_slice(name.as_bytes());
        out.push(TAG_END);
    }
    out.extend_from_slice(CHECKSUM_TAG);
    out.extend_from_slice(checksum.as_bytes());
    out.push(TAG_END);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Splits `TAG<value>#rest` into `(value, rest)`. The value must be non-empty
/// and ends at the first '#'.
fn take_tag<'a>(data: &'a [u8], tag: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    let after = data.strip_prefix(tag)?;
    let end = after.iter().position(|&b| b == TAG_END)?;
    if end == 0 {
        return None;
    }
    Some((&after[..end], &after[end + 1..]))
}

/// Strip the tags from a decrypted frame, check the checksum if asked to, and
/// decompress the body.
pub fn unwrap(frame: &[u8], validate_checksum: bool) -> Result<Unframed> {
    let mut rest = frame;
    let mut original_filename = None;

    if let Some((value, tail)) = take_tag(rest, FILENAME_TAG) {
        match base64::engine::general_purpose::STANDARD.decode(value) {
            Ok(name) => {
                let name = String::from_utf8_lossy(&name).trim().to_string();
                if !name.is_empty() {
                    original_filename = Some(name);
                }
            }
            Err(e) => warn!("ignoring unreadable original filename: {}", e),
        }
        rest = tail;
    }
    if rest.is_empty() {
        return Err(StegoError::EmptyPayload);
    }

    match take_tag(rest, CHECKSUM_TAG) {
        Some((value, tail)) => {
            if tail.is_empty() {
                return Err(StegoError::EmptyPayload);
            }
            if validate_checksum {
                let expected = String::from_utf8_lossy(value).trim().to_ascii_lowercase();
                let actual = md5_hex(tail);
                if expected != actual {
                    return Err(StegoError::ChecksumMismatch { expected, actual });
                }
            } else {
                warn!("checksum validation disabled; body is not verified");
            }
            rest = tail;
        }
        None if validate_checksum => {
            return Err(StegoError::ChecksumMismatch {
                expected: "<missing>".to_string(),
                actual: md5_hex(rest),
            })
        }
        None => warn!("frame has no checksum tag; body is not verified"),
    }

    let mut payload = Vec::new();
    ZlibDecoder::new(rest)
        .read_to_end(&mut payload)
        .map_err(|e| StegoError::DecompressionFailure(e.to_string()))?;
    debug!("decompressed {} bytes to {}", rest.len(), payload.len());

    Ok(Unframed {
        payload,
        original_filename,
    })
}
