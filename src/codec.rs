//! Conversion facade.
//!
//! Encode: frame (compress, tag) -> encrypt -> base64 -> pixels -> PNG.
//! Decode runs the same stages backwards. Any failing stage aborts the whole
//! conversion and nothing is returned.

use base64::Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{CodecConfig, Direction};
use crate::error::{Result, StegoError};
use crate::{stego, stego_crypto, stego_frame};

/// Name suggested for an encoded image when the payload has no usable name.
pub const DEFAULT_IMAGE_NAME: &str = "output.png";
/// Name suggested for a decoded payload whose image carried no name.
pub const DEFAULT_PAYLOAD_NAME: &str = "output.dat";

/// Output bytes plus the name the caller should save them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl Conversion {
    pub fn summary(&self, direction: Direction) -> ConversionSummary {
        ConversionSummary {
            direction,
            file_name: self.file_name.clone(),
            size: self.bytes.len(),
        }
    }
}

/// Metadata about a finished conversion, without the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub direction: Direction,
    pub file_name: String,
    pub size: usize,
}

/// `<stem>.png` for an original file name, or [`DEFAULT_IMAGE_NAME`].
/// A dot-file such as `.bashrc` has an empty stem.
pub fn suggested_image_name(original_filename: Option<&str>) -> String {
    original_filename
        .map(std::path::Path::new)
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| !(n.starts_with('.') && !n[1..].contains('.')))
        })
        .and_then(|path| path.file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{}.png", stem))
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string())
}

#[derive(Debug, Clone)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Replace the settings used by later conversions.
    pub fn set_config(&mut self, config: CodecConfig) {
        self.config = config;
    }

    /// Run one conversion in the configured direction.
    ///
    /// `input` is the payload when encoding and the image when decoding.
    /// `carrier` is only used when encoding.
    pub fn convert(&self, input: &[u8], carrier: Option<&[u8]>) -> Result<Conversion> {
        if input.is_empty() {
            return Err(StegoError::EmptyPayload);
        }
        if self.config.encryption_key().is_empty() {
            return Err(StegoError::InvalidConfiguration("encryption key is not set".to_string()));
        }
        match self.config.direction() {
            Direction::Encode => self.encode(input, carrier),
            Direction::Decode => {
                if carrier.is_some() {
                    warn!("carrier image is ignored when decoding");
                }
                self.decode(input)
            }
        }
    }

    fn encode(&self, payload: &[u8], carrier: Option<&[u8]>) -> Result<Conversion> {
        let config = &self.config;
        let frame = stego_frame::wrap(payload, config.compression_level(), config.original_filename())?;
        let envelope = stego_crypto::encrypt(&frame, config.encryption_key(), config.use_fallback_cipher())?;
        let text = base64::engine::general_purpose::STANDARD.encode(&envelope);
        debug!("payload {} bytes -> frame {} -> envelope {} -> text {}", payload.len(), frame.len(), envelope.len(), text.len());

        let bytes = stego::embed(text.as_bytes(), config.channel(), config.aspect_ratio(), carrier)?;
        Ok(Conversion {
            bytes,
            file_name: suggested_image_name(config.original_filename()),
        })
    }

    fn decode(&self, image_bytes: &[u8]) -> Result<Conversion> {
        let config = &self.config;
        let text = stego::extract(image_bytes, config.channel())?;
        let envelope = base64::engine::general_purpose::STANDARD
            .decode(&text)
            .map_err(|e| StegoError::ImageDecodeFailure(format!("hidden text is not base64: {}", e)))?;
        if envelope.is_empty() {
            return Err(StegoError::EmptyPayload);
        }
        let frame = stego_crypto::decrypt(&envelope, config.encryption_key(), config.use_fallback_cipher())?;
        let unframed = stego_frame::unwrap(&frame, config.validate_checksum())?;
        debug!("recovered {} payload bytes", unframed.payload.len());

        Ok(Conversion {
            bytes: unframed.payload,
            file_name: unframed
                .original_filename
                .unwrap_or_else(|| DEFAULT_PAYLOAD_NAME.to_string()),
        })
    }
}
