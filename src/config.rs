//! Conversion settings.
//!
//! A [`CodecConfig`] is built once through [`CodecConfigBuilder`], validated
//! eagerly, and then never changes. The facade can reuse one config for any
//! number of conversions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StegoError};

/// Longest accepted encryption key, in bytes.
pub const MAX_KEY_LENGTH: usize = 32;

/// Largest side accepted in a custom `W:H` aspect ratio.
pub const MAX_RATIO_SIDE: u32 = 65_535;

/// Level passed to the compressor when the caller keeps the default.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Payload in, image out.
    Encode,
    /// Image in, payload out.
    Decode,
}

/// Width:height shape of the generated canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Follow the carrier image, or [`AspectRatio::Square`] when there is none.
    Auto,
    Square,
    SmallScreen,
    WideScreen,
    Custom { width: u32, height: u32 },
}

impl AspectRatio {
    /// The `(width, height)` ratio, `None` for [`AspectRatio::Auto`].
    pub fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::Auto => None,
            Self::Square => Some((1, 1)),
            Self::SmallScreen => Some((4, 3)),
            Self::WideScreen => Some((16, 9)),
            Self::Custom { width, height } => Some((width, height)),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "SQUARE" => Ok(Self::Square),
            "SMALLSCREEN" => Ok(Self::SmallScreen),
            "WIDESCREEN" => Ok(Self::WideScreen),
            other => {
                // "W:H" custom ratio
                if let Some((w, h)) = other.split_once(':') {
                    if let (Ok(width), Ok(height)) = (w.trim().parse(), h.trim().parse()) {
                        return Ok(Self::Custom { width, height });
                    }
                }
                Err(StegoError::InvalidConfiguration(format!(
                    "unknown aspect ratio '{}'",
                    s.trim()
                )))
            }
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "AUTO"),
            Self::Square => write!(f, "SQUARE"),
            Self::SmallScreen => write!(f, "SMALLSCREEN"),
            Self::WideScreen => write!(f, "WIDESCREEN"),
            Self::Custom { width, height } => write!(f, "{}:{}", width, height),
        }
    }
}

/// Pixel component that carries the data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    /// Index of this component in an RGBA pixel.
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
        }
    }
}

impl FromStr for Channel {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Self::Red),
            "GREEN" => Ok(Self::Green),
            "BLUE" => Ok(Self::Blue),
            "ALPHA" => Ok(Self::Alpha),
            _ => Err(StegoError::InvalidConfiguration(format!(
                "unknown color channel '{}'",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Blue => "BLUE",
            Self::Alpha => "ALPHA",
        };
        f.write_str(name)
    }
}

/// Validated, immutable settings for one or more conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    direction: Direction,
    aspect_ratio: AspectRatio,
    channel: Channel,
    encryption_key: String,
    compression_level: i32,
    original_filename: Option<String>,
    validate_checksum: bool,
    use_fallback_cipher: bool,
}

impl CodecConfig {
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn encryption_key(&self) -> &str {
        &self.encryption_key
    }

    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }

    pub fn validate_checksum(&self) -> bool {
        self.validate_checksum
    }

    pub fn use_fallback_cipher(&self) -> bool {
        self.use_fallback_cipher
    }
}

/// Collects settings and validates them in [`CodecConfigBuilder::build`].
///
/// String setters record parse failures and report the first one at build
/// time, so a chain of setters never panics.
#[derive(Debug)]
pub struct CodecConfigBuilder {
    direction: Direction,
    aspect_ratio: AspectRatio,
    channel: Channel,
    encryption_key: String,
    compression_level: i32,
    original_filename: Option<String>,
    validate_checksum: bool,
    use_fallback_cipher: bool,
    pending_error: Option<StegoError>,
}

impl Default for CodecConfigBuilder {
    fn default() -> Self {
        Self {
            direction: Direction::Encode,
            aspect_ratio: AspectRatio::Auto,
            channel: Channel::Red,
            encryption_key: String::new(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            original_filename: None,
            validate_checksum: true,
            use_fallback_cipher: false,
            pending_error: None,
        }
    }
}

impl CodecConfigBuilder {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Parses `AUTO`, `SQUARE`, `SMALLSCREEN`, `WIDESCREEN` or `W:H`.
    pub fn aspect_ratio_str(mut self, value: &str) -> Self {
        match value.parse() {
            Ok(aspect_ratio) => self.aspect_ratio = aspect_ratio,
            Err(e) => self.record(e),
        }
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Parses `RED`, `GREEN`, `BLUE` or `ALPHA`.
    pub fn channel_str(mut self, value: &str) -> Self {
        match value.parse() {
            Ok(channel) => self.channel = channel,
            Err(e) => self.record(e),
        }
        self
    }

    /// Surrounding whitespace is not part of the key.
    pub fn encryption_key(mut self, key: &str) -> Self {
        self.encryption_key = key.trim().to_string();
        self
    }

    /// `-1` for the compressor default, otherwise `1..=9`; `0` counts as `1`.
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Blank names are treated as no name.
    pub fn original_filename(mut self, name: Option<&str>) -> Self {
        self.original_filename = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self
    }

    pub fn validate_checksum(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    pub fn use_fallback_cipher(mut self, fallback: bool) -> Self {
        self.use_fallback_cipher = fallback;
        self
    }

    fn record(&mut self, err: StegoError) {
        if self.pending_error.is_none() {
            self.pending_error = Some(err);
        }
    }

    pub fn build(self) -> Result<CodecConfig> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        if self.encryption_key.len() > MAX_KEY_LENGTH {
            return Err(StegoError::InvalidConfiguration(format!(
                "encryption key is {} bytes, at most {} allowed",
                self.encryption_key.len(),
                MAX_KEY_LENGTH
            )));
        }
        if !(-1..=9).contains(&self.compression_level) {
            return Err(StegoError::InvalidConfiguration(format!(
                "compression level {} outside -1..=9",
                self.compression_level
            )));
        }
        if let AspectRatio::Custom { width, height } = self.aspect_ratio {
            if width == 0 || height == 0 {
                return Err(StegoError::InvalidConfiguration(format!(
                    "aspect ratio {}:{} has a zero side",
                    width, height
                )));
            }
            if width > MAX_RATIO_SIDE || height > MAX_RATIO_SIDE {
                return Err(StegoError::InvalidConfiguration(format!(
                    "aspect ratio {}:{} has a side above {}",
                    width, height, MAX_RATIO_SIDE
                )));
            }
        }
        let compression_level = if self.compression_level == 0 {
            1
        } else {
            self.compression_level
        };
        Ok(CodecConfig {
            direction: self.direction,
            aspect_ratio: self.aspect_ratio,
            channel: self.channel,
            encryption_key: self.encryption_key,
            compression_level,
            original_filename: self.original_filename,
            validate_checksum: self.validate_checksum,
            use_fallback_cipher: self.use_fallback_cipher,
        })
    }
}
