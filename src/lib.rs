pub mod codec;
pub mod config;
pub mod error;
pub mod stego;
pub mod stego_crypto;
pub mod stego_frame;

use serde::{Deserialize, Serialize};

pub use codec::{Codec, Conversion, ConversionSummary};
pub use config::{AspectRatio, Channel, CodecConfig, CodecConfigBuilder, Direction};
pub use error::{ErrorKind, Result, StegoError};

/// Machine-readable report of one conversion, for callers that print JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertOutcome {
    pub ok: bool,
    pub summary: Option<ConversionSummary>,
    pub error: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl ConvertOutcome {
    pub fn from_result(direction: Direction, result: &Result<Conversion>) -> Self {
        match result {
            Ok(conversion) => ConvertOutcome {
                ok: true,
                summary: Some(conversion.summary(direction)),
                error: None,
                kind: None,
            },
            Err(e) => ConvertOutcome {
                ok: false,
                summary: None,
                error: Some(e.to_string()),
                kind: Some(e.kind()),
            },
        }
    }
}

/// Build a config and run one conversion.
pub fn convert(config: CodecConfig, input: &[u8], carrier: Option<&[u8]>) -> Result<Conversion> {
    Codec::new(config).convert(input, carrier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reports_error_kind() {
        let config = CodecConfig::builder().encryption_key("k").build().unwrap();
        let result = convert(config, b"", None);
        let outcome = ConvertOutcome::from_result(Direction::Encode, &result);
        assert!(!outcome.ok);
        assert_eq!(outcome.kind, Some(ErrorKind::EmptyPayload));
        assert!(outcome.summary.is_none());
    }
}
