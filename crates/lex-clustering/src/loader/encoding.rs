//! Text encodings tried, in order, when decoding an uploaded table.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// A supported text encoding for CSV exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    /// Encodings in the order they are attempted.
    pub const FALLBACK_ORDER: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "cp1252",
        }
    }

    /// Decode `bytes`, or `None` when they are not valid in this encoding.
    ///
    /// A UTF-8 byte-order mark is stripped. Latin-1 maps every byte to the
    /// code point of the same value and therefore never fails.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Self::Utf8 => {
                let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
                (!had_errors).then_some(text)
            }
            Self::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Self::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode with the standard fallback order.
pub fn decode_text(bytes: &[u8]) -> Result<(Cow<'_, str>, TextEncoding)> {
    decode_with(bytes, &TextEncoding::FALLBACK_ORDER)
}

/// Decode with the first encoding in `order` that accepts the bytes.
pub fn decode_with<'a>(
    bytes: &'a [u8],
    order: &[TextEncoding],
) -> Result<(Cow<'a, str>, TextEncoding)> {
    for encoding in order {
        match encoding.decode(bytes) {
            Some(text) => return Ok((text, *encoding)),
            None => debug!("Input is not valid {}, trying next encoding", encoding),
        }
    }

    Err(PipelineError::Decode {
        tried: order
            .iter()
            .map(TextEncoding::label)
            .collect::<Vec<_>>()
            .join(", "),
    })
}
