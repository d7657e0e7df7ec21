//! Accept-Encoding negotiation and body compression.

use std::fmt;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CompressionError;

/// Negotiated content encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    Brotli,
    Gzip,
    Identity,
}

impl ContentEncoding {
    /// Content-Encoding header value, `None` for identity.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Self::Brotli => Some("br"),
            Self::Gzip => Some("gzip"),
            Self::Identity => None,
        }
    }

    /// Extension of the precompressed sibling file.
    pub fn file_extension(&self) -> Option<&'static str> {
        match self {
            Self::Brotli => Some("br"),
            Self::Gzip => Some("gz"),
            Self::Identity => None,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value().unwrap_or("identity"))
    }
}

/// Pick an encoding from an Accept-Encoding value.
///
/// Token presence alone decides: `br` anywhere beats `gzip`, and q-values
/// are ignored, so `br;q=0` still selects brotli.
pub fn detect_encoding(accept_encoding: &str) -> ContentEncoding {
    let mut gzip = false;
    for token in accept_encoding.split(',') {
        let name = token.split(';').next().unwrap_or("").trim();
        if name.eq_ignore_ascii_case("br") {
            return ContentEncoding::Brotli;
        }
        if name.eq_ignore_ascii_case("gzip") {
            gzip = true;
        }
    }
    if gzip {
        ContentEncoding::Gzip
    } else {
        ContentEncoding::Identity
    }
}

/// Compression effort per algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel {
    /// Gzip level, 0-9.
    pub gzip: u32,
    /// Brotli quality, 0-11.
    pub brotli: u32,
}

impl CompressionLevel {
    /// Request-time compression.
    pub const RUNTIME: Self = Self { gzip: 9, brotli: 6 };
    /// Offline asset compression.
    pub const BUILD: Self = Self { gzip: 9, brotli: 11 };
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::RUNTIME
    }
}

/// Bodies smaller than this are sent uncompressed at request time.
pub const DEFAULT_MIN_COMPRESS_SIZE: usize = 1024;

/// Assets smaller than this get no precompressed variants.
pub const PRECOMPRESS_THRESHOLD: usize = 8192;

/// A precompressed variant must be at most this fraction of the original.
pub const PRECOMPRESS_MIN_RATIO: f64 = 0.8;

/// Whether a body of `len` bytes is worth compressing.
pub fn should_compress(len: usize, min_size: usize) -> bool {
    len >= min_size
}

/// Compress `data` with `encoding`. Identity returns a copy.
pub fn compress(
    data: &[u8],
    encoding: ContentEncoding,
    level: CompressionLevel,
) -> Result<Vec<u8>, CompressionError> {
    match encoding {
        ContentEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.gzip.min(9)));
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        ContentEncoding::Brotli => {
            let mut output = Vec::new();
            let params = brotli::enc::BrotliEncoderParams {
                quality: level.brotli.min(11) as i32,
                size_hint: data.len(),
                ..Default::default()
            };
            let mut reader = std::io::Cursor::new(data);
            brotli::BrotliCompress(&mut reader, &mut output, &params)
                .map_err(|e| CompressionError::Failed(e.to_string()))?;
            Ok(output)
        }
        ContentEncoding::Identity => Ok(data.to_vec()),
    }
}

/// Build-time variant for a static asset.
///
/// Returns `None` when the asset is below `PRECOMPRESS_THRESHOLD` or the
/// compressed output does not beat `PRECOMPRESS_MIN_RATIO`.
pub fn precompress(
    data: &[u8],
    encoding: ContentEncoding,
) -> Result<Option<Vec<u8>>, CompressionError> {
    if encoding.is_identity() || data.len() < PRECOMPRESS_THRESHOLD {
        return Ok(None);
    }
    let compressed = compress(data, encoding, CompressionLevel::BUILD)?;
    let ratio = compressed.len() as f64 / data.len() as f64;
    if ratio > PRECOMPRESS_MIN_RATIO {
        tracing::debug!(%encoding, ratio, "skipping precompressed variant");
        return Ok(None);
    }
    Ok(Some(compressed))
}
