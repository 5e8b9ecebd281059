//! Payload compression.
//!
//! Compressed payloads are framed as `COMPRESSION_MARKER || codec output` so a
//! reader can tell them apart from plain payloads without out-of-band
//! metadata. Plain payloads are stored untouched.

use crate::error::{CachetError, Result};
use std::sync::Arc;
use tracing::warn;

/// Prefix carried by every compressed payload. Serialized JSON never starts
/// with a NUL byte.
pub const COMPRESSION_MARKER: &[u8] = b"\x00CZ1";

// ═══════════════════════════════════════════════════════════════════════════════
// Codec Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// A pluggable compression algorithm.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Pass-through codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCodec;

impl Codec for NoopCodec {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// LZ4 block codec. The uncompressed size is prepended so decompression needs
/// no size hint.
#[derive(Debug, Clone, Copy)]
pub struct Lz4Codec {
    level: i32,
}

impl Lz4Codec {
    pub fn new() -> Self {
        Self { level: 4 }
    }

    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        )
        .map_err(|e| CachetError::compression(e.to_string()).with_source(e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::decompress(data, None)
            .map_err(|e| CachetError::decompression(e.to_string()).with_source(e))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Payload Framing
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a stored payload carries the compression marker.
pub fn is_compressed(payload: &[u8]) -> bool {
    payload.starts_with(COMPRESSION_MARKER)
}

/// Applies the compression policy to outgoing payloads and reverses it on
/// the way back.
#[derive(Clone)]
pub struct PayloadCodec {
    codec: Arc<dyn Codec>,
    threshold: usize,
    auto_compress: bool,
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("codec", &self.codec.name())
            .field("threshold", &self.threshold)
            .field("auto_compress", &self.auto_compress)
            .finish()
    }
}

impl PayloadCodec {
    /// `threshold` is the size in bytes above which payloads are compressed
    /// when `auto_compress` is on.
    pub fn new(codec: Arc<dyn Codec>, threshold: usize, auto_compress: bool) -> Self {
        Self {
            codec,
            threshold,
            auto_compress,
        }
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    pub fn should_compress(&self, len: usize, requested: bool) -> bool {
        requested || (self.auto_compress && len > self.threshold)
    }

    /// Frame a payload for storage. Falls back to the plain payload when the
    /// codec fails.
    pub fn encode(&self, data: Vec<u8>, requested: bool) -> Vec<u8> {
        if !self.should_compress(data.len(), requested) {
            return data;
        }

        match self.codec.compress(&data) {
            Ok(compressed) => {
                let mut framed = Vec::with_capacity(COMPRESSION_MARKER.len() + compressed.len());
                framed.extend_from_slice(COMPRESSION_MARKER);
                framed.extend_from_slice(&compressed);
                framed
            }
            Err(e) => {
                warn!(codec = self.codec.name(), error = %e, "Compression failed, storing uncompressed");
                data
            }
        }
    }

    /// Strip the marker and decompress, or pass plain payloads through.
    pub fn decode(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        match payload.strip_prefix(COMPRESSION_MARKER) {
            Some(body) => self.codec.decompress(body),
            None => Ok(payload),
        }
    }
}
