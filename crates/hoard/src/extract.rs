//! Pluggable tag extraction.
//!
//! Extractors look at the raw bytes of an object as it is added and
//! propose tags for it. They are best effort: a failing extractor is
//! logged and skipped, never allowed to block ingestion.

use hoard_types::Tag;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExtractError(String);

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Derives tags from object bytes. Must be pure: the same bytes always
/// produce the same tags, since `add` may run it more than once.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, data: &[u8]) -> Result<Vec<Tag>, ExtractError>;
}

/// Adapts a closure into an [`Extractor`].
pub struct FnExtractor<F> {
    name: String,
    f: F,
}

impl<F> FnExtractor<F>
where
    F: Fn(&[u8]) -> Result<Vec<Tag>, ExtractError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Extractor for FnExtractor<F>
where
    F: Fn(&[u8]) -> Result<Vec<Tag>, ExtractError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<Tag>, ExtractError> {
        (self.f)(data)
    }
}

/// Tags objects with a `format` value sniffed from their leading bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentTypeExtractor;

impl ContentTypeExtractor {
    pub const KEY: &'static str = "format";

    /// How much of the payload is inspected when deciding whether it is text.
    const TEXT_SAMPLE: usize = 8 << 10;

    pub fn detect(data: &[u8]) -> Option<&'static str> {
        const SIGNATURES: &[(&[u8], &str)] = &[
            (b"fLaC", "flac"),
            (b"ID3", "mp3"),
            (b"\x89PNG\r\n\x1a\n", "png"),
            (b"\xff\xd8\xff", "jpeg"),
            (b"GIF87a", "gif"),
            (b"GIF89a", "gif"),
            (b"%PDF-", "pdf"),
            (b"\x1f\x8b", "gzip"),
            (b"PK\x03\x04", "zip"),
        ];

        if let Some((_, format)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(*magic)) {
            return Some(*format);
        }
        // Bare MPEG audio frame sync: 11 set bits.
        if data.len() >= 2 && data[0] == 0xff && data[1] & 0xe0 == 0xe0 {
            return Some("mp3");
        }
        if is_text(&data[..data.len().min(Self::TEXT_SAMPLE)]) {
            return Some("text");
        }
        None
    }
}

impl Extractor for ContentTypeExtractor {
    fn name(&self) -> &str {
        "content-type"
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<Tag>, ExtractError> {
        Ok(Self::detect(data)
            .map(|format| vec![Tag::new(Self::KEY, format)])
            .unwrap_or_default())
    }
}

fn is_text(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let valid = match std::str::from_utf8(sample) {
        Ok(_) => sample,
        // The sample may end inside a multi-byte character.
        Err(e) if e.error_len().is_none() => &sample[..e.valid_up_to()],
        Err(_) => return false,
    };
    valid
        .iter()
        .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}
