//! Optional MIME sniffing
//!
//! A [`MimeSniffer`] inspects a file header and names its media type. The
//! validator trusts a sniffed type only when it is in [`SAFE_MIME_TYPES`] and
//! matches what the claimed extension should be; anything else falls through to
//! the signature table.

use std::sync::Arc;

use crate::signature::SignatureTable;

/// Media types a sniffer may vouch for
pub const SAFE_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "video/mp4",
    "video/quicktime",
];

#[derive(Debug, thiserror::Error)]
pub enum SniffError {
    #[error("{sniffer} sniffer failed: {message}")]
    Failed {
        sniffer: &'static str,
        message: String,
    },
}

/// Content-type detection from a file header
pub trait MimeSniffer: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the format was not recognised. An `Err` means the sniffer
    /// itself failed and the file must be treated as unverifiable.
    fn sniff(&self, header: &[u8]) -> Result<Option<String>, SniffError>;
}

/// Signature-table sniffer: the first entry whose pattern matches names the type
impl MimeSniffer for SignatureTable {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn sniff(&self, header: &[u8]) -> Result<Option<String>, SniffError> {
        Ok(self
            .entries()
            .iter()
            .find(|entry| entry.signature.matches(header))
            .map(|entry| entry.mime_type.to_string()))
    }
}

/// Sniffer backed by `image::guess_format`
///
/// Recognises still-image formats only; video containers are left to the
/// signature table.
#[cfg(feature = "sniff")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFormatSniffer;

#[cfg(feature = "sniff")]
impl MimeSniffer for ImageFormatSniffer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn sniff(&self, header: &[u8]) -> Result<Option<String>, SniffError> {
        match image::guess_format(header) {
            Ok(format) => Ok(Some(format.to_mime_type().to_string())),
            Err(image::ImageError::Unsupported(_)) => Ok(None),
            Err(e) => Err(SniffError::Failed {
                sniffer: self.name(),
                message: e.to_string(),
            }),
        }
    }
}

/// The sniffer selected for this build: image-format detection when the
/// `sniff` feature is on, the signature table otherwise.
pub fn default_sniffer() -> Option<Arc<dyn MimeSniffer>> {
    #[cfg(feature = "sniff")]
    {
        Some(Arc::new(ImageFormatSniffer))
    }
    #[cfg(not(feature = "sniff"))]
    {
        Some(Arc::new(SignatureTable::new()))
    }
}
