//! Magic-byte signature table
//!
//! The guaranteed content check: every allowed media extension maps to the byte
//! pattern its files must carry. Used whenever MIME sniffing is unavailable or
//! does not vouch for a file.

/// How far into the header container formats are searched for their marker
pub const CONTAINER_SCAN_LEN: usize = 256;

/// Byte pattern a file of a given format must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Header starts with these bytes
    Prefix(&'static [u8]),
    /// One of these byte strings occurs within the first `within` bytes
    ContainsAny {
        needles: &'static [&'static [u8]],
        within: usize,
    },
}

impl Signature {
    pub fn matches(&self, header: &[u8]) -> bool {
        match *self {
            Signature::Prefix(prefix) => header.starts_with(prefix),
            Signature::ContainsAny { needles, within } => {
                let window = &header[..header.len().min(within)];
                needles.iter().any(|needle| contains(window, needle))
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// One media format: the extensions that claim it, its MIME type and signature
#[derive(Debug, Clone, Copy)]
pub struct SignatureEntry {
    pub extensions: &'static [&'static str],
    pub mime_type: &'static str,
    pub signature: Signature,
}

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF_MAGIC: &[u8] = b"GIF8";

// The container checks are substring heuristics: they can accept non-media
// files that happen to contain the marker and reject files with unusual box
// ordering. Accepted-file behavior depends on them, so they stay as they are.
const ENTRIES: &[SignatureEntry] = &[
    SignatureEntry {
        extensions: &["png"],
        mime_type: "image/png",
        signature: Signature::Prefix(PNG_MAGIC),
    },
    SignatureEntry {
        extensions: &["jpg", "jpeg"],
        mime_type: "image/jpeg",
        signature: Signature::Prefix(JPEG_MAGIC),
    },
    SignatureEntry {
        extensions: &["gif"],
        mime_type: "image/gif",
        signature: Signature::Prefix(GIF_MAGIC),
    },
    SignatureEntry {
        extensions: &["mp4"],
        mime_type: "video/mp4",
        signature: Signature::ContainsAny {
            needles: &[b"ftyp"],
            within: CONTAINER_SCAN_LEN,
        },
    },
    SignatureEntry {
        extensions: &["mov"],
        mime_type: "video/quicktime",
        signature: Signature::ContainsAny {
            needles: &[b"ftypqt", b"qt  "],
            within: CONTAINER_SCAN_LEN,
        },
    },
];

/// Lookup over the built-in signature entries
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureTable;

impl SignatureTable {
    pub fn new() -> Self {
        Self
    }

    pub fn entries(&self) -> &'static [SignatureEntry] {
        ENTRIES
    }

    /// Entry for a lowercased extension (no leading dot)
    pub fn lookup(&self, extension: &str) -> Option<&'static SignatureEntry> {
        ENTRIES
            .iter()
            .find(|entry| entry.extensions.contains(&extension))
    }

    /// MIME type files with this extension are expected to have
    pub fn expected_mime(&self, extension: &str) -> Option<&'static str> {
        self.lookup(extension).map(|entry| entry.mime_type)
    }

    /// `None` when the extension has no signature; such files are never accepted
    /// by the table.
    pub fn matches(&self, extension: &str, header: &[u8]) -> Option<bool> {
        self.lookup(extension)
            .map(|entry| entry.signature.matches(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_marker_at(offset: usize, marker: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; offset];
        data.extend_from_slice(marker);
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    #[test]
    fn test_image_prefixes() {
        let table = SignatureTable::new();
        assert_eq!(table.matches("png", b"\x89PNG\r\n\x1a\n\x00\x00"), Some(true));
        assert_eq!(table.matches("png", b"\x89PNG\r\n"), Some(false));
        assert_eq!(table.matches("jpg", &[0xFF, 0xD8, 0xFF, 0xE0]), Some(true));
        assert_eq!(table.matches("jpeg", &[0xFF, 0xD8, 0xFF, 0xDB]), Some(true));
        assert_eq!(table.matches("jpeg", &[0xFF, 0xD8]), Some(false));
        assert_eq!(table.matches("gif", b"GIF89a"), Some(true));
        assert_eq!(table.matches("gif", b"GIF87a"), Some(true));
        assert_eq!(table.matches("gif", b"JIF89a"), Some(false));
    }

    #[test]
    fn test_mp4_marker_must_be_in_first_256_bytes() {
        let table = SignatureTable::new();
        assert_eq!(table.matches("mp4", &with_marker_at(4, b"ftyp")), Some(true));
        assert_eq!(table.matches("mp4", &with_marker_at(252, b"ftyp")), Some(true));
        assert_eq!(table.matches("mp4", &with_marker_at(253, b"ftyp")), Some(false));
    }

    #[test]
    fn test_mov_accepts_either_marker() {
        let table = SignatureTable::new();
        assert_eq!(table.matches("mov", &with_marker_at(4, b"ftypqt")), Some(true));
        assert_eq!(table.matches("mov", &with_marker_at(20, b"qt  ")), Some(true));
        // plain mp4 brand is not a quicktime file
        assert_eq!(table.matches("mov", &with_marker_at(4, b"ftypisom")), Some(false));
        assert_eq!(table.matches("mov", &with_marker_at(20, b"qt")), Some(false));
    }

    #[test]
    fn test_unknown_extension_has_no_signature() {
        let table = SignatureTable::new();
        assert_eq!(table.matches("exe", b"MZ"), None);
        assert_eq!(table.matches("webp", b"RIFF\0\0\0\0WEBP"), None);
        assert_eq!(table.expected_mime("jpeg"), Some("image/jpeg"));
        assert_eq!(table.expected_mime("mov"), Some("video/quicktime"));
    }

    #[test]
    fn test_empty_header_never_matches() {
        let table = SignatureTable::new();
        for entry in table.entries() {
            for ext in entry.extensions {
                assert_eq!(table.matches(ext, &[]), Some(false), "{}", ext);
            }
        }
    }
}
