use std::collections::BTreeSet;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use questlab_core::{AppError, QuestlabConfig};

use crate::signature::SignatureTable;
use crate::sniff::{default_sniffer, MimeSniffer, SniffError, SAFE_MIME_TYPES};

/// Bytes read from the start of a file for content inspection
pub const HEADER_LEN: usize = 2048;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty filename")]
    EmptyFilename,

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File content does not match its extension: {filename}")]
    ContentMismatch { filename: String },

    #[error("Could not read upload: {0}")]
    Unreadable(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyFilename => AppError::InvalidInput("No file selected".into()),
            ValidationError::InvalidExtension { .. } => {
                AppError::InvalidInput("File type not allowed".into())
            }
            ValidationError::FileTooLarge { size, max } => AppError::PayloadTooLarge { size, max },
            ValidationError::ContentMismatch { .. } | ValidationError::Unreadable(_) => {
                AppError::InvalidInput("Invalid file type".into())
            }
        }
    }
}

/// Failure to inspect content at all, as opposed to a negative verdict
#[derive(Debug, thiserror::Error)]
pub enum InspectionError {
    #[error("Failed to read file header: {0}")]
    StreamRead(#[from] io::Error),

    #[error(transparent)]
    Sniff(#[from] SniffError),
}

/// Outcome of content inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVerdict {
    /// The sniffer recognised the expected safe type
    Sniffed(String),
    /// The header carries the extension's magic bytes
    SignatureMatch,
    ExtensionNotAllowed,
    SignatureMismatch,
    /// Allowed by configuration but no known signature
    NoSignature,
}

impl ContentVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            ContentVerdict::Sniffed(_) | ContentVerdict::SignatureMatch
        )
    }
}

/// Upload validator
///
/// Holds the extension allow-list, the size limit, and an optional sniffer.
/// Content checks read at most [`HEADER_LEN`] bytes and always leave the stream
/// where they found it. Any failure while inspecting rejects the file.
#[derive(Clone)]
pub struct UploadValidator {
    allowed_extensions: BTreeSet<String>,
    max_file_size: u64,
    sniffer: Option<Arc<dyn MimeSniffer>>,
    signatures: SignatureTable,
}

impl UploadValidator {
    /// Validator with the default sniffer of this build.
    pub fn new<I, S>(allowed_extensions: I, max_file_size: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            max_file_size,
            sniffer: default_sniffer(),
            signatures: SignatureTable::new(),
        }
    }

    pub fn from_config(config: &QuestlabConfig) -> Self {
        Self::new(&config.allowed_extensions, config.max_content_length_bytes)
    }

    /// Replace the sniffer; `None` leaves the signature table as the only check.
    pub fn with_sniffer(mut self, sniffer: Option<Arc<dyn MimeSniffer>>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn sniffer_name(&self) -> Option<&'static str> {
        self.sniffer.as_ref().map(|s| s.name())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    /// Lowercased text after the last dot, if any.
    pub fn extension_of(filename: &str) -> Option<String> {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }

    /// Whether the filename carries an allowed extension. Case-insensitive.
    pub fn is_allowed_extension(&self, filename: &str) -> bool {
        Self::extension_of(filename)
            .map(|ext| self.allowed_extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Inspect the header of `stream` against the claimed extension.
    ///
    /// The stream position is restored before returning, on success and on
    /// failure.
    pub fn inspect_content<R: Read + Seek>(
        &self,
        stream: &mut R,
        filename: &str,
    ) -> Result<ContentVerdict, InspectionError> {
        let extension = match Self::extension_of(filename) {
            Some(ext) if self.allowed_extensions.contains(&ext) => ext,
            _ => return Ok(ContentVerdict::ExtensionNotAllowed),
        };

        let header = read_header(stream)?;

        if let Some(sniffer) = &self.sniffer {
            if let Some(mime) = sniffer.sniff(&header)? {
                let expected = self.signatures.expected_mime(&extension);
                if SAFE_MIME_TYPES.contains(&mime.as_str()) && expected == Some(mime.as_str()) {
                    return Ok(ContentVerdict::Sniffed(mime));
                }
                tracing::debug!(
                    filename = %filename,
                    sniffed = %mime,
                    expected = ?expected,
                    "Sniffed type not trusted, checking signature"
                );
            }
        }

        Ok(match self.signatures.matches(&extension, &header) {
            Some(true) => ContentVerdict::SignatureMatch,
            Some(false) => ContentVerdict::SignatureMismatch,
            None => ContentVerdict::NoSignature,
        })
    }

    /// Whether the content is consistent with the filename's claimed type.
    ///
    /// Never errors: read and sniffer failures reject the file.
    pub fn validate_content<R: Read + Seek>(&self, stream: &mut R, filename: &str) -> bool {
        match self.inspect_content(stream, filename) {
            Ok(verdict) if verdict.is_accepted() => {
                tracing::debug!(filename = %filename, verdict = ?verdict, "Upload content accepted");
                true
            }
            Ok(verdict) => {
                tracing::warn!(filename = %filename, verdict = ?verdict, "Upload content rejected");
                false
            }
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Upload content could not be inspected");
                false
            }
        }
    }

    /// Whether the stream's total length is within the configured limit.
    pub fn within_size_limit<S: Seek>(&self, stream: &mut S) -> bool {
        within_size_limit(stream, self.max_file_size)
    }

    /// Size check that reports the measured length.
    pub fn check_size<S: Seek>(&self, stream: &mut S) -> Result<u64, ValidationError> {
        let size = stream_len(stream).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(size)
    }

    /// Full check in upload order: filename, extension, size, content.
    /// Returns the measured size.
    pub fn validate<R: Read + Seek>(
        &self,
        filename: &str,
        stream: &mut R,
    ) -> Result<u64, ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::EmptyFilename);
        }

        if !self.is_allowed_extension(filename) {
            return Err(ValidationError::InvalidExtension {
                extension: Self::extension_of(filename).unwrap_or_default(),
                allowed: self.allowed_extensions.iter().cloned().collect(),
            });
        }

        let size = self.check_size(stream)?;

        if !self.validate_content(stream, filename) {
            return Err(ValidationError::ContentMismatch {
                filename: filename.to_string(),
            });
        }

        Ok(size)
    }
}

impl std::fmt::Debug for UploadValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadValidator")
            .field("allowed_extensions", &self.allowed_extensions)
            .field("max_file_size", &self.max_file_size)
            .field("sniffer", &self.sniffer_name())
            .finish()
    }
}

fn read_header<R: Read + Seek>(stream: &mut R) -> io::Result<Vec<u8>> {
    let original = stream.stream_position()?;
    let read = (|| -> io::Result<Vec<u8>> {
        stream.seek(SeekFrom::Start(0))?;
        let mut header = Vec::with_capacity(HEADER_LEN);
        stream
            .by_ref()
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)?;
        Ok(header)
    })();
    let restored = stream.seek(SeekFrom::Start(original));
    let header = read?;
    restored?;
    Ok(header)
}

/// Total length of a seekable stream; the position is left unchanged.
pub fn stream_len<S: Seek>(stream: &mut S) -> io::Result<u64> {
    let original = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0));
    let restored = stream.seek(SeekFrom::Start(original));
    let len = len?;
    restored?;
    Ok(len)
}

/// `true` when the stream is at most `max_bytes` long. A stream whose length
/// cannot be measured is treated as too large.
pub fn within_size_limit<S: Seek>(stream: &mut S, max_bytes: u64) -> bool {
    match stream_len(stream) {
        Ok(len) => len <= max_bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not measure upload size");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MIB: u64 = 1024 * 1024;
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

    fn validator() -> UploadValidator {
        UploadValidator::from_config(&QuestlabConfig::default())
    }

    fn signature_only() -> UploadValidator {
        validator().with_sniffer(None)
    }

    fn mp4_with_ftyp_at(offset: usize) -> Vec<u8> {
        let mut data = vec![0u8; offset];
        data.extend_from_slice(b"ftypisom");
        data.resize(offset + 512, 0);
        data
    }

    struct FixedSniffer(Result<Option<&'static str>, ()>);

    impl MimeSniffer for FixedSniffer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn sniff(&self, _header: &[u8]) -> Result<Option<String>, SniffError> {
            match self.0 {
                Ok(mime) => Ok(mime.map(str::to_string)),
                Err(()) => Err(SniffError::Failed {
                    sniffer: "fixed",
                    message: "boom".into(),
                }),
            }
        }
    }

    /// Seekable reader whose reads always fail
    struct BrokenReader(Cursor<Vec<u8>>);

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    impl Seek for BrokenReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    #[test]
    fn test_allowed_extension_is_case_insensitive() {
        let v = validator();
        assert!(v.is_allowed_extension("photo.png"));
        assert!(v.is_allowed_extension("photo.PNG"));
        assert!(v.is_allowed_extension("clip.Mov"));
        assert!(v.is_allowed_extension("archive.tar.gif"));
        assert!(!v.is_allowed_extension("script.exe"));
        assert!(!v.is_allowed_extension("png"));
        assert!(!v.is_allowed_extension(""));
        assert!(!v.is_allowed_extension("photo.png.exe"));
    }

    #[test]
    fn test_configured_extensions_are_normalized() {
        let v = UploadValidator::new([" .PNG", "gif", ""], MIB);
        assert_eq!(v.allowed_extensions().collect::<Vec<_>>(), vec!["gif", "png"]);
    }

    #[test]
    fn test_png_accepted_and_position_reset() {
        for v in [validator(), signature_only()] {
            let mut stream = Cursor::new(PNG.to_vec());
            assert!(v.validate_content(&mut stream, "photo.png"));
            assert_eq!(stream.position(), 0);
        }
    }

    #[test]
    fn test_position_is_restored_not_rewound() {
        let v = validator();
        let mut stream = Cursor::new(PNG.to_vec());
        stream.set_position(5);
        assert!(v.validate_content(&mut stream, "photo.png"));
        assert_eq!(stream.position(), 5);
    }

    #[test]
    fn test_png_extension_with_text_is_rejected() {
        for v in [validator(), signature_only()] {
            let mut stream = Cursor::new(b"This is not an image".to_vec());
            assert!(!v.validate_content(&mut stream, "photo.png"));
            assert_eq!(stream.position(), 0);
        }
    }

    #[test]
    fn test_other_image_under_png_name_is_rejected() {
        for v in [validator(), signature_only()] {
            let mut stream = Cursor::new(b"GIF89a\x01\0\x01\0\0\0\0".to_vec());
            assert_eq!(
                v.inspect_content(&mut stream, "photo.png").unwrap(),
                ContentVerdict::SignatureMismatch
            );
        }
    }

    #[test]
    fn test_jpeg_and_gif_signatures() {
        let v = signature_only();
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert!(v.validate_content(&mut Cursor::new(jpeg.to_vec()), "a.jpg"));
        assert!(v.validate_content(&mut Cursor::new(jpeg.to_vec()), "a.JPEG"));
        assert!(v.validate_content(&mut Cursor::new(b"GIF87a....".to_vec()), "a.gif"));
    }

    #[test]
    fn test_sniffer_vouches_for_expected_type() {
        let v = validator();
        let mut stream = Cursor::new(PNG.to_vec());
        assert_eq!(
            v.inspect_content(&mut stream, "photo.png").unwrap(),
            ContentVerdict::Sniffed("image/png".into())
        );
        let v = signature_only();
        assert_eq!(
            v.inspect_content(&mut stream, "photo.png").unwrap(),
            ContentVerdict::SignatureMatch
        );
    }

    #[test]
    fn test_signature_sniffer_as_capability() {
        let v = validator().with_sniffer(Some(Arc::new(SignatureTable::new())));
        assert_eq!(v.sniffer_name(), Some("signature"));
        let mut stream = Cursor::new(mp4_with_ftyp_at(4));
        assert_eq!(
            v.inspect_content(&mut stream, "clip.mp4").unwrap(),
            ContentVerdict::Sniffed("video/mp4".into())
        );
        // sniffed as mp4, but a .mov must carry a quicktime marker
        assert_eq!(
            v.inspect_content(&mut stream, "clip.mov").unwrap(),
            ContentVerdict::SignatureMismatch
        );
    }

    #[test]
    fn test_mp4_marker_window() {
        let v = validator();
        assert!(v.validate_content(&mut Cursor::new(mp4_with_ftyp_at(4)), "clip.mp4"));
        assert!(!v.validate_content(&mut Cursor::new(mp4_with_ftyp_at(300)), "clip.mp4"));
    }

    #[test]
    fn test_mov_markers() {
        let v = validator();
        let mut qt = vec![0, 0, 0, 0x14];
        qt.extend_from_slice(b"ftypqt  ");
        assert!(v.validate_content(&mut Cursor::new(qt), "clip.mov"));
        assert!(!v.validate_content(&mut Cursor::new(mp4_with_ftyp_at(4)), "clip.mov"));
    }

    #[test]
    fn test_disallowed_extension_is_rejected_without_reading() {
        let v = validator();
        let mut stream = BrokenReader(Cursor::new(Vec::new()));
        assert_eq!(
            v.inspect_content(&mut stream, "run.exe").unwrap(),
            ContentVerdict::ExtensionNotAllowed
        );
    }

    #[test]
    fn test_allowed_extension_without_signature_is_rejected() {
        let v = UploadValidator::new(["png", "webp"], MIB).with_sniffer(None);
        let mut stream = Cursor::new(b"RIFF\0\0\0\0WEBPVP8 ".to_vec());
        assert_eq!(
            v.inspect_content(&mut stream, "a.webp").unwrap(),
            ContentVerdict::NoSignature
        );
        assert!(!v.validate_content(&mut stream, "a.webp"));
    }

    #[test]
    fn test_read_failure_rejects() {
        let v = validator();
        let mut stream = BrokenReader(Cursor::new(PNG.to_vec()));
        assert!(matches!(
            v.inspect_content(&mut stream, "photo.png"),
            Err(InspectionError::StreamRead(_))
        ));
        assert!(!v.validate_content(&mut stream, "photo.png"));
        assert_eq!(stream.0.position(), 0);
    }

    #[test]
    fn test_sniffer_failure_rejects_even_with_valid_signature() {
        let v = validator().with_sniffer(Some(Arc::new(FixedSniffer(Err(())))));
        let mut stream = Cursor::new(PNG.to_vec());
        assert!(matches!(
            v.inspect_content(&mut stream, "photo.png"),
            Err(InspectionError::Sniff(_))
        ));
        assert!(!v.validate_content(&mut stream, "photo.png"));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_unsafe_sniffed_type_falls_back_to_signature() {
        let v = validator().with_sniffer(Some(Arc::new(FixedSniffer(Ok(Some("text/html"))))));
        assert!(v.validate_content(&mut Cursor::new(PNG.to_vec()), "photo.png"));
        assert!(!v.validate_content(&mut Cursor::new(b"<html>".to_vec()), "photo.png"));
    }

    #[test]
    fn test_empty_stream_is_rejected() {
        let v = validator();
        assert!(!v.validate_content(&mut Cursor::new(Vec::new()), "photo.png"));
    }

    #[test]
    fn test_size_limit_boundaries() {
        let mut exact = Cursor::new(vec![0u8; (10 * MIB) as usize]);
        assert!(within_size_limit(&mut exact, 10 * MIB));
        assert_eq!(exact.position(), 0);

        let mut over = Cursor::new(vec![0u8; (11 * MIB) as usize]);
        assert!(!within_size_limit(&mut over, 10 * MIB));
        assert_eq!(over.position(), 0);

        assert!(validator().within_size_limit(&mut exact));
    }

    #[test]
    fn test_size_is_total_length_regardless_of_position() {
        let mut stream = Cursor::new(vec![0u8; 100]);
        stream.set_position(60);
        assert_eq!(stream_len(&mut stream).unwrap(), 100);
        assert_eq!(stream.position(), 60);
        assert!(!within_size_limit(&mut stream, 99));
    }

    #[test]
    fn test_validate_order() {
        let v = UploadValidator::new(["png"], 16);
        assert!(matches!(
            v.validate("  ", &mut Cursor::new(PNG.to_vec())),
            Err(ValidationError::EmptyFilename)
        ));
        assert!(matches!(
            v.validate("a.exe", &mut Cursor::new(vec![0u8; 1000])),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            v.validate("a.png", &mut Cursor::new(vec![0u8; 1000])),
            Err(ValidationError::FileTooLarge { size: 1000, max: 16 })
        ));
        assert!(matches!(
            v.validate("a.png", &mut Cursor::new(vec![0u8; 10])),
            Err(ValidationError::ContentMismatch { .. })
        ));
        assert_eq!(v.validate("a.png", &mut Cursor::new(PNG[..16].to_vec())).unwrap(), 16);
    }

    #[test]
    fn test_validation_error_client_messages() {
        use questlab_core::ErrorMetadata;

        let err: AppError = ValidationError::EmptyFilename.into();
        assert_eq!(err.client_message(), "No file selected");
        let err: AppError = ValidationError::InvalidExtension {
            extension: "exe".into(),
            allowed: vec![],
        }
        .into();
        assert_eq!(err.client_message(), "File type not allowed");
        let err: AppError = ValidationError::ContentMismatch {
            filename: "a.png".into(),
        }
        .into();
        assert_eq!(err.client_message(), "Invalid file type");
        let err: AppError = ValidationError::FileTooLarge {
            size: 11 * MIB,
            max: 10 * MIB,
        }
        .into();
        assert_eq!(err.client_message(), "File too large. Maximum size is 10MB.");
    }
}
