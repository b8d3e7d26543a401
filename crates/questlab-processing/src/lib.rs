//! QuestLab upload processing
//!
//! Decides whether an uploaded file may be stored: extension allow-listing, size
//! limits, and content verification by MIME sniffing with a magic-byte signature
//! fallback. Accepted files get a server-generated storage name and go through
//! the upload pipeline into storage.

pub mod filename;
pub mod signature;
pub mod sniff;
pub mod upload;
pub mod validator;

pub use filename::{build_storage_name, generate_storage_name, storage_extension};
pub use signature::{Signature, SignatureEntry, SignatureTable};
pub use sniff::{default_sniffer, MimeSniffer, SniffError, SAFE_MIME_TYPES};
#[cfg(feature = "sniff")]
pub use sniff::ImageFormatSniffer;
pub use upload::{StoredUpload, UploadPipeline};
pub use validator::{
    stream_len, within_size_limit, ContentVerdict, InspectionError, UploadValidator,
    ValidationError, HEADER_LEN,
};
