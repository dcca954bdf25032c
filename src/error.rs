//! Error types for the asset build.
//!
//! Every failure is fatal; nothing here is retried or recovered.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All the ways a build can fail.
#[derive(Error, Debug)]
pub enum Error {
    /// A source record could not be turned into a polygon.
    #[error("parse error: {0}")]
    Parse(String),

    /// An intersection scan produced an odd number of crossings.
    #[error("geometry invariant violated: {0}")]
    GeometryInvariant(String),

    /// The exact shortcut computation produced an implausible cell set.
    #[error("shortcut index invariant violated: {0}")]
    IndexInvariant(String),

    /// A value does not fit the field width of the binary format.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// A precomputed section address differs from the actual write position.
    #[error("address mismatch in {section}: computed {expected}, actual position {actual}")]
    AddressMismatch {
        /// Section whose start address was checked.
        section: &'static str,
        /// Address derived from counts and lengths.
        expected: u64,
        /// Position of the writer when the section began.
        actual: u64,
    },

    /// The build was configured in a way that cannot run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A compiled asset could not be decoded.
    #[error("corrupt asset: {0}")]
    CorruptAsset(String),

    /// Reading the source or writing the asset failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source document is not valid GeoJSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source archive could not be read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The zone catalog could not be encoded.
    #[error("catalog encoding error: {0}")]
    CatalogEncode(#[from] bincode::error::EncodeError),

    /// The zone catalog could not be decoded.
    #[error("catalog decoding error: {0}")]
    CatalogDecode(#[from] bincode::error::DecodeError),

    /// Fetching a remote source failed.
    #[cfg(feature = "download")]
    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptAsset(msg.into())
    }
}
