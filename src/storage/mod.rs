//! # Cloud Storage Module
//!
//! Publishing of images to cloud object storage. [`StorageProvider`] is the
//! provider contract; [`ImagePublisher`] layers folder resolution, upload,
//! public sharing and the retry policy of the sharing step on top of it.
use thiserror::Error;

pub mod drive;
pub mod retry;

pub use drive::DriveStorage;
pub use retry::RetryPolicy;

/// Media type used when the source of an image did not declare one
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Error types of storage provider calls
#[derive(Error, Debug)]
pub enum StorageError {
    /// The service answered with a non-success HTTP status
    #[error("Storage service responded {status}: {message}")]
    StatusError { status: u16, message: String },

    /// The request could not be sent or its response could not be read
    #[error("Storage request failed: {0}")]
    TransportError(#[from] reqwest::Error),

    /// The service answered with a body that is not the expected JSON
    #[error("Unexpected storage response: {0}")]
    DecodeError(#[from] serde_json::Error),

    /// No access token could be found for the storage service
    #[error("No storage access token: pass --access-token, set DRIVE_ACCESS_TOKEN or provide '{0}'")]
    MissingTokenError(String),

    #[error("Cannot read token file '{0}': {1}")]
    TokenFileError(String, String),
}

impl StorageError {
    /// HTTP status reported by the service, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::StatusError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations of a cloud object storage service.
///
/// Requires an authenticated session set up by the implementation.
pub trait StorageProvider {
    /// Returns the id of a folder with exactly this name, if one exists
    fn find_folder(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Creates a folder and returns its id
    fn create_folder(&self, name: &str) -> Result<String, StorageError>;

    /// Uploads bytes into a folder and returns the id of the created object
    fn upload(&self, folder_id: &str, name_hint: &str, bytes: &[u8], media_type: &str) -> Result<String, StorageError>;

    /// Grants anyone read access to an object
    fn set_public_read(&self, object_id: &str) -> Result<(), StorageError>;

    /// Builds the public view URL of an object
    fn public_view_url(&self, object_id: &str) -> String;
}

/// Uploads images and makes them publicly readable
pub struct ImagePublisher<S: StorageProvider> {
    storage: S,
    retry: RetryPolicy,
}

impl<S: StorageProvider> ImagePublisher<S> {
    pub fn new(storage: S) -> Self {
        Self::with_retry(storage, RetryPolicy::default())
    }

    pub fn with_retry(storage: S, retry: RetryPolicy) -> Self {
        ImagePublisher { storage, retry }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the id of the named folder, creating it only when no folder of that name exists
    pub fn find_or_create_folder(&self, name: &str) -> Result<String, StorageError> {
        if let Some(folder_id) = self.storage.find_folder(name)? {
            tracing::debug!(folder = name, %folder_id, "reusing existing folder");
            return Ok(folder_id);
        }
        let folder_id = self.storage.create_folder(name)?;
        tracing::info!(folder = name, %folder_id, "created folder");
        Ok(folder_id)
    }

    /// Uploads an image, shares it publicly and returns its public view URL.
    ///
    /// Upload failures are returned as is. Sharing is retried according to the
    /// retry policy.
    pub fn publish(&self, folder_id: &str, name_hint: &str, bytes: &[u8], media_type: Option<&str>) -> Result<String, StorageError> {
        let media_type = media_type
            .filter(|kind| !kind.trim().is_empty())
            .unwrap_or(DEFAULT_MEDIA_TYPE);
        let object_id = self.storage.upload(folder_id, name_hint, bytes, media_type)?;
        self.retry.run("set_public_read", || self.storage.set_public_read(&object_id))?;
        let url = self.storage.public_view_url(&object_id);
        tracing::info!(name = name_hint, %object_id, size = bytes.len(), media_type, "published image");
        Ok(url)
    }
}
