//! Google Drive v3 storage provider over blocking HTTP
use crate::storage::StorageError;
use crate::storage::StorageProvider;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;

const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const PUBLIC_VIEW_URL: &str = "https://drive.google.com/uc?export=view&id=";

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileId>,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Authorized-user token file as written by OAuth client libraries
#[derive(Deserialize)]
struct TokenFile {
    #[serde(alias = "access_token")]
    token: Option<String>,
}

/// Reads the access token from an authorized-user token file
pub fn read_token_file(path: &Path) -> Result<String, StorageError> {
    let name = path.display().to_string();
    let content = fs::read_to_string(path)
        .map_err(|error| StorageError::TokenFileError(name.to_owned(), error.to_string()))?;
    let token: TokenFile = serde_json::from_str(&content)?;
    token.token
        .filter(|token| !token.trim().is_empty())
        .ok_or(StorageError::MissingTokenError(name))
}

/// Picks the explicitly given token, falling back to the token file
pub fn resolve_access_token(explicit: Option<&str>, token_file: &Path) -> Result<String, StorageError> {
    if let Some(token) = explicit.map(str::trim).filter(|token| !token.is_empty()) {
        return Ok(token.to_owned());
    }
    if !token_file.exists() {
        return Err(StorageError::MissingTokenError(token_file.display().to_string()));
    }
    read_token_file(token_file)
}

/// Escapes a value for use inside a single-quoted Drive query string
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Search query matching a non-trashed folder with exactly this name
pub fn folder_query(name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query_value(name),
        FOLDER_MIME_TYPE
    )
}

/// Body of a `multipart/related` upload: JSON metadata followed by the media
pub fn multipart_body(boundary: &str, metadata: &serde_json::Value, bytes: &[u8], media_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {media_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Drive storage authenticated with an OAuth access token obtained out-of-band
pub struct DriveStorage {
    client: Client,
    access_token: String,
}

impl DriveStorage {
    pub fn new(access_token: String) -> Result<Self, StorageError> {
        let client = Client::builder().build()?;
        Ok(DriveStorage { client, access_token })
    }

    /// Turns an error response into a [`StorageError`], keeping the service's message when present
    fn check(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        Err(StorageError::StatusError { status: status.as_u16(), message })
    }
}

impl StorageProvider for DriveStorage {
    fn find_folder(&self, name: &str) -> Result<Option<String>, StorageError> {
        let query = folder_query(name);
        let response = self.client
            .get(FILES_ENDPOINT)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("pageSize", "10"),
                ("corpora", "user"),
                ("includeItemsFromAllDrives", "false"),
                ("supportsAllDrives", "false"),
            ])
            .send()?;
        let list: FileList = serde_json::from_str(&Self::check(response)?.text()?)?;
        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    fn create_folder(&self, name: &str) -> Result<String, StorageError> {
        let response = self.client
            .post(FILES_ENDPOINT)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id"), ("supportsAllDrives", "false")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()?;
        let file: FileId = serde_json::from_str(&Self::check(response)?.text()?)?;
        Ok(file.id)
    }

    fn upload(&self, folder_id: &str, name_hint: &str, bytes: &[u8], media_type: &str) -> Result<String, StorageError> {
        let boundary = format!("docx_photo_sheet_{}", chrono::Utc::now().timestamp_micros());
        let metadata = json!({ "name": name_hint, "parents": [folder_id] });
        let response = self.client
            .post(UPLOAD_ENDPOINT)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(multipart_body(&boundary, &metadata, bytes, media_type))
            .send()?;
        let file: FileId = serde_json::from_str(&Self::check(response)?.text()?)?;
        Ok(file.id)
    }

    fn set_public_read(&self, object_id: &str) -> Result<(), StorageError> {
        let response = self.client
            .post(format!("{FILES_ENDPOINT}/{object_id}/permissions"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn public_view_url(&self, object_id: &str) -> String {
        format!("{PUBLIC_VIEW_URL}{object_id}")
    }
}
