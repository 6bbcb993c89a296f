//! Google Drive Remote Store
//!
//! Implements `RemoteStore` for Google Drive using the Drive API v3.
//! Authenticates with a bearer access token obtained by the `auth` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use super::http_retry::{check_status, send_with_retry, HttpRetryConfig};
use super::{FileRecord, PreviewLinks, ProgressCallback, ProviderError, RemoteStore, FOLDER_MIME_TYPE};
use crate::config::EngineConfig;

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields requested for every record
const FILE_FIELDS: &str = "id,name,mimeType,iconLink,thumbnailLink,modifiedTime,size,webViewLink,parents";

/// Resumable uploads require chunks in multiples of 256 KiB
pub const UPLOAD_CHUNK_GRANULE: usize = 256 * 1024;

/// Google Drive file metadata from API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    #[serde(default)]
    size: Option<String>,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    parents: Vec<String>,
    icon_link: Option<String>,
    thumbnail_link: Option<String>,
    web_view_link: Option<String>,
}

impl From<DriveFile> for FileRecord {
    fn from(file: DriveFile) -> Self {
        let size = file.size.as_deref().and_then(|s| s.parse().ok());
        FileRecord::new(file.id, file.name, file.mime_type)
            .with_size(size)
            .with_modified_time(file.modified_time)
            .with_parents(file.parents)
            .with_preview_links(PreviewLinks {
                icon: file.icon_link,
                thumbnail: file.thumbnail_link,
                web_view: file.web_view_link,
            })
    }
}

/// Google Drive file list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Google Drive provider configuration
#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    pub access_token: SecretString,
    pub list_page_size: u32,
    pub search_page_size: u32,
    pub upload_chunk_size: usize,
    pub retry: HttpRetryConfig,
}

impl GoogleDriveConfig {
    pub fn new(access_token: SecretString, engine: &EngineConfig) -> Self {
        Self {
            access_token,
            list_page_size: engine.list_page_size,
            search_page_size: engine.search_page_size,
            upload_chunk_size: engine.upload_chunk_size,
            retry: engine.retry.clone(),
        }
    }
}

/// Escape a value for use inside a single-quoted Drive query literal
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn parse_error(e: reqwest::Error) -> ProviderError {
    ProviderError::ParseError(e.to_string())
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<url::Url, ProviderError> {
    url::Url::parse_with_params(base, params)
        .map_err(|e| ProviderError::InvalidConfig(format!("Invalid URL {}: {}", base, e)))
}

/// Google Drive Remote Store
pub struct GoogleDriveProvider {
    config: GoogleDriveConfig,
    client: reqwest::Client,
}

impl GoogleDriveProvider {
    pub fn new(config: GoogleDriveConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Get authorization header
    fn auth_header(&self) -> Result<HeaderValue, ProviderError> {
        HeaderValue::from_str(&format!("Bearer {}", self.config.access_token.expose_secret()))
            .map_err(|e| ProviderError::AuthenticationFailed(format!("Invalid token: {}", e)))
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        Ok(builder.header(AUTHORIZATION, self.auth_header()?))
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> Result<Response, ProviderError> {
        let response = send_with_retry(self.authorized(builder)?, &self.config.retry).await?;
        check_status(response, context).await
    }

    /// Run a `files.list` query, following page tokens up to `limit` records
    async fn query_files(&self, query: &str, page_size: u32, limit: Option<usize>) -> Result<Vec<FileRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let fields = format!("files({}),nextPageToken", FILE_FIELDS);
        let page_size = page_size.to_string();

        loop {
            let mut params = vec![
                ("q", query),
                ("fields", fields.as_str()),
                ("orderBy", "folder,name"),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.as_str()));
            }

            let url = build_url(&format!("{}/files", DRIVE_API_BASE), &params)?;
            let response = self.send(self.client.get(url), "files.list").await?;
            let list: DriveFileList = response.json().await.map_err(parse_error)?;

            records.extend(list.files.into_iter().map(FileRecord::from));

            if let Some(max) = limit {
                if records.len() >= max {
                    records.truncate(max);
                    break;
                }
            }
            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(records)
    }

    async fn patch_metadata(&self, file_id: &str, body: serde_json::Value, context: &str) -> Result<(), ProviderError> {
        let url = format!("{}/files/{}", DRIVE_API_BASE, urlencoding::encode(file_id));
        self.send(self.client.patch(url).json(&body), context).await?;
        Ok(())
    }

    /// Start a resumable upload session and return its session URI
    async fn start_resumable_upload(
        &self,
        name: &str,
        mime_kind: &str,
        parent_id: &str,
        total: usize,
    ) -> Result<String, ProviderError> {
        let url = build_url(
            &format!("{}/files", UPLOAD_API_BASE),
            &[("uploadType", "resumable"), ("fields", FILE_FIELDS)],
        )?;
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_kind,
            "parents": [parent_id],
        });

        let request = self.client
            .post(url)
            .header("X-Upload-Content-Type", mime_kind)
            .header("X-Upload-Content-Length", total.to_string())
            .json(&metadata);
        let response = self.send(request, "upload session").await?;

        response.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::TransferFailed("Upload session without Location header".to_string()))
    }
}

#[async_trait]
impl RemoteStore for GoogleDriveProvider {
    fn display_name(&self) -> String {
        "Google Drive".to_string()
    }

    async fn list(&self, folder_id: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let query = format!("'{}' in parents and trashed = false", escape_query_literal(folder_id));
        let records = self.query_files(&query, self.config.list_page_size, None).await?;
        debug!("Listed {} records in {}", records.len(), folder_id);
        Ok(records)
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, ProviderError> {
        let q = format!("name contains '{}' and trashed = false", escape_query_literal(query));
        let limit = self.config.search_page_size as usize;
        self.query_files(&q, self.config.search_page_size, Some(limit)).await
    }

    async fn get(&self, file_id: &str) -> Result<FileRecord, ProviderError> {
        let url = build_url(
            &format!("{}/files/{}", DRIVE_API_BASE, urlencoding::encode(file_id)),
            &[("fields", FILE_FIELDS)],
        )?;
        let response = self.send(self.client.get(url), "files.get").await?;
        let file: DriveFile = response.json().await.map_err(parse_error)?;
        Ok(file.into())
    }

    async fn rename(&self, file_id: &str, name: &str) -> Result<(), ProviderError> {
        self.patch_metadata(file_id, serde_json::json!({ "name": name }), "rename").await?;
        info!("Renamed {} to {}", file_id, name);
        Ok(())
    }

    async fn delete(&self, file_id: &str) -> Result<(), ProviderError> {
        self.patch_metadata(file_id, serde_json::json!({ "trashed": true }), "trash").await?;
        info!("Trashed {}", file_id);
        Ok(())
    }

    async fn move_file(
        &self,
        file_id: &str,
        new_parent_id: &str,
        old_parent_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut params = vec![("addParents", new_parent_id)];
        if let Some(old) = old_parent_id {
            params.push(("removeParents", old));
        }
        let url = build_url(
            &format!("{}/files/{}", DRIVE_API_BASE, urlencoding::encode(file_id)),
            &params,
        )?;
        self.send(self.client.patch(url).json(&serde_json::json!({})), "move").await?;
        info!("Moved {} into {}", file_id, new_parent_id);
        Ok(())
    }

    async fn copy(
        &self,
        file_id: &str,
        parent_id: &str,
        name: Option<&str>,
    ) -> Result<FileRecord, ProviderError> {
        let url = build_url(
            &format!("{}/files/{}/copy", DRIVE_API_BASE, urlencoding::encode(file_id)),
            &[("fields", FILE_FIELDS)],
        )?;
        let mut body = serde_json::json!({ "parents": [parent_id] });
        if let Some(name) = name {
            body["name"] = serde_json::Value::String(name.to_string());
        }
        let response = self.send(self.client.post(url).json(&body), "copy").await?;
        let file: DriveFile = response.json().await.map_err(parse_error)?;
        info!("Copied {} into {} as {}", file_id, parent_id, file.id);
        Ok(file.into())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FileRecord, ProviderError> {
        let url = build_url(&format!("{}/files", DRIVE_API_BASE), &[("fields", FILE_FIELDS)])?;
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let response = self.send(self.client.post(url).json(&metadata), "create folder").await?;
        let file: DriveFile = response.json().await.map_err(parse_error)?;
        info!("Created folder {} in {}", name, parent_id);
        Ok(file.into())
    }

    async fn upload(
        &self,
        content: Vec<u8>,
        name: &str,
        mime_kind: &str,
        parent_id: &str,
        on_progress: ProgressCallback,
    ) -> Result<FileRecord, ProviderError> {
        let total = content.len();
        let session_uri = self.start_resumable_upload(name, mime_kind, parent_id, total).await?;
        let chunk_size = self.config.upload_chunk_size.max(UPLOAD_CHUNK_GRANULE);

        on_progress(0.0);
        let mut offset = 0usize;

        loop {
            let end = (offset + chunk_size).min(total);
            let content_range = if total == 0 {
                "bytes */0".to_string()
            } else {
                format!("bytes {}-{}/{}", offset, end - 1, total)
            };

            // Session URIs are pre-authorized; chunk bodies are not retried
            let response = self.client
                .put(&session_uri)
                .header("Content-Range", &content_range)
                .header(CONTENT_TYPE, mime_kind)
                .body(content[offset..end].to_vec())
                .send()
                .await
                .map_err(|e| ProviderError::TransferFailed(e.to_string()))?;

            let status = response.status().as_u16();

            if status == 308 {
                // Drive reports how much it kept; resume right after it
                let range = response.headers().get(RANGE).and_then(|v| v.to_str().ok());
                let stored = stored_bytes(range).min(total);
                if stored <= offset && end > offset {
                    return Err(ProviderError::TransferFailed(format!(
                        "Upload of {} made no progress at byte {}",
                        name, offset
                    )));
                }
                if stored >= total {
                    return Err(ProviderError::TransferFailed(format!(
                        "Upload of {} still incomplete after the final chunk",
                        name
                    )));
                }
                if stored < end {
                    debug!("Drive kept {} of {} bytes sent for {}", stored, end, name);
                }
                offset = stored;
                on_progress(offset as f64 / total as f64 * 100.0);
                continue;
            }

            let response = check_status(response, "upload chunk").await?;
            let file: DriveFile = response.json().await.map_err(parse_error)?;
            on_progress(100.0);
            info!("Uploaded {} ({} bytes) into {}", name, total, parent_id);
            return Ok(file.into());
        }
    }
}

/// Bytes a resumable session holds, from a 308's `Range: bytes=0-N` header.
/// No header means nothing has been stored yet.
fn stored_bytes(range: Option<&str>) -> usize {
    range
        .and_then(|r| r.trim().strip_prefix("bytes="))
        .and_then(|r| r.split_once('-'))
        .and_then(|(_, last)| last.trim().parse::<usize>().ok())
        .map_or(0, |last| last + 1)
}
