//! Google Drive API client bound to one shared drive.

use log::debug;
use reqwest::Client;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListPage};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Metadata fields requested for every listed file.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, parents)";

/// Client for listing a Google Shared Drive.
///
/// One client exists per process; every page retrieval goes through it.
pub struct DriveClient {
    drive_id: String,
    auth: Authenticator,
    http: Client,
    base_url: String,
}

impl DriveClient {
    /// Create a new DriveClient against the public Drive API.
    ///
    /// # Arguments
    /// * `auth` - Authenticator for obtaining access tokens
    /// * `drive_id` - The ID of the Shared Drive
    pub fn new(auth: Authenticator, drive_id: String) -> Self {
        Self::with_base_url(auth, drive_id, DRIVE_API_BASE)
    }

    /// Create a client against a non-default base URL.
    pub fn with_base_url(
        auth: Authenticator,
        drive_id: String,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            drive_id,
            auth,
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Get the drive ID.
    pub fn drive_id(&self) -> &str {
        &self.drive_id
    }

    /// Fetch one page of the drive listing.
    ///
    /// Passing the continuation token from the previous page resumes the
    /// listing; `None` starts it from the beginning.
    pub async fn list_page(&self, page_token: Option<&str>) -> Result<FileListPage> {
        let token = self.auth.get_access_token().await?;

        debug!(
            "requesting files page for drive {} (continuation: {})",
            self.drive_id,
            page_token.unwrap_or("none")
        );

        let mut request = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&token)
            .query(&[
                ("driveId", self.drive_id.as_str()),
                ("corpora", "drive"),
                ("includeItemsFromAllDrives", "true"),
                ("supportsAllDrives", "true"),
                ("spaces", "drive"),
                ("fields", LIST_FIELDS),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
                return Err(DriveError::ApiError {
                    status: api_error.error.code,
                    message: api_error.error.message,
                });
            }
            return Err(DriveError::ApiError {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let page: FileListPage = response.json().await?;
        debug!(
            "received {} files (next token: {})",
            page.files.len(),
            page.next_page_token.as_deref().unwrap_or("none")
        );
        Ok(page)
    }
}
