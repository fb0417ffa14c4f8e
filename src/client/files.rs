//! Session file endpoints: `/api/files`.
//!
//! Uploaded files are attached to the next message sent in the session.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::debug;

use super::{ChatClient, ClientError};
use crate::models::ChatMessageFile;

const FILES: &str = "files";

impl ChatClient {
    /// Files uploaded in the current session.
    pub async fn files_list(&self) -> Result<Vec<ChatMessageFile>, ClientError> {
        self.get_json(&[FILES]).await
    }

    /// Upload one file as the multipart field `files`.
    ///
    /// The backend answers with an empty body; the returned metadata is what
    /// was sent. Uploads are not replayed after a token refresh.
    pub async fn files_upload(
        &self,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ChatMessageFile, ClientError> {
        let url = self.endpoint(&[FILES])?;
        debug!(%url, name, mime_type, size = data.len(), "Uploading file");
        let part = Part::bytes(data)
            .file_name(name.to_string())
            .mime_str(mime_type)?;
        let form = Form::new().part("files", part);
        self.send(self.request(Method::POST, url).multipart(form))
            .await?;
        Ok(ChatMessageFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            url: None,
        })
    }

    /// Read a local file and upload it under its file name, guessing the
    /// MIME type from the extension.
    pub async fn files_upload_path(&self, path: &Path) -> Result<ChatMessageFile, ClientError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::File {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();
        self.files_upload(&name, mime_type.essence_str(), data).await
    }

    pub async fn files_delete(&self, name: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&[FILES, name])?;
        debug!(%url, "Deleting file");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
