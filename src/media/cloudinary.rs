//! Cloudinary-backed [`MediaStore`].
//!
//! Uploads use an unsigned preset so no API secret ever reaches this service's
//! players; deletion uses the short-lived `delete_token` returned by the
//! upload (falling back to the public id when the preset does not return one).

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;

use super::{MediaError, MediaResult, MediaStore, StoredMedia};

const CLOUD_NAME_ENV: &str = "CLOUDINARY_CLOUD_NAME";
const UPLOAD_PRESET_ENV: &str = "CLOUDINARY_UPLOAD_PRESET";

/// Media store talking to the Cloudinary image API.
#[derive(Clone)]
pub struct CloudinaryMediaStore {
    client: Client,
    cloud_name: Arc<str>,
    upload_preset: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    delete_token: Option<String>,
}

impl CloudinaryMediaStore {
    /// Build the store from explicit settings.
    pub fn new(cloud_name: String, upload_preset: String) -> MediaResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| MediaError::ClientBuilder { source })?;

        Ok(Self {
            client,
            cloud_name: Arc::from(cloud_name.as_str()),
            upload_preset: Arc::from(upload_preset.as_str()),
        })
    }

    /// Build the store from `CLOUDINARY_CLOUD_NAME` / `CLOUDINARY_UPLOAD_PRESET`.
    pub fn from_env() -> MediaResult<Self> {
        let cloud_name = std::env::var(CLOUD_NAME_ENV)
            .map_err(|_| MediaError::MissingEnvVar { var: CLOUD_NAME_ENV })?;
        let upload_preset = std::env::var(UPLOAD_PRESET_ENV).map_err(|_| {
            MediaError::MissingEnvVar {
                var: UPLOAD_PRESET_ENV,
            }
        })?;
        Self::new(cloud_name, upload_preset)
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.cloud_name, action
        )
    }

    async fn do_upload(&self, bytes: Vec<u8>, filename: String) -> MediaResult<StoredMedia> {
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename))
            .text("upload_preset", self.upload_preset.to_string());

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|source| MediaError::RequestSend { source })?;

        if !response.status().is_success() {
            return Err(MediaError::RequestStatus {
                status: response.status(),
            });
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|source| MediaError::DecodeResponse { source })?;

        let delete_handle = payload.delete_token.unwrap_or(payload.public_id);
        Ok(StoredMedia {
            url: payload.secure_url,
            delete_handle,
        })
    }

    async fn do_delete(&self, delete_handle: String) -> MediaResult<()> {
        let response = self
            .client
            .post(self.endpoint("delete_by_token"))
            .json(&serde_json::json!({ "token": delete_handle }))
            .send()
            .await
            .map_err(|source| MediaError::RequestSend { source })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MediaError::RequestStatus {
                status: response.status(),
            })
        }
    }
}

impl MediaStore for CloudinaryMediaStore {
    fn upload(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> BoxFuture<'static, MediaResult<StoredMedia>> {
        let store = self.clone();
        Box::pin(async move { store.do_upload(bytes, filename).await })
    }

    fn delete(&self, delete_handle: String) -> BoxFuture<'static, MediaResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.do_delete(delete_handle).await })
    }
}
