use std::path::Path;

use crate::{
    client::{ApiClient, ApiRequest, FilePart},
    error::ApiError,
    models::{AvatarResponse, Profile, ProfileUpdate},
};

/// Multipart field the backend reads the avatar from.
const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Clone)]
pub struct ProfileApi {
    client: ApiClient,
}

impl ProfileApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Profile, ApiError> {
        self.client.request(ApiRequest::get("/profile")).await
    }

    pub async fn update(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        self.client
            .request(ApiRequest::put("/profile").json(update)?)
            .await
    }

    /// Upload an image file as the new avatar.
    pub async fn upload_avatar(&self, path: &Path) -> Result<AvatarResponse, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        let part = FilePart {
            field: AVATAR_FIELD.to_string(),
            file_name,
            mime: image_mime(path).to_string(),
            bytes,
        };
        self.client
            .request(ApiRequest::post("/profile/avatar").multipart(part))
            .await
    }
}

fn image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
