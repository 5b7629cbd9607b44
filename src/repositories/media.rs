use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Url;
use serde::Deserialize;

/// Hosted image storage: takes a file, returns a public URL for it.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, anyhow::Error>;
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

pub struct CloudinaryClient {
    upload_url: String,
    upload_preset: String,
    client: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(upload_url: String, upload_preset: String) -> Self {
        Self {
            upload_url,
            upload_preset,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, anyhow::Error> {
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            )
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Upload failed: {}", response.status()));
        }

        let uploaded: UploadResponse = response.json().await?;
        log::info!("Uploaded {} to {}", file_name, uploaded.secure_url);

        Ok(uploaded.secure_url)
    }
}

/// Payload encoded into a reward's QR code; vendors scan it to identify the redemption.
pub fn reward_qr_payload(user_reward_id: &str) -> String {
    format!("USER_REWARD_ID::{}", user_reward_id)
}

/// Address of a 200x200 QR image for `user_reward_id` on the rendering service.
pub fn reward_qr_url(base_url: &str, user_reward_id: &str) -> Result<String, anyhow::Error> {
    let url = Url::parse_with_params(
        base_url,
        &[
            ("size", "200x200".to_string()),
            ("data", reward_qr_payload(user_reward_id)),
        ],
    )?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_url_encodes_payload() {
        let url = reward_qr_url("https://api.qrserver.com/v1/create-qr-code/", "42").unwrap();
        assert_eq!(
            url,
            "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=USER_REWARD_ID%3A%3A42"
        );
    }

    #[test]
    fn qr_url_rejects_relative_base() {
        assert!(reward_qr_url("not a url", "42").is_err());
    }
}
