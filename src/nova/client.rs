use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::error::ApiError;
use super::types::{
    CalibrationRecord, ImageKind, LoginRequest, LoginResponse, ObjectsResponse, STATUS_SUCCESS,
    StatusSnapshot, UploadRequest, UploadResponse,
};
use crate::credentials::Session;

pub const API_URL: &str = "http://nova.astrometry.net/api/";
pub const SITE_URL: &str = "http://nova.astrometry.net/";

/// The operations the lifecycle driver needs from the plate-solving service.
///
/// Implemented by [`NovaClient`] over HTTP and by in-memory doubles in tests.
#[allow(async_fn_in_trait)]
pub trait NovaApi {
    /// Exchange an API key for a session.
    async fn login(&self, api_key: &str) -> Result<Session, ApiError>;

    /// Upload `file` under `display_name`, returning the submission id.
    async fn upload(
        &self,
        session: &Session,
        file: &Path,
        display_name: &str,
    ) -> Result<String, ApiError>;

    async fn check_status(&self, submission_id: &str) -> Result<StatusSnapshot, ApiError>;

    async fn fetch_calibration(&self, job_id: &str) -> Result<CalibrationRecord, ApiError>;

    async fn fetch_objects(&self, job_id: &str) -> Result<Vec<String>, ApiError>;

    /// Download a rendered image to `dest`, retrying once on any failure.
    async fn download_image(
        &self,
        job_id: &str,
        kind: ImageKind,
        dest: &Path,
    ) -> Result<(), ApiError>;
}

/// Endpoints and timings for [`NovaClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub site_url: String,
    pub download_retry_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            site_url: SITE_URL.to_string(),
            download_retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

pub struct NovaClient {
    client: Client,
    api_url: String,
    site_url: String,
    download_retry_delay: Duration,
}

impl NovaClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: with_trailing_slash(settings.api_url),
            site_url: with_trailing_slash(settings.site_url),
            download_retry_delay: settings.download_retry_delay,
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        context: &'static str,
    ) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        read_json(response, context).await
    }

    async fn fetch_image_once(&self, url: &str, dest: &Path) -> Result<(), ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(%url, bytes = bytes.len(), dest = %dest.display(), "image saved");
        Ok(())
    }
}

impl NovaApi for NovaClient {
    async fn login(&self, api_key: &str) -> Result<Session, ApiError> {
        let json = serde_json::to_string(&LoginRequest {
            apikey: api_key.to_string(),
        })
        .map_err(ApiError::Encode)?;

        let response = self
            .client
            .post(self.api("login"))
            .form(&[("request-json", json)])
            .send()
            .await?;
        let body: LoginResponse = read_json(response, "login").await?;

        match body.session {
            Some(session) if body.status == STATUS_SUCCESS => {
                info!("login succeeded");
                Ok(Session::new(session))
            }
            _ => Err(ApiError::Authentication {
                status: body.status,
                message: body
                    .errormessage
                    .or(body.message)
                    .unwrap_or_else(|| "no session returned".to_string()),
            }),
        }
    }

    async fn upload(
        &self,
        session: &Session,
        file: &Path,
        display_name: &str,
    ) -> Result<String, ApiError> {
        let is_file = tokio::fs::metadata(file)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ApiError::FileNotFound(file.to_path_buf()));
        }
        let bytes = tokio::fs::read(file).await?;

        let json = serde_json::to_string(&UploadRequest::new(session.as_str()))
            .map_err(ApiError::Encode)?;
        let form = Form::new()
            .part("request-json", Part::text(json).mime_str("text/plain")?)
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(format!("{display_name}.jpg"))
                    .mime_str("application/octet-stream")?,
            );

        info!(file = %file.display(), "uploading");
        let response = self
            .client
            .post(self.api("upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = read_json(response, "upload").await?;

        match body.subid {
            Some(subid) if body.status == STATUS_SUCCESS => Ok(subid.to_string()),
            _ => Err(ApiError::Upload {
                status: body.status,
                message: body
                    .errormessage
                    .unwrap_or_else(|| "no submission id returned".to_string()),
            }),
        }
    }

    async fn check_status(&self, submission_id: &str) -> Result<StatusSnapshot, ApiError> {
        self.get_json(&self.api(&format!("submissions/{submission_id}")), "status")
            .await
    }

    async fn fetch_calibration(&self, job_id: &str) -> Result<CalibrationRecord, ApiError> {
        self.get_json(&self.api(&format!("jobs/{job_id}/calibration/")), "calibration")
            .await
    }

    async fn fetch_objects(&self, job_id: &str) -> Result<Vec<String>, ApiError> {
        let body: ObjectsResponse = self
            .get_json(&self.api(&format!("jobs/{job_id}/objects_in_field/")), "objects")
            .await?;
        Ok(body.objects_in_field)
    }

    async fn download_image(
        &self,
        job_id: &str,
        kind: ImageKind,
        dest: &Path,
    ) -> Result<(), ApiError> {
        let url = format!("{}{kind}/{job_id}", self.site_url);
        match self.fetch_image_once(&url, dest).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    %url,
                    error = %err,
                    delay_ms = self.download_retry_delay.as_millis() as u64,
                    "image download failed, retrying once"
                );
                sleep(self.download_retry_delay).await;
                self.fetch_image_once(&url, dest).await
            }
        }
    }
}

/// Checks the HTTP status, then parses the body, logging it verbatim on failure.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &'static str,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::HttpStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| {
        error!(context, %body, "failed to deserialize response");
        ApiError::Deserialization {
            context,
            body,
            source,
        }
    })
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
