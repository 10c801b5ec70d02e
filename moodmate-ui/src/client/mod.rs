//! HTTP client for the MoodMate classification backend
//!
//! One method per backend endpoint. Every call is a single attempt: there
//! are no retries, and a failure is returned to the handler that triggered
//! it so the page can report it.

pub mod frames;
pub mod upload;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use moodmate_common::api::{
    parse_label_body, AuthResponse, Recommendation, SigninForm, SignupForm, TextClassification,
    TextClassificationRequest, TextModel, UserProfile,
};

pub use frames::{AbortNotifier, JpegFrameAssembler};
pub use upload::{Upload, UploadKind};

const USER_AGENT: &str = concat!("MoodMate/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Backend endpoints, used to label errors and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    TextClassification,
    AudioClassification,
    UploadVideo,
    VideoFeed,
    Stop,
    Recommend,
    Signin,
    Signup,
    Clear,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::TextClassification => "/text_classification",
            Endpoint::AudioClassification => "/audio_classification",
            Endpoint::UploadVideo => "/upload_video",
            Endpoint::VideoFeed => "/video_feed",
            Endpoint::Stop => "/stop",
            Endpoint::Recommend => "/recommend",
            Endpoint::Signin => "/signin",
            Endpoint::Signup => "/signup",
            Endpoint::Clear => "/clear",
        }
    }

    /// Message shown when the endpoint answers with an unexpected status
    pub fn failure_message(self) -> &'static str {
        match self {
            Endpoint::TextClassification => "Error in classifying your text. Please try again later.",
            Endpoint::AudioClassification => "Error in classification. Please try again.",
            Endpoint::UploadVideo => "Failed to process the video. Please try again.",
            Endpoint::VideoFeed => "Failed to connect to the webcam feed.",
            Endpoint::Stop => "Failed to stop the webcam or retrieve emotion data.",
            Endpoint::Recommend => "Error in fetching recommendations. Please try again.",
            Endpoint::Signin => "Invalid email or password.",
            Endpoint::Signup => "An error occurred during signup. Please try again.",
            Endpoint::Clear => "Failed to end the session on the server.",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Backend client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got an HTTP answer (connect, timeout, broken body)
    #[error("Network error calling {endpoint}: {message}")]
    Transport { endpoint: Endpoint, message: String },

    /// The backend answered with a status other than 200
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    /// `/signup` rejected an email that is already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// The body did not have the expected shape
    #[error("Could not decode {endpoint} response: {message}")]
    Decode { endpoint: Endpoint, message: String },

    /// The request could not be built (bad upload, bad base URL)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    fn transport(endpoint: Endpoint, err: impl fmt::Display) -> Self {
        ClientError::Transport {
            endpoint,
            message: err.to_string(),
        }
    }

    fn decode(endpoint: Endpoint, err: impl fmt::Display) -> Self {
        ClientError::Decode {
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            ClientError::Transport { endpoint, .. }
            | ClientError::Status { endpoint, .. }
            | ClientError::Decode { endpoint, .. } => Some(*endpoint),
            ClientError::DuplicateEmail => Some(Endpoint::Signup),
            ClientError::InvalidRequest(_) => None,
        }
    }

    /// Text for the page that triggered the call
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport { endpoint, message } => match endpoint {
                Endpoint::VideoFeed => format!("Failed to connect to the webcam feed: {}", message),
                Endpoint::UploadVideo => format!("Failed to upload the video: {}", message),
                Endpoint::Stop => format!("Failed to send stop request: {}", message),
                _ => format!("An error occurred: {}", message),
            },
            ClientError::Status { endpoint, .. } | ClientError::Decode { endpoint, .. } => {
                endpoint.failure_message().to_string()
            }
            ClientError::DuplicateEmail => {
                "Email already exists. Please use a different email.".to_string()
            }
            ClientError::InvalidRequest(message) => message.clone(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client for the classification/recommendation backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl BackendClient {
    /// `base_url` must already be validated (no trailing slash)
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ClientResult<Self> {
        // No client-wide timeout: it would also cut off the live video feed.
        // Ordinary requests get `request_timeout` individually.
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Send, map transport failures, and require HTTP 200
    async fn send(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<reqwest::Response> {
        debug!(endpoint = %endpoint, url = %self.url(endpoint), "Calling backend");

        let response = request.send().await.map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Backend unreachable");
            ClientError::transport(endpoint, e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(endpoint = %endpoint, status = status.as_u16(), "Backend returned error status");
            if endpoint == Endpoint::Signup && status == StatusCode::BAD_REQUEST {
                return Err(ClientError::DuplicateEmail);
            }
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn send_for_label(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<String> {
        let response = self.send(endpoint, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(endpoint, e))?;
        let label = parse_label_body(&body);
        if label.is_empty() {
            return Err(ClientError::decode(endpoint, "empty label"));
        }
        info!(endpoint = %endpoint, label = %label, "Backend classified input");
        Ok(label.to_string())
    }

    async fn send_for_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send(endpoint, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::decode(endpoint, e))
    }

    /// `POST /text_classification`
    pub async fn classify_text(
        &self,
        input_text: &str,
        model: TextModel,
        email: &str,
    ) -> ClientResult<TextClassification> {
        let endpoint = Endpoint::TextClassification;
        let form = TextClassificationRequest {
            input_text: input_text.to_string(),
            model_select: model,
            email: email.to_string(),
        };
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .form(&form);

        let result: TextClassification = self.send_for_json(endpoint, request).await?;
        info!(endpoint = %endpoint, pred = %result.pred, model = %model, "Text classified");
        Ok(result)
    }

    /// `POST /audio_classification`, returns the raw label
    pub async fn classify_audio(&self, upload: Upload) -> ClientResult<String> {
        let endpoint = Endpoint::AudioClassification;
        let form = upload.into_form("audio_file")?;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .multipart(form);
        self.send_for_label(endpoint, request).await
    }

    /// `POST /upload_video`, returns the raw label aggregated over the video
    pub async fn classify_video(&self, upload: Upload) -> ClientResult<String> {
        let endpoint = Endpoint::UploadVideo;
        let form = upload.into_form("file")?;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .multipart(form);
        self.send_for_label(endpoint, request).await
    }

    /// `POST /stop`, returns the raw label aggregated over the live session
    pub async fn stop_live(&self) -> ClientResult<String> {
        let endpoint = Endpoint::Stop;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout);
        self.send_for_label(endpoint, request).await
    }

    /// `POST /recommend?emotion=...` with the profile as JSON body
    pub async fn recommend(
        &self,
        profile: &UserProfile,
        emotion: &str,
    ) -> ClientResult<Recommendation> {
        let endpoint = Endpoint::Recommend;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .query(&[("emotion", emotion)])
            .json(profile);
        self.send_for_json(endpoint, request).await
    }

    /// `POST /signin`, returns the user's profile
    pub async fn sign_in(&self, form: &SigninForm) -> ClientResult<UserProfile> {
        let endpoint = Endpoint::Signin;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .form(form);
        let auth: AuthResponse = self.send_for_json(endpoint, request).await?;
        Ok(auth.user_data)
    }

    /// `POST /signup`, returns the new user's profile
    pub async fn sign_up(&self, form: &SignupForm) -> ClientResult<UserProfile> {
        let endpoint = Endpoint::Signup;
        let request = self
            .http
            .post(self.url(endpoint))
            .timeout(self.request_timeout)
            .form(form);
        let auth: AuthResponse = self.send_for_json(endpoint, request).await?;
        Ok(auth.user_data)
    }

    /// `GET /clear`
    pub async fn clear_session(&self) -> ClientResult<()> {
        let endpoint = Endpoint::Clear;
        let request = self
            .http
            .get(self.url(endpoint))
            .timeout(self.request_timeout);
        self.send(endpoint, request).await?;
        Ok(())
    }

    /// `GET /video_feed` as a stream of JPEG frames
    ///
    /// The stream ends when the backend closes the feed, on a transport
    /// error, or when `cancel` fires. If the consumer drops the stream while
    /// it is still running, `POST /stop` is sent in the background so the
    /// backend releases the camera. Cancelling through `cancel` means the
    /// caller takes care of stopping and no request is sent.
    pub async fn live_feed(
        &self,
        cancel: CancellationToken,
    ) -> ClientResult<impl Stream<Item = ClientResult<Bytes>> + Send + 'static> {
        let client = self.clone();
        self.live_feed_with_abort(cancel, move || client.spawn_stop_after_abort())
            .await
    }

    /// Like [`live_feed`](Self::live_feed), but `on_abort` decides how the
    /// backend is stopped when the stream is dropped mid-flight
    ///
    /// `on_abort` runs inside `Drop`, so it must not block. It is skipped
    /// when `cancel` has already fired.
    pub async fn live_feed_with_abort<F>(
        &self,
        cancel: CancellationToken,
        on_abort: F,
    ) -> ClientResult<impl Stream<Item = ClientResult<Bytes>> + Send + 'static>
    where
        F: FnOnce() + Send + 'static,
    {
        let endpoint = Endpoint::VideoFeed;
        // No per-request timeout: the feed runs until stopped
        let response = self.send(endpoint, self.http.get(self.url(endpoint))).await?;
        info!("Live video feed connected");

        let cancelled = cancel.clone();
        let notifier = AbortNotifier::new(move || {
            if !cancelled.is_cancelled() {
                on_abort();
            }
        });
        Ok(frames::frame_stream(response.bytes_stream(), cancel, notifier))
    }

    fn spawn_stop_after_abort(self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("Live feed aborted outside a runtime; backend not notified");
            return;
        };
        handle.spawn(async move {
            match self.stop_live().await {
                Ok(label) => info!(label = %label, "Backend stopped after live feed was aborted"),
                Err(e) => warn!(error = %e, "Could not stop backend after live feed was aborted"),
            }
        });
    }
}
