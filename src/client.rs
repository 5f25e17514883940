//! The AnoBBS client and its retrieval / submission workflows.
//!
//! Each workflow is the same three-step composition: the gatekeeper
//! decides (before any traffic) whether the call must be authenticated,
//! the executor performs the call with bounded retries while tallying
//! bandwidth, and the payload is decoded into typed outcomes.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::multipart::Form;
use reqwest::{Request, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::bandwidth::{self, BandwidthUsage};
use crate::confirmation::interpret_reply_response;
use crate::error::ClientError;
use crate::executor;
use crate::gatekeeper;
use crate::models::{Board, Thread, RESERVED_USER_ID};
use crate::options::{RequestOptions, UserCookie};

/// Payload the thread read endpoint returns in place of an HTTP error
/// when the thread does not exist.
const THREAD_MISSING_SENTINEL: &str = "该主题不存在";

/// Construction parameters for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// API root, e.g. `https://api.example.com/`.
    pub base_url: String,
    /// Application identifier some deployments expect on read requests.
    pub appid: Option<String>,
    /// Options used when a call passes none of its own.
    pub default_options: RequestOptions,
}

/// Form payload for a reply submission.
///
/// Optional fields are sent as empty strings, which is how the server
/// spells "not set".
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub to_thread_id: u64,
    pub content: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
}

/// AnoBBS API client.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    appid: Option<String>,
    default_options: RequestOptions,
}

impl Client {
    /// Build a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse, the default
    /// options are invalid, or the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.default_options.validate()?;
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidOptions(format!("invalid base url: {e}")))?;
        // joined paths are relative to the last slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url,
            appid: config.appid,
            default_options: config.default_options,
        })
    }

    /// Whether a usable cookie would be attached for a call with these
    /// options.
    #[must_use]
    pub fn has_cookie(&self, options: Option<&RequestOptions>) -> bool {
        self.resolve_options(options).has_cookie()
    }

    /// Probe the gatekeeper decision for a thread page without fetching.
    ///
    /// # Errors
    ///
    /// Same failures as the fetch itself would raise before any traffic.
    pub fn thread_page_requires_login(
        &self,
        page: u64,
        options: Option<&RequestOptions>,
    ) -> Result<bool, ClientError> {
        gatekeeper::check_thread_access(page, self.resolve_options(options))
    }

    /// Probe the gatekeeper decision for a board page without fetching.
    ///
    /// # Errors
    ///
    /// Same failures as the fetch itself would raise before any traffic.
    pub fn board_page_requires_login(
        &self,
        page: u64,
        options: Option<&RequestOptions>,
    ) -> Result<bool, ClientError> {
        gatekeeper::check_board_access(page, self.resolve_options(options))
    }

    /// Fetch one page of a board listing.
    ///
    /// # Errors
    ///
    /// [`ClientError::Gated`] past the board gatekeeper page,
    /// [`ClientError::LoginRequired`] when authentication is needed
    /// without a cookie, plus the shared fetch failures.
    pub async fn get_board_page(
        &self,
        board_id: u64,
        page: u64,
        options: Option<&RequestOptions>,
    ) -> Result<(Board, BandwidthUsage), ClientError> {
        let options = self.resolve_options(options);
        options.validate()?;
        let with_login = gatekeeper::check_board_access(page, options)?;
        debug!(board_id, page, with_login, "fetching board page");

        let url = self.read_url(&format!("Api/showf/id/{board_id}"), page)?;
        let (result, usage) = executor::execute("get_board_page", options.max_attempts, || {
            let url = url.clone();
            async move { self.fetch_json(url, with_login, options).await }
        })
        .await;

        let board = decode_board_payload(result?)?;
        Ok((board, usage))
    }

    /// Fetch one page of a thread.
    ///
    /// With `for_analysis`, replies authored by the server's housekeeping
    /// identity are dropped from the materialized sequence so downstream
    /// analysis sees only real content.
    ///
    /// # Errors
    ///
    /// [`ClientError::LoginRequired`] when authentication is needed
    /// without a cookie, [`ClientError::ResourceNotFound`] when the
    /// server reports the thread missing, plus the shared fetch
    /// failures. Thread pages are never [`ClientError::Gated`].
    pub async fn get_thread_page(
        &self,
        thread_id: u64,
        page: u64,
        options: Option<&RequestOptions>,
        for_analysis: bool,
    ) -> Result<(Thread, BandwidthUsage), ClientError> {
        let options = self.resolve_options(options);
        options.validate()?;
        let with_login = gatekeeper::check_thread_access(page, options)?;
        debug!(thread_id, page, with_login, "fetching thread page");

        let url = self.read_url(&format!("Api/thread/id/{thread_id}"), page)?;
        let (result, usage) = executor::execute("get_thread_page", options.max_attempts, || {
            let url = url.clone();
            async move { self.fetch_json(url, with_login, options).await }
        })
        .await;

        let mut thread = decode_thread_payload(result?)?;
        if for_analysis {
            thread.retain_replies(|post| post.user_id() != RESERVED_USER_ID);
        }
        Ok((thread, usage))
    }

    /// Submit a reply to a thread.
    ///
    /// Always authenticated: the server refuses anonymous writes, so a
    /// missing cookie fails before any traffic.
    ///
    /// # Errors
    ///
    /// [`ClientError::LoginRequired`] without a cookie,
    /// [`ClientError::ReplyRejected`] when the server reports a write
    /// error, [`ClientError::UnknownResponse`] when the confirmation
    /// document is unrecognizable, plus the shared fetch failures.
    pub async fn reply_thread(
        &self,
        reply: &ReplyRequest,
        options: Option<&RequestOptions>,
    ) -> Result<BandwidthUsage, ClientError> {
        let options = self.resolve_options(options);
        options.validate()?;
        let cookie = options
            .user_cookie
            .as_ref()
            .ok_or(ClientError::LoginRequired)?;
        debug!(to_thread_id = reply.to_thread_id, "submitting reply");

        let url = self
            .base_url
            .join("Home/Forum/doReplyThread.html")
            .map_err(|e| ClientError::InvalidOptions(format!("invalid request path: {e}")))?;
        let (result, usage) = executor::execute("reply_thread", options.max_attempts, || {
            let url = url.clone();
            async move { self.submit_reply(url, reply, cookie).await }
        })
        .await;

        result?;
        Ok(usage)
    }

    fn resolve_options<'a>(&'a self, options: Option<&'a RequestOptions>) -> &'a RequestOptions {
        options.unwrap_or(&self.default_options)
    }

    fn read_url(&self, path: &str, page: u64) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidOptions(format!("invalid request path: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            if let Some(appid) = &self.appid {
                query.append_pair("appid", appid);
            }
            query.append_pair("__t", &timestamp_ms_utc8().to_string());
        }
        Ok(url)
    }

    fn build_read_request(
        &self,
        url: Url,
        with_login: bool,
        options: &RequestOptions,
    ) -> Result<Request, ClientError> {
        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "en-us");
        if with_login {
            // the gatekeeper has already verified presence
            let cookie = options
                .user_cookie
                .as_ref()
                .ok_or(ClientError::LoginRequired)?;
            builder = builder.header(COOKIE, format!("userhash={}", cookie.userhash));
        }
        Ok(builder.build()?)
    }

    /// One measured GET round trip: status checks and JSON decode
    /// included, so the executor sees every transient shape as an error
    /// it can classify.
    async fn fetch_json(
        &self,
        url: Url,
        with_login: bool,
        options: &RequestOptions,
    ) -> executor::Outcome<Value> {
        let mut usage = BandwidthUsage::default();
        let request = match self.build_read_request(url, with_login, options) {
            Ok(request) => request,
            Err(err) => return (Err(err), usage),
        };
        usage.bytes_sent = bandwidth::estimate_request_size(&request);

        let (status, headers, body) = match self.perform(request).await {
            Ok(parts) => parts,
            Err(err) => return (Err(err), usage),
        };
        usage.bytes_received = bandwidth::estimate_response_size(status, &headers, body.len());
        if let Err(err) = check_status(status) {
            return (Err(err), usage);
        }
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => (Ok(value), usage),
            Err(err) => (Err(ClientError::Decode(err)), usage),
        }
    }

    /// One measured multipart POST round trip ending in confirmation
    /// interpretation.
    async fn submit_reply(
        &self,
        url: Url,
        reply: &ReplyRequest,
        cookie: &UserCookie,
    ) -> executor::Outcome<()> {
        let mut usage = BandwidthUsage::default();
        let mut form = Form::new()
            .text("resto", reply.to_thread_id.to_string())
            .text("content", reply.content.clone())
            .text("name", reply.name.clone().unwrap_or_default())
            .text("email", reply.email.clone().unwrap_or_default())
            .text("title", reply.title.clone().unwrap_or_default());
        if let Some(appid) = &self.appid {
            form = form.text("appid", appid.clone());
        }

        let request = match self
            .http
            .post(url)
            .header(COOKIE, format!("userhash={}", cookie.userhash))
            .multipart(form)
            .build()
        {
            Ok(request) => request,
            Err(err) => return (Err(ClientError::Network(err)), usage),
        };
        // the multipart body streams, so its bytes are estimated from the
        // fields instead of read back off the request
        usage.bytes_sent = bandwidth::estimate_request_size(&request)
            + form_payload_estimate(reply, self.appid.as_deref());

        let (status, headers, body) = match self.perform(request).await {
            Ok(parts) => parts,
            Err(err) => return (Err(err), usage),
        };
        usage.bytes_received = bandwidth::estimate_response_size(status, &headers, body.len());
        if let Err(err) = check_status(status) {
            return (Err(err), usage);
        }
        let text = String::from_utf8_lossy(&body).into_owned();
        (interpret_reply_response(&text), usage)
    }

    async fn perform(
        &self,
        request: Request,
    ) -> Result<(StatusCode, HeaderMap, Vec<u8>), ClientError> {
        let response = self.http.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((status, headers, body.to_vec()))
    }
}

fn check_status(status: StatusCode) -> Result<(), ClientError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::NoPermission { status });
    }
    if !status.is_success() {
        return Err(ClientError::Http { status });
    }
    Ok(())
}

fn decode_thread_payload(payload: Value) -> Result<Thread, ClientError> {
    match payload {
        Value::String(text) if text == THREAD_MISSING_SENTINEL => {
            Err(ClientError::ResourceNotFound)
        }
        Value::Object(record) => Ok(Thread::new(record)),
        other => Err(ClientError::UnknownResponse {
            body: other.to_string(),
        }),
    }
}

fn decode_board_payload(payload: Value) -> Result<Board, ClientError> {
    match payload {
        Value::Array(items) => {
            let mut threads = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(record) => threads.push(Thread::new(record)),
                    other => {
                        return Err(ClientError::UnknownResponse {
                            body: other.to_string(),
                        })
                    }
                }
            }
            Ok(threads)
        }
        other => Err(ClientError::UnknownResponse {
            body: other.to_string(),
        }),
    }
}

/// Field bytes of the reply form; multipart framing (boundaries, part
/// headers) is not modeled.
fn form_payload_estimate(reply: &ReplyRequest, appid: Option<&str>) -> u64 {
    let mut bytes = "resto".len() + reply.to_thread_id.to_string().len();
    bytes += "content".len() + reply.content.len();
    bytes += "name".len() + reply.name.as_deref().unwrap_or("").len();
    bytes += "email".len() + reply.email.as_deref().unwrap_or("").len();
    bytes += "title".len() + reply.title.as_deref().unwrap_or("").len();
    if let Some(appid) = appid {
        bytes += "appid".len() + appid.len();
    }
    bytes as u64
}

/// Cache-busting timestamp the upstream web client sends with reads:
/// current time in milliseconds, shifted to UTC+8.
fn timestamp_ms_utc8() -> i64 {
    Utc::now().timestamp_millis() + 8 * 60 * 60 * 1000
}
