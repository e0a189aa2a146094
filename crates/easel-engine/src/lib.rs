use std::env;
use std::io::Cursor;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use easel_contracts::events::{EventLog, EventPayload};
use easel_contracts::visuals::{
    Credential, FileDescriptor, GenerationRequest, ImageAsset, Job, JobStatus,
};
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://api.napkin.ai/api/v1";
const API_BASE_ENV: &str = "NAPKIN_API_BASE";
const API_KEY_ENV: &str = "NAPKIN_API_KEY";
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Everything that can end a submission. Each variant keeps the raw provider
/// response body when one was available; nothing here retries.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{context}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider rejected the credential format (401). Distinct from
    /// other HTTP failures so a caller can retry with a different
    /// [`AuthScheme`].
    #[error("credential rejected (401): {body}")]
    Unauthorized { body: String },
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected provider payload: {message}")]
    MalformedResponse { message: String },
    #[error("job {job_id} failed: {detail}")]
    JobFailed { job_id: String, detail: String },
    #[error("gave up polling job {job_id} after {waited_secs:.1}s")]
    PollTimeout { job_id: String, waited_secs: f64 },
    #[error("progress event write failed: {message}")]
    ProgressLog { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// True when any error in the chain is a 401 credential rejection. Lets the
/// CLI suggest switching `--auth` without unwrapping the whole chain.
pub fn is_credential_rejection(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<WorkflowError>(),
            Some(WorkflowError::Unauthorized { .. })
        )
    })
}

/// How the credential is placed on a request. The provider's real scheme is
/// not reliably documented, so the placement stays selectable independently
/// of the payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    #[default]
    Bearer,
    ApiKeyHeader,
    AccountHeader,
}

impl AuthScheme {
    /// Header name and value for this scheme. Pure: the same credential and
    /// scheme always produce the same header.
    pub fn header(self, credential: &Credential) -> (HeaderName, String) {
        match self {
            AuthScheme::Bearer => (AUTHORIZATION, format!("Bearer {}", credential.as_str())),
            AuthScheme::ApiKeyHeader => (
                HeaderName::from_static("x-api-key"),
                credential.as_str().to_string(),
            ),
            AuthScheme::AccountHeader => (
                HeaderName::from_static("napkin-account-api-key"),
                credential.as_str().to_string(),
            ),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "bearer",
            AuthScheme::ApiKeyHeader => "api-key",
            AuthScheme::AccountHeader => "account",
        }
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "api-key" | "api_key" | "x-api-key" => Ok(AuthScheme::ApiKeyHeader),
            "account" | "account-key" => Ok(AuthScheme::AccountHeader),
            other => Err(format!(
                "unknown auth scheme '{other}' (expected bearer, api-key, or account)"
            )),
        }
    }
}

/// One backend able to run the submit → status → fetch workflow.
pub trait VisualProvider: Send + Sync {
    fn name(&self) -> &str;
    fn submit(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
    ) -> Result<Job, WorkflowError>;
    fn status(&self, credential: &Credential, job_id: &str) -> Result<Job, WorkflowError>;
    fn fetch(
        &self,
        credential: &Credential,
        file: &FileDescriptor,
    ) -> Result<ImageAsset, WorkflowError>;
}

/// HTTP client for the visual-generation API.
///
/// Every outbound call (create, status, download) is authorized through the
/// single [`NapkinProvider::authorize`] path, so the three steps cannot
/// drift apart in credential treatment.
pub struct NapkinProvider {
    api_base: String,
    auth: AuthScheme,
    http: HttpClient,
}

impl NapkinProvider {
    pub fn new(auth: AuthScheme) -> Self {
        let api_base = non_empty_env(API_BASE_ENV)
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::with_api_base(api_base, auth)
    }

    pub fn with_api_base(api_base: impl Into<String>, auth: AuthScheme) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth,
            http: HttpClient::new(),
        }
    }

    pub fn credential_from_env() -> Option<Credential> {
        non_empty_env(API_KEY_ENV).map(Credential::new)
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth
    }

    fn create_endpoint(&self) -> String {
        format!("{}/create-visual-request", self.api_base)
    }

    fn status_endpoint(&self, job_id: &str) -> String {
        format!("{}/visual-request/{}/status", self.api_base, job_id)
    }

    fn download_endpoint(&self, visual_id: &str) -> String {
        format!("{}/visual/{}/file", self.api_base, visual_id)
    }

    fn authorize(&self, builder: RequestBuilder, credential: &Credential) -> RequestBuilder {
        let (name, value) = self.auth.header(credential);
        builder.header(name, value)
    }
}

impl VisualProvider for NapkinProvider {
    fn name(&self) -> &str {
        "napkin"
    }

    fn submit(
        &self,
        credential: &Credential,
        request: &GenerationRequest,
    ) -> Result<Job, WorkflowError> {
        let endpoint = self.create_endpoint();
        let body = submission_body(request);
        let response = self
            .authorize(self.http.post(&endpoint), credential)
            .json(&body)
            .send()
            .map_err(|source| WorkflowError::Network {
                context: format!("create request failed ({endpoint})"),
                source,
            })?;
        let payload = response_json_or_error(response)?;
        let id = extract_job_id(&payload).ok_or_else(|| WorkflowError::MalformedResponse {
            message: format!(
                "creation payload carries no job identifier: {}",
                truncate_text(&payload.to_string(), 160)
            ),
        })?;
        let mut job = Job::new(id);
        if let Some(status) = payload.get("status").and_then(Value::as_str) {
            job.status = JobStatus::parse(status);
        }
        Ok(job)
    }

    fn status(&self, credential: &Credential, job_id: &str) -> Result<Job, WorkflowError> {
        let endpoint = self.status_endpoint(job_id);
        let response = self
            .authorize(self.http.get(&endpoint), credential)
            .send()
            .map_err(|source| WorkflowError::Network {
                context: format!("status request failed ({endpoint})"),
                source,
            })?;
        let payload = response_json_or_error(response)?;
        let status_raw = payload.get("status").and_then(Value::as_str).ok_or_else(|| {
            WorkflowError::MalformedResponse {
                message: format!(
                    "status payload carries no status field: {}",
                    truncate_text(&payload.to_string(), 160)
                ),
            }
        })?;
        let mut job = Job::new(job_id);
        job.status = JobStatus::parse(status_raw);
        job.files = collect_file_descriptors(&payload);
        if matches!(job.status, JobStatus::Failed | JobStatus::Unknown) {
            job.detail = Some(truncate_text(&payload.to_string(), ERROR_BODY_MAX_CHARS));
        }
        Ok(job)
    }

    fn fetch(
        &self,
        credential: &Credential,
        file: &FileDescriptor,
    ) -> Result<ImageAsset, WorkflowError> {
        let url = match (&file.url, &file.visual_id) {
            (Some(url), _) => url.clone(),
            (None, Some(visual_id)) => self.download_endpoint(visual_id),
            (None, None) => {
                return Err(WorkflowError::MalformedResponse {
                    message: "file descriptor carries neither url nor visual id".to_string(),
                })
            }
        };
        let response = self
            .authorize(self.http.get(&url), credential)
            .send()
            .map_err(|source| WorkflowError::Network {
                context: format!("download failed ({url})"),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(http_failure(status, body));
        }
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|source| WorkflowError::Network {
                context: format!("reading download body failed ({url})"),
                source,
            })?
            .to_vec();
        Ok(ImageAsset { bytes, mime_type })
    }
}

/// Offline provider: completes immediately and fabricates a deterministic
/// solid-color PNG from the prompt hash. Lets the whole workflow run without
/// a credential or network.
pub struct DryrunProvider;

impl VisualProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn submit(
        &self,
        _credential: &Credential,
        request: &GenerationRequest,
    ) -> Result<Job, WorkflowError> {
        let id = format!(
            "dryrun-{}x{}-{}",
            request.width,
            request.height,
            short_id(&request.prompt)
        );
        Ok(Job::new(id))
    }

    fn status(&self, _credential: &Credential, job_id: &str) -> Result<Job, WorkflowError> {
        let mut job = Job::new(job_id);
        job.status = JobStatus::Complete;
        job.files = vec![FileDescriptor::from_visual_id(job_id)];
        Ok(job)
    }

    fn fetch(
        &self,
        _credential: &Credential,
        file: &FileDescriptor,
    ) -> Result<ImageAsset, WorkflowError> {
        let visual_id =
            file.visual_id
                .as_deref()
                .ok_or_else(|| WorkflowError::MalformedResponse {
                    message: "dryrun descriptor carries no visual id".to_string(),
                })?;
        let (width, height) = parse_dryrun_dims(visual_id);
        let (r, g, b) = color_from_seed(visual_id.as_bytes());
        let mut canvas = RgbImage::new(width, height);
        for pixel in canvas.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| WorkflowError::Internal {
                message: format!("dryrun encode failed: {err}"),
            })?;
        Ok(ImageAsset {
            bytes,
            mime_type: Some("image/png".to_string()),
        })
    }
}

/// JSON body for the creation call. Pure: the same request always serializes
/// to the same body, and unset optional fields are omitted entirely.
pub fn submission_body(request: &GenerationRequest) -> Value {
    let mut body = map_object(json!({
        "prompt": request.prompt,
        "width": request.width,
        "height": request.height,
        "format": request.output_format,
        "transparent_background": request.transparent_background,
    }));
    insert_optional(&mut body, "language", request.language.as_deref());
    insert_optional(&mut body, "style_id", request.style_id.as_deref());
    insert_optional(&mut body, "context_before", request.context_before.as_deref());
    insert_optional(&mut body, "context_after", request.context_after.as_deref());
    insert_optional(&mut body, "visual_type", request.visual_type.as_deref());
    insert_optional(
        &mut body,
        "background_color",
        request.background_color.as_deref(),
    );
    insert_optional(&mut body, "color_theme", request.color_theme.as_deref());
    Value::Object(body)
}

/// Fixed-interval polling knobs. Clamped to the ranges the provider tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    pub fn new(interval_secs: f64, timeout_secs: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(interval_secs.clamp(0.2, 30.0)),
            timeout: Duration::from_secs_f64(timeout_secs.clamp(10.0, 600.0)),
        }
    }
}

/// What the poll loop should do after one status reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Succeeded,
    Failed,
}

/// Pure decision function of the poller: status in, next action out.
/// Unknown statuses stay pollable; only complete and failed stop the loop.
pub fn poll_step(job: &Job) -> PollStep {
    match job.status {
        JobStatus::Complete => PollStep::Succeeded,
        JobStatus::Failed => PollStep::Failed,
        JobStatus::Pending | JobStatus::Running | JobStatus::Unknown => PollStep::Continue,
    }
}

/// How a poll loop ended. Timing out is the client giving up, not the
/// provider declaring failure, so it is its own variant.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(Job),
    Failed(Job),
    TimedOut { job: Job, waited: Duration },
}

/// Poll the status endpoint at a fixed interval until terminal or timeout.
/// Transport errors abort immediately rather than masking a persistent
/// failure behind retries.
pub fn poll_until_terminal(
    provider: &dyn VisualProvider,
    credential: &Credential,
    job: &Job,
    policy: PollPolicy,
    events: Option<&EventLog>,
) -> Result<PollOutcome, WorkflowError> {
    let started = Instant::now();
    let mut current = job.clone();
    loop {
        current = provider.status(credential, &current.id)?;
        if let Some(events) = events {
            events
                .emit(
                    "status_polled",
                    map_object(json!({
                        "job_id": current.id.as_str(),
                        "status": current.status.to_string(),
                    })),
                )
                .map_err(|err| WorkflowError::ProgressLog {
                    message: err.to_string(),
                })?;
        }
        match poll_step(&current) {
            PollStep::Succeeded => return Ok(PollOutcome::Completed(current)),
            PollStep::Failed => return Ok(PollOutcome::Failed(current)),
            PollStep::Continue => {}
        }
        if started.elapsed() >= policy.timeout {
            let waited = started.elapsed();
            return Ok(PollOutcome::TimedOut {
                job: current,
                waited,
            });
        }
        thread::sleep(policy.interval);
    }
}

/// Explicit per-session context for the three-step workflow. Owns the
/// credential, the provider, the last job, and the last downloaded asset;
/// there is no ambient state anywhere else.
pub struct WorkflowSession {
    credential: Credential,
    provider: Box<dyn VisualProvider>,
    policy: PollPolicy,
    events: Option<EventLog>,
    last_job: Option<Job>,
    last_asset: Option<ImageAsset>,
}

impl WorkflowSession {
    pub fn new(credential: Credential, provider: Box<dyn VisualProvider>) -> Self {
        Self {
            credential,
            provider,
            policy: PollPolicy::default(),
            events: None,
            last_job: None,
            last_asset: None,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn last_job(&self) -> Option<&Job> {
        self.last_job.as_ref()
    }

    pub fn last_asset(&self) -> Option<&ImageAsset> {
        self.last_asset.as_ref()
    }

    /// Resume work on a job identifier obtained earlier, without
    /// resubmitting. The next `poll`/`fetch` picks up from here.
    pub fn attach_job(&mut self, job_id: impl Into<String>) -> &Job {
        self.last_job.insert(Job::new(job_id))
    }

    pub fn submit(&mut self, request: &GenerationRequest) -> anyhow::Result<&Job> {
        let job = self
            .provider
            .submit(&self.credential, request)
            .context("job submission failed")?;
        self.emit(
            "job_submitted",
            map_object(json!({
                "job_id": job.id.as_str(),
                "provider": self.provider.name(),
            })),
        )?;
        Ok(self.last_job.insert(job))
    }

    /// One status reading for the current job.
    pub fn refresh(&mut self) -> anyhow::Result<&Job> {
        let job = self
            .last_job
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no job to check; submit or attach one first"))?;
        let updated = self
            .provider
            .status(&self.credential, &job.id)
            .with_context(|| format!("status check for job {} failed", job.id))?;
        self.emit(
            "status_polled",
            map_object(json!({
                "job_id": updated.id.as_str(),
                "status": updated.status.to_string(),
            })),
        )?;
        Ok(self.last_job.insert(updated))
    }

    /// Poll until terminal or timeout. The job stays attached whatever the
    /// outcome, so a timed-out poll can be resumed.
    pub fn poll(&mut self) -> anyhow::Result<PollOutcome> {
        let job = self
            .last_job
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no job to poll; submit or attach one first"))?;
        let outcome = poll_until_terminal(
            self.provider.as_ref(),
            &self.credential,
            &job,
            self.policy,
            self.events.as_ref(),
        )
        .with_context(|| format!("polling job {} failed", job.id))?;
        match &outcome {
            PollOutcome::Completed(job) => {
                self.last_job = Some(job.clone());
                self.emit(
                    "job_complete",
                    map_object(json!({
                        "job_id": job.id.as_str(),
                        "files": job.files.len(),
                    })),
                )?;
            }
            PollOutcome::Failed(job) => {
                self.last_job = Some(job.clone());
                self.emit(
                    "job_failed",
                    map_object(json!({
                        "job_id": job.id.as_str(),
                        "detail": job.detail.as_deref().unwrap_or_default(),
                    })),
                )?;
            }
            PollOutcome::TimedOut { job, waited } => {
                self.last_job = Some(job.clone());
                self.emit(
                    "poll_timeout",
                    map_object(json!({
                        "job_id": job.id.as_str(),
                        "waited_secs": waited.as_secs_f64(),
                    })),
                )?;
            }
        }
        Ok(outcome)
    }

    /// Download the first asset of the completed job, with the same
    /// credential treatment as submit and status.
    pub fn fetch(&mut self) -> anyhow::Result<ImageAsset> {
        let job = self
            .last_job
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no job to fetch; submit and poll first"))?;
        if job.status != JobStatus::Complete {
            anyhow::bail!(
                "job {} is {}; only complete jobs have assets",
                job.id,
                job.status
            );
        }
        let file = job
            .files
            .first()
            .cloned()
            .ok_or_else(|| WorkflowError::MalformedResponse {
                message: format!("job {} completed with no file descriptors", job.id),
            })?;
        let asset = self
            .provider
            .fetch(&self.credential, &file)
            .with_context(|| format!("fetching asset for job {} failed", job.id))?;
        self.emit(
            "asset_fetched",
            map_object(json!({
                "job_id": job.id.as_str(),
                "bytes": asset.bytes.len(),
                "mime_type": asset.mime_type.as_deref().unwrap_or_default(),
            })),
        )?;
        self.last_asset = Some(asset.clone());
        Ok(asset)
    }

    /// The whole workflow: submit, poll to terminal, download. A job
    /// identifier obtained before a later-stage failure stays attached so
    /// the caller can resume without resubmitting.
    pub fn generate(&mut self, request: &GenerationRequest) -> anyhow::Result<ImageAsset> {
        self.submit(request)?;
        match self.poll()? {
            PollOutcome::Completed(_) => self.fetch(),
            PollOutcome::Failed(job) => Err(WorkflowError::JobFailed {
                job_id: job.id.clone(),
                detail: job
                    .detail
                    .clone()
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            }
            .into()),
            PollOutcome::TimedOut { job, waited } => Err(WorkflowError::PollTimeout {
                job_id: job.id.clone(),
                waited_secs: waited.as_secs_f64(),
            }
            .into()),
        }
    }

    fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<()> {
        if let Some(events) = &self.events {
            events
                .emit(event_type, payload)
                .with_context(|| format!("emitting {event_type} event failed"))?;
        }
        Ok(())
    }
}

fn extract_job_id(payload: &Value) -> Option<String> {
    for key in ["id", "request_id", "requestId"] {
        if let Some(id) = payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return Some(id.to_string());
        }
    }
    None
}

fn collect_file_descriptors(payload: &Value) -> Vec<FileDescriptor> {
    let mut files = Vec::new();
    for key in ["files", "generated_files", "visuals"] {
        if let Some(rows) = payload.get(key).and_then(Value::as_array) {
            for row in rows {
                push_file_descriptor(row, &mut files);
            }
        }
    }
    files
}

fn push_file_descriptor(row: &Value, out: &mut Vec<FileDescriptor>) {
    let descriptor = match row {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.is_empty() || !trimmed.starts_with("http") {
                return;
            }
            FileDescriptor::from_url(trimmed)
        }
        Value::Object(obj) => {
            let url = obj
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            let visual_id = obj
                .get("visual_id")
                .or_else(|| obj.get("id"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            if url.is_none() && visual_id.is_none() {
                return;
            }
            FileDescriptor { url, visual_id }
        }
        _ => return,
    };
    if out.iter().any(|existing| existing == &descriptor) {
        return;
    }
    out.push(descriptor);
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, WorkflowError> {
    let status = response.status();
    let body = response.text().map_err(|source| WorkflowError::Network {
        context: "reading response body failed".to_string(),
        source,
    })?;
    if !status.is_success() {
        return Err(http_failure(status, body));
    }
    serde_json::from_str(&body).map_err(|_| WorkflowError::MalformedResponse {
        message: format!(
            "provider returned invalid JSON: {}",
            truncate_text(&body, 160)
        ),
    })
}

fn http_failure(status: StatusCode, body: String) -> WorkflowError {
    if status == StatusCode::UNAUTHORIZED {
        WorkflowError::Unauthorized {
            body: truncate_text(&body, ERROR_BODY_MAX_CHARS),
        }
    } else {
        WorkflowError::Http {
            status: status.as_u16(),
            body: truncate_text(&body, ERROR_BODY_MAX_CHARS),
        }
    }
}

fn insert_optional(body: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn parse_dryrun_dims(visual_id: &str) -> (u32, u32) {
    visual_id
        .split('-')
        .nth(1)
        .map(parse_dims)
        .unwrap_or((1024, 1024))
}

fn parse_dims(size: &str) -> (u32, u32) {
    let mut parts = size.split(['x', 'X']);
    let width = parts
        .next()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1024);
    let height = parts
        .next()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1024);
    (width, height)
}

fn short_id(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

fn color_from_seed(seed: &[u8]) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
