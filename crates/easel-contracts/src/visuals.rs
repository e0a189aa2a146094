use std::fmt;

use serde::{Deserialize, Serialize};

/// API key/secret authorizing every call of a workflow session.
///
/// Held in memory for the session only; never serialized, never written to
/// disk. `Debug` redacts the secret so it cannot leak through error chains
/// or event payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One visual-generation submission, immutable once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_format")]
    pub output_format: String,
    pub language: Option<String>,
    pub style_id: Option<String>,
    #[serde(default)]
    pub transparent_background: bool,
    pub visual_type: Option<String>,
    pub background_color: Option<String>,
    pub color_theme: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context_before: None,
            context_after: None,
            width: default_width(),
            height: default_height(),
            output_format: default_format(),
            language: None,
            style_id: None,
            transparent_background: false,
            visual_type: None,
            background_color: None,
            color_theme: None,
        }
    }
}

/// Server-side job state. Transitions are forward-only: pending/running may
/// become complete or failed, never the reverse. Anything the provider
/// reports that we do not recognize is `Unknown` and stays pollable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Case-insensitive parse of a provider status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => JobStatus::Pending,
            "running" | "processing" => JobStatus::Running,
            "complete" | "completed" => JobStatus::Complete,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Pointer to one generated file in a completed job's status payload.
/// Providers report a direct `url`, a `visual_id` for the dedicated download
/// endpoint, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileDescriptor {
    pub url: Option<String>,
    #[serde(alias = "id")]
    pub visual_id: Option<String>,
}

impl FileDescriptor {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            visual_id: None,
        }
    }

    pub fn from_visual_id(visual_id: impl Into<String>) -> Self {
        Self {
            url: None,
            visual_id: Some(visual_id.into()),
        }
    }
}

/// One server-side generation request, tracked by an opaque identifier.
/// Created by the submitter, mutated only by re-fetching status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub files: Vec<FileDescriptor>,
    /// Raw provider message kept for failed/unknown statuses so the caller
    /// sees what the server actually said.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            files: Vec::new(),
            detail: None,
        }
    }
}

/// Downloaded asset bytes plus the mime type the provider declared.
/// Held in memory for the session; callers decide whether to persist it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl ImageAsset {
    /// File extension implied by the declared mime type, falling back to the
    /// requested output format when the provider declared none.
    pub fn extension(&self, fallback_format: &str) -> &'static str {
        if let Some(mime) = self.mime_type.as_deref() {
            let lowered = mime.to_ascii_lowercase();
            if lowered.contains("jpeg") || lowered.contains("jpg") {
                return "jpg";
            }
            if lowered.contains("webp") {
                return "webp";
            }
            if lowered.contains("svg") {
                return "svg";
            }
            if lowered.contains("png") {
                return "png";
            }
        }
        normalize_extension(fallback_format)
    }
}

fn normalize_extension(format: &str) -> &'static str {
    match format.trim().to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "jpg",
        "webp" => "webp",
        "svg" => "svg",
        _ => "png",
    }
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    1024
}

fn default_format() -> String {
    "png".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Credential, FileDescriptor, GenerationRequest, ImageAsset, Job, JobStatus};

    #[test]
    fn status_parse_is_case_insensitive() {
        for raw in ["COMPLETE", "Complete", "complete", "Completed"] {
            assert_eq!(JobStatus::parse(raw), JobStatus::Complete);
            assert!(JobStatus::parse(raw).is_terminal());
        }
        assert_eq!(JobStatus::parse("FAILED"), JobStatus::Failed);
        assert!(JobStatus::parse("failed").is_terminal());
    }

    #[test]
    fn unrecognized_status_is_unknown_and_not_terminal() {
        for raw in ["warming_up", "", "succeeded-ish"] {
            let status = JobStatus::parse(raw);
            assert_eq!(status, JobStatus::Unknown);
            assert!(!status.is_terminal());
        }
        assert!(!JobStatus::parse("pending").is_terminal());
        assert!(!JobStatus::parse("Running").is_terminal());
    }

    #[test]
    fn credential_debug_redacts_the_secret() {
        let credential = Credential::new("sk-super-secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn file_descriptor_accepts_id_alias() -> anyhow::Result<()> {
        let descriptor: FileDescriptor =
            serde_json::from_str(r#"{"id": "vis-1", "url": null}"#)?;
        assert_eq!(descriptor.visual_id.as_deref(), Some("vis-1"));
        let descriptor: FileDescriptor =
            serde_json::from_str(r#"{"visual_id": "vis-2"}"#)?;
        assert_eq!(descriptor.visual_id.as_deref(), Some("vis-2"));
        Ok(())
    }

    #[test]
    fn new_job_starts_pending_with_no_files() {
        let job = Job::new("job-1");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.files.is_empty());
        assert!(job.detail.is_none());
    }

    #[test]
    fn asset_extension_prefers_declared_mime() {
        let asset = ImageAsset {
            bytes: vec![1, 2, 3],
            mime_type: Some("image/jpeg".to_string()),
        };
        assert_eq!(asset.extension("png"), "jpg");

        let untyped = ImageAsset {
            bytes: Vec::new(),
            mime_type: None,
        };
        assert_eq!(untyped.extension("WEBP"), "webp");
        assert_eq!(untyped.extension("tiff"), "png");
    }

    #[test]
    fn request_defaults_fill_in_when_deserialized() -> anyhow::Result<()> {
        let request: GenerationRequest = serde_json::from_str(r#"{"prompt": "a boat"}"#)?;
        assert_eq!(request.width, 1024);
        assert_eq!(request.height, 1024);
        assert_eq!(request.output_format, "png");
        assert!(!request.transparent_background);
        Ok(())
    }
}
