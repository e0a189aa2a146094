use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use easel_contracts::events::EventLog;
use easel_contracts::visuals::{Credential, FileDescriptor, GenerationRequest, ImageAsset};
use easel_engine::{
    is_credential_rejection, AuthScheme, DryrunProvider, NapkinProvider, PollPolicy,
    VisualProvider, WorkflowSession,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "easel", version, about = "Visual-generation workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a prompt, poll until terminal, download the asset.
    Generate(GenerateArgs),
    /// Submit a prompt and print the job identifier for later resumption.
    Submit(SubmitArgs),
    /// Check the status of a previously submitted job once.
    Status(StatusArgs),
    /// Download the asset of a completed job.
    Fetch(FetchArgs),
}

#[derive(Debug, Args)]
struct RequestArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value_t = 1024)]
    width: u32,
    #[arg(long, default_value_t = 1024)]
    height: u32,
    #[arg(long, default_value = "png")]
    format: String,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    transparent: bool,
    #[arg(long)]
    context_before: Option<String>,
    #[arg(long)]
    context_after: Option<String>,
    #[arg(long)]
    visual_type: Option<String>,
    #[arg(long)]
    background_color: Option<String>,
    #[arg(long)]
    color_theme: Option<String>,
}

impl RequestArgs {
    fn to_request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.prompt.clone());
        request.width = self.width;
        request.height = self.height;
        request.output_format = self.format.clone();
        request.language = self.language.clone();
        request.style_id = self.style.clone();
        request.transparent_background = self.transparent;
        request.context_before = self.context_before.clone();
        request.context_after = self.context_after.clone();
        request.visual_type = self.visual_type.clone();
        request.background_color = self.background_color.clone();
        request.color_theme = self.color_theme.clone();
        request
    }
}

#[derive(Debug, Args)]
struct AccessArgs {
    /// API key; falls back to NAPKIN_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    /// Credential placement: bearer, api-key, or account.
    #[arg(long, default_value = "bearer")]
    auth: String,
    /// Run against the offline provider; no credential or network needed.
    #[arg(long)]
    dryrun: bool,
}

impl AccessArgs {
    fn credential(&self) -> Result<Credential> {
        if self.dryrun {
            return Ok(Credential::new("dryrun"));
        }
        self.api_key
            .clone()
            .map(Credential::new)
            .or_else(NapkinProvider::credential_from_env)
            .context("NAPKIN_API_KEY not set; pass --api-key or export it")
    }

    fn provider(&self) -> Result<Box<dyn VisualProvider>> {
        if self.dryrun {
            return Ok(Box::new(DryrunProvider));
        }
        let auth = self
            .auth
            .parse::<AuthScheme>()
            .map_err(anyhow::Error::msg)?;
        Ok(Box::new(NapkinProvider::new(auth)))
    }
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,
    #[command(flatten)]
    access: AccessArgs,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value_t = 5.0)]
    poll_interval: f64,
    #[arg(long, default_value_t = 120.0)]
    poll_timeout: f64,
}

#[derive(Debug, Parser)]
struct SubmitArgs {
    #[command(flatten)]
    request: RequestArgs,
    #[command(flatten)]
    access: AccessArgs,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    #[arg(long)]
    job: String,
    #[command(flatten)]
    access: AccessArgs,
}

#[derive(Debug, Parser)]
struct FetchArgs {
    #[arg(long)]
    job: Option<String>,
    /// Direct file URL, when the status payload already reported one.
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value = "png")]
    format: String,
    #[command(flatten)]
    access: AccessArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("easel error: {err:#}");
            if is_credential_rejection(&err) {
                eprintln!(
                    "hint: the provider rejected this credential format; retry with a \
                     different --auth scheme (bearer, api-key, account)"
                );
            }
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args)?,
        Command::Submit(args) => run_submit(args)?,
        Command::Status(args) => run_status(args)?,
        Command::Fetch(args) => run_fetch(args)?,
    }
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let credential = args.access.credential()?;
    let provider = args.access.provider()?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventLog::new(events_path, Uuid::new_v4().to_string());

    let request = args.request.to_request();
    let mut session = WorkflowSession::new(credential, provider)
        .with_policy(PollPolicy::new(args.poll_interval, args.poll_timeout))
        .with_events(events);
    let asset = session.generate(&request)?;
    let job_id = session
        .last_job()
        .map(|job| job.id.clone())
        .unwrap_or_default();
    let path = write_asset(&args.out, &asset, &request.output_format)?;
    println!("job {job_id} complete: {}", path.display());
    Ok(())
}

fn run_submit(args: SubmitArgs) -> Result<()> {
    let credential = args.access.credential()?;
    let provider = args.access.provider()?;
    let mut session = WorkflowSession::new(credential, provider);
    let job = session.submit(&args.request.to_request())?;
    println!("{}", job.id);
    eprintln!("submitted; resume with: easel status --job {}", job.id);
    Ok(())
}

fn run_status(args: StatusArgs) -> Result<()> {
    let credential = args.access.credential()?;
    let provider = args.access.provider()?;
    let mut session = WorkflowSession::new(credential, provider);
    session.attach_job(args.job);
    let job = session.refresh()?;
    println!("{}", serde_json::to_string_pretty(job)?);
    Ok(())
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let credential = args.access.credential()?;
    let asset = if let Some(url) = args.url {
        let provider = args.access.provider()?;
        provider
            .fetch(&credential, &FileDescriptor::from_url(url))
            .context("direct download failed")?
    } else if let Some(job_id) = args.job {
        let provider = args.access.provider()?;
        let mut session = WorkflowSession::new(credential, provider);
        session.attach_job(job_id);
        session.refresh()?;
        session.fetch()?
    } else {
        bail!("fetch requires --job or --url");
    };
    let path = write_asset(&args.out, &asset, &args.format)?;
    println!("{}", path.display());
    Ok(())
}

fn write_asset(out_dir: &Path, asset: &ImageAsset, output_format: &str) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(format!(
        "visual-{}.{}",
        timestamp_millis(),
        asset.extension(output_format)
    ));
    fs::write(&path, &asset.bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use easel_contracts::visuals::ImageAsset;

    use super::{write_asset, AccessArgs, RequestArgs};

    fn request_args(prompt: &str) -> RequestArgs {
        RequestArgs {
            prompt: prompt.to_string(),
            width: 800,
            height: 600,
            format: "webp".to_string(),
            language: None,
            style: Some("sketch".to_string()),
            transparent: true,
            context_before: Some("intro".to_string()),
            context_after: None,
            visual_type: None,
            background_color: None,
            color_theme: None,
        }
    }

    #[test]
    fn request_args_map_onto_the_generation_request() {
        let request = request_args("a boat").to_request();
        assert_eq!(request.prompt, "a boat");
        assert_eq!(request.width, 800);
        assert_eq!(request.height, 600);
        assert_eq!(request.output_format, "webp");
        assert_eq!(request.style_id.as_deref(), Some("sketch"));
        assert!(request.transparent_background);
        assert_eq!(request.context_before.as_deref(), Some("intro"));
        assert!(request.context_after.is_none());
    }

    #[test]
    fn dryrun_access_needs_no_api_key() {
        let access = AccessArgs {
            api_key: None,
            auth: "bearer".to_string(),
            dryrun: true,
        };
        assert!(access.credential().is_ok());
        assert!(access.provider().is_ok());
    }

    #[test]
    fn unknown_auth_scheme_is_rejected() {
        let access = AccessArgs {
            api_key: Some("sk-1".to_string()),
            auth: "basic".to_string(),
            dryrun: false,
        };
        assert!(access.provider().is_err());
    }

    #[test]
    fn written_asset_extension_follows_the_mime_type() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let asset = ImageAsset {
            bytes: vec![1, 2, 3],
            mime_type: Some("image/jpeg".to_string()),
        };
        let path = write_asset(temp.path(), &asset, "png")?;
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("jpg"));
        assert_eq!(std::fs::read(&path)?, vec![1, 2, 3]);
        Ok(())
    }
}
