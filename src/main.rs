// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use osint_client::models::{ConsentRequest, ConsentType};
use osint_client::services::{ApiClient, CandidateFile, ProgressStatus};
use osint_client::{AnalysisSession, ClientConfig, SessionPhase};

#[derive(Parser, Debug)]
#[command(name = "osint-client", version, about = "Submit an image for OSINT analysis")]
struct Cli {
    /// Image to analyze (JPEG, PNG, GIF, BMP or WebP, at most 10 MB)
    image: PathBuf,

    /// Request face recognition. Needs --consent.
    #[arg(long)]
    face_recognition: bool,

    /// JSON consent form: full_name, email, purpose, consent_types, agreed_to_terms
    #[arg(long, value_name = "FILE", requires = "face_recognition")]
    consent: Option<PathBuf>,

    /// Show age, gender and emotion estimates for detected faces
    #[arg(long)]
    reveal_sensitive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let config = ClientConfig::from_env()?;
    info!("Using analysis service at {}", config.base_url);

    let client = Arc::new(ApiClient::new(&config)?);
    match client.health_check().await {
        Ok(health) => info!(
            "Service health: {}",
            health.status.as_deref().unwrap_or("unknown")
        ),
        Err(e) => warn!("{}; trying anyway", e),
    }

    let mut session = AnalysisSession::new(client, &config);
    session.set_reveal_sensitive(cli.reveal_sensitive);
    session.set_face_recognition(cli.face_recognition);

    let candidate = CandidateFile::from_path(&cli.image).await?;
    let phase = session.select_file(candidate)?;

    if phase == SessionPhase::AwaitingConsent {
        let Some(path) = &cli.consent else {
            let kinds: Vec<String> = ConsentType::ALL
                .iter()
                .map(|kind| format!("{}: {}", kind.label(), kind.description()))
                .collect();
            bail!(
                "--face-recognition needs a consent form (--consent <FILE>). Consent types: {}",
                kinds.join("; ")
            );
        };
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read consent form {}", path.display()))?;
        let request: ConsentRequest = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid consent form {}", path.display()))?;
        let record = session.submit_consent(&request).await?;
        info!("Consent granted until {}", record.expires_at.format("%Y-%m-%d"));
    }

    let mut progress = session.progress();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow().clone();
            match state.status {
                ProgressStatus::Running => info!("{} ({:.0}%)", state.caption(), state.percent()),
                ProgressStatus::Complete => info!("Analysis complete"),
                ProgressStatus::Failed => warn!("Analysis failed at: {}", state.caption()),
                ProgressStatus::Idle => {}
            }
        }
    });

    let outcome = session.analyze().await;
    drop(session);
    // The sender lives in the session; dropping it ends the watcher.
    let _ = watcher.await;

    let report = outcome?;
    println!("{}", report.view);
    Ok(())
}
