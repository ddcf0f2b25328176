#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Mail dispatcher: sends pending emails on a schedule and serves the health API

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mail_dispatcher::{
    domain::dispatch::{DispatchServiceImpl, EmailBuilder, HtmlEnvelope},
    infrastructure::{
        db::postgres::{DatabaseConnectionDetails, PostgresDatabase},
        email::smtp::{SMTPConfig, SMTPMailer},
        http::{state::AppState, HttpServer, HttpServerConfig},
        scheduler::{DispatchWorker, SchedulerConfig},
    },
};
use tokio::sync::watch;
use tracing::info;

/// Email content settings
#[derive(Debug, Parser)]
pub struct MailArgs {
    /// The sender address of every email
    #[arg(long = "mail-from", env = "MAIL_FROM")]
    pub from: String,

    /// The font family applied to email bodies
    #[arg(long, env = "MAIL_FONT_FAMILY", default_value = "Saysettha OT")]
    pub font_family: String,
}

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The HTTP server configuration
    #[clap(flatten)]
    pub server: HttpServerConfig,

    /// The database connection details
    #[clap(flatten)]
    pub db: DatabaseConnectionDetails,

    /// The SMTP relay configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,

    /// Email content settings
    #[clap(flatten)]
    pub mail: MailArgs,

    /// The dispatch schedule
    #[clap(flatten)]
    pub scheduler: SchedulerConfig,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load environment: {}", e);

            return Err(e.into());
        }
    }

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let postgres = Arc::new(PostgresDatabase::new(&args.db).await?);
    postgres.migrate().await?;

    let builder = EmailBuilder::new(
        args.mail.from.clone(),
        HtmlEnvelope::new(args.mail.font_family.clone()),
    );

    let dispatch = Arc::new(DispatchServiceImpl::new(
        postgres.clone(),
        postgres,
        Arc::new(SMTPMailer::new(args.smtp.clone())),
        builder,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(
        DispatchWorker::new(dispatch.clone(), args.scheduler.interval()).run(shutdown_rx),
    );

    info!(
        interval_secs = args.scheduler.interval().as_secs(),
        "dispatch scheduler started"
    );

    HttpServer::new(AppState::new(dispatch), &args.server)?
        .run()
        .await?;

    shutdown_tx.send(true)?;
    worker.await?;

    Ok(())
}
