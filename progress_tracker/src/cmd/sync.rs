use crate::modules::migration::MIGRATOR;
use crate::modules::students::{PgStudentStore, StudentStore};
use crate::modules::sync::SyncService;
use anyhow::{Context, Result};
use clap::Args;
use progress_tracker_libs::codeforces::client::{CodeforcesClient, DEFAULT_API_URL};
use progress_tracker_libs::mail::SendGridMailer;
use sqlx::postgres::PgPoolOptions;
use std::env;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Sync a single student instead of the whole population.
    #[arg(long)]
    handle: Option<String>,
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let database_url = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .with_context(|| {
            let message = "Failed to create database connection pool.";
            tracing::error!(message);
            message
        })?;

    MIGRATOR.run(&pool).await?;

    let api_url = env::var("CODEFORCES_API_URL").unwrap_or_else(|_| {
        tracing::warn!(
            "CODEFORCES_API_URL is not set. Default value `{}` will be used.",
            DEFAULT_API_URL
        );
        String::from(DEFAULT_API_URL)
    });
    let api = CodeforcesClient::with_base_url(&api_url)?;

    let sendgrid_api_key = env::var("SENDGRID_API_KEY").with_context(|| {
        let message = "SENDGRID_API_KEY must be configured.";
        tracing::error!(message);
        message
    })?;
    let sendgrid_from = env::var("SENDGRID_FROM_EMAIL").with_context(|| {
        let message = "SENDGRID_FROM_EMAIL must be configured.";
        tracing::error!(message);
        message
    })?;
    let mailer = SendGridMailer::new(&sendgrid_api_key, &sendgrid_from)?;

    let store = PgStudentStore::new(pool);
    let service = SyncService::new(api, store.clone(), mailer);

    match args.handle {
        Some(handle) => {
            let student = store.find_by_handle(&handle).await?;
            let updated = service.sync_one(&student).await?;
            tracing::info!(
                "{} is up to date at rating {} ({} contests, {} submissions)",
                updated.handle,
                updated.current_rating,
                updated.contests.len(),
                updated.submissions.len(),
            );
        }
        None => {
            let report = service.run_pass().await?;
            tracing::info!(
                "sync pass finished: {} synced, {} reminders sent, {} failed out of {}",
                report.synced,
                report.reminders_sent,
                report.failures.len(),
                report.total,
            );
            for failure in &report.failures {
                tracing::error!("{} could not be synced: {}", failure.handle, failure.error);
            }
        }
    }

    Ok(())
}
