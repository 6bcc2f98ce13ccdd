use crate::modules::handlers::{liveness, readiness, student};
use crate::modules::migration::MIGRATOR;
use crate::modules::students::PgStudentStore;
use crate::modules::sync::dispatch::{self, SyncDispatcher};
use crate::modules::sync::{scheduler, SyncService};
use anyhow::{Context, Result};
use axum::{extract::Extension, routing, Router, Server};
use chrono_tz::Tz;
use clap::Args;
use progress_tracker_libs::codeforces::client::{CodeforcesClient, DEFAULT_API_URL};
use progress_tracker_libs::mail::SendGridMailer;
use sqlx::postgres::PgPoolOptions;
use std::{env, net::SocketAddr, sync::Arc};

const DEFAULT_SYNC_CRON: &str = "0 0 2 * * *";

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run(args: ServerArgs) -> Result<()> {
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
    let service = Arc::new(SyncService::new(api, store.clone(), mailer));

    let (dispatcher, outcomes) = SyncDispatcher::new(Arc::clone(&service));
    let _outcome_logger = dispatch::spawn_outcome_logger(outcomes);

    let cron = env::var("SYNC_CRON").unwrap_or_else(|_| {
        tracing::warn!(
            "SYNC_CRON is not set. Default schedule `{}` will be used.",
            DEFAULT_SYNC_CRON
        );
        String::from(DEFAULT_SYNC_CRON)
    });
    let timezone: Tz = env::var("SYNC_TIMEZONE")
        .unwrap_or_else(|_| {
            tracing::warn!("SYNC_TIMEZONE is not set. UTC will be used.");
            String::from("UTC")
        })
        .parse()
        .map_err(|e| anyhow::anyhow!("couldn't parse SYNC_TIMEZONE: {}", e))?;
    scheduler::start(Arc::clone(&service), &cron, timezone).await?;

    let app = create_router(store, service, dispatcher);

    let port = match args
        .port
        .or_else(|| env::var("PORT").ok().and_then(|port| port.parse().ok()))
    {
        Some(port) => port,
        None => {
            tracing::warn!("API server will be launched at default port number 8000");
            8000u16
        }
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server start at port {}", port);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with an error")?;

    Ok(())
}

fn create_router(
    store: PgStudentStore,
    service: Arc<student::AppSyncService>,
    dispatcher: student::AppSyncDispatcher,
) -> Router {
    Router::new()
        .route(
            "/api/students",
            routing::get(student::list_students).post(student::create_student),
        )
        .route("/api/students/csv", routing::get(student::download_csv))
        .route(
            "/api/students/:id",
            routing::get(student::get_student)
                .put(student::update_student)
                .delete(student::delete_student),
        )
        .route("/api/students/:id/sync", routing::post(student::force_sync))
        .route("/api/liveness", routing::get(liveness))
        .route("/api/readiness", routing::get(readiness))
        .layer(Extension(Arc::new(store)))
        .layer(Extension(service))
        .layer(Extension(dispatcher))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler.");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("SIGINT signal received, starting graceful shutdown.");
}
