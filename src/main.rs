//! Library Desk command-line entry point
//!
//! Restores the persisted session (logging in from `LMS_USERNAME` /
//! `LMS_PASSWORD` when there is none), then prints the view that matches the
//! signed-in role as JSON: the dashboard for staff, the circulation desk for
//! students.

use std::sync::Arc;

use anyhow::Context;
use app_core::circulation::StudentDesk;
use app_core::{DashboardConfig, DashboardService};
use app_state::{LandingView, SessionContext};
use lms_client::session::SessionManager;
use lms_client::{LibraryClient, RestClientConfig};
use storage::{KvConfig, KvStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_desk=info,app_core=info,lms_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = LibraryClient::new(RestClientConfig::from_env())
        .context("failed to build the HTTP client")?;
    let store = KvStore::new(KvConfig::from_env()).context("failed to open the session store")?;

    let mut sessions = SessionManager::restore(&store)?;
    if sessions.is_expired() {
        tracing::info!("stored token has expired");
        sessions.logout(&client).await?;
    }
    sessions.attach(&client).await;

    if sessions.current().is_none() {
        if let (Ok(username), Ok(password)) =
            (std::env::var("LMS_USERNAME"), std::env::var("LMS_PASSWORD"))
        {
            sessions.login(&client, &username, &password).await.context("login failed")?;
        }
    }

    let session = SessionContext::from_manager(&sessions);
    let output = match session.landing_view() {
        LandingView::SignIn => {
            tracing::info!("no session; set LMS_USERNAME and LMS_PASSWORD to sign in");
            return Ok(());
        }
        LandingView::Dashboard => {
            let service = DashboardService::with_config(Arc::new(client), DashboardConfig::default());
            let view = service.load().await?;
            serde_json::to_string_pretty(&view)?
        }
        LandingView::StudentPanel => {
            let mut desk = StudentDesk::new(client);
            let snapshot = desk.load(&session).await?;
            serde_json::to_string_pretty(snapshot)?
        }
    };

    println!("{}", output);
    Ok(())
}
