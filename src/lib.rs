pub(crate) mod api;
pub(crate) mod attempt;
pub(crate) mod cli;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;
pub(crate) mod storage;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::storage::FileStore;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let store = Arc::new(FileStore::open(settings.storage().data_dir.clone()));
    let state = AppState::new(settings, store)?;

    tracing::info!(
        base_url = %state.settings().api().base_url,
        environment = %state.settings().runtime().environment.as_str(),
        "Testly client starting"
    );

    // Revalidate whatever session survived the last run; an explicit server
    // rejection clears it, an unreachable server does not.
    if state.session().current().is_some() {
        state.auth().validate_token().await;
    }

    // Auth-state broadcast, as the original header consumed it.
    let mut session_updates = state.session().subscribe();
    tokio::spawn(async move {
        while session_updates.changed().await.is_ok() {
            let name =
                session_updates.borrow().as_ref().map(|user| user.display_name().to_string());
            match name {
                Some(name) => tracing::info!(user = %name, "Session user changed"),
                None => tracing::info!("Session cleared"),
            }
        }
    });

    cli::run(state).await
}
