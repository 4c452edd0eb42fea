use std::path::Path;

use anyhow::Context;
use th_config::TrustHubConfig;
use th_db::service::TrustHubService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: TrustHubService,
    pub config: TrustHubConfig,
}

impl AppContext {
    /// Open the store named by `--db`, else by `database.path`.
    ///
    /// The parent directory of a file database is created on first use.
    pub async fn init(config: TrustHubConfig, flags: &GlobalFlags) -> anyhow::Result<Self> {
        let db_path = flags
            .db
            .clone()
            .unwrap_or_else(|| config.database.path.clone());

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(&db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        tracing::debug!(path = %db_path, actor = %config.general.display_user, "opening store");
        let service = TrustHubService::new_local(&db_path, config.general.display_user.clone())
            .await
            .context("failed to open trust hub database")?;

        Ok(Self { service, config })
    }
}
