use clap::Parser;
use th_core::errors::ErrorKind;
use th_db::error::DatabaseError;

mod cli;
mod commands;
mod context;
mod output;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        let (label, code) = classify(&error);
        eprintln!("thub error: {label}: {error:#}");
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = th_config::TrustHubConfig::load_with_dotenv()?;
    let flags = cli.global_flags(config.general.default_format.into());
    ui::init(&flags);

    let ctx = context::AppContext::init(config, &flags).await?;
    commands::dispatch::dispatch(cli.command, &ctx, &flags).await
}

/// Error label and exit code, taken from the store error when there is one.
fn classify(error: &anyhow::Error) -> (&'static str, i32) {
    error
        .downcast_ref::<DatabaseError>()
        .map_or((ErrorKind::Internal.label(), ErrorKind::Internal.exit_code()), |db| {
            (db.label(), db.kind().exit_code())
        })
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("THUB_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use th_core::enums::EntityType;
    use th_db::error::DatabaseError;

    use super::classify;

    #[test]
    fn store_errors_keep_their_exit_codes() {
        let locked = anyhow::Error::new(DatabaseError::AuditClosed {
            audit_id: "FY24".into(),
        });
        assert_eq!(classify(&locked), ("locked", 4));

        let missing = anyhow::Error::new(DatabaseError::NotFound {
            entity: EntityType::Control,
            id: "CTL-9".into(),
        });
        assert_eq!(classify(&missing), ("missing", 3));

        let invalid = anyhow::Error::new(DatabaseError::Validation("bad".into()));
        assert_eq!(classify(&invalid), ("invalid", 2));
    }

    #[test]
    fn context_wrapping_does_not_hide_the_store_error() {
        let wrapped = anyhow::Error::new(DatabaseError::Integrity("cross-audit".into()))
            .context("adding evidence");
        assert_eq!(classify(&wrapped), ("integrity", 5));
    }

    #[test]
    fn other_errors_are_internal() {
        assert_eq!(classify(&anyhow::anyhow!("disk full")), ("internal", 1));
    }
}
