#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

use portal_db::{connect_postgres_with_max, RlsExecutor};

mod cli;
mod commands;
mod config;
mod runtime;
mod settings;

#[tokio::main]
async fn main() {
    let run_mode = cli::parse_args();
    let settings = settings::Settings::from_env();
    runtime::init_tracing(&settings);

    let pool = match connect_postgres_with_max(&settings.db_url, settings.db_pool_max).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(event = "db_connect_failed", error = %err);
            std::process::exit(1);
        }
    };

    let result = match &run_mode {
        cli::RunMode::Migrate => commands::migrate(&pool).await,
        cli::RunMode::GrantRole(args) => commands::grant_role(&settings, &pool, args).await,
        cli::RunMode::Health => commands::health(&pool).await,
        cli::RunMode::Seed => commands::seed(&build_executor(&settings, pool)).await,
        cli::RunMode::Cards(args) => commands::cards(&build_executor(&settings, pool), args).await,
    };

    if let Err(code) = result {
        eprintln!("{code}");
        std::process::exit(1);
    }
}

fn build_executor(settings: &settings::Settings, pool: portal_db::PgPool) -> RlsExecutor {
    match RlsExecutor::new(pool, settings.executor_options()) {
        Ok(executor) => executor,
        Err(err) => {
            tracing::error!(event = "executor_config_invalid", error = %err);
            std::process::exit(1);
        }
    }
}
