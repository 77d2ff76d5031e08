use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use account_ledger::domain::account::{Account, BankAccount, Money};
use account_ledger::utils::retry_on_transient;
use account_ledger::{AggregateStore, AppConfig, EventLog, InMemoryEventLog, Metrics, PgEventLog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // RUST_LOG wins over LEDGER_LOG_FILTER when set
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("Starting account ledger demo");

    // === 1. Pick the event log ===
    let log: Arc<dyn EventLog> = match &config.database {
        Some(database) => {
            tracing::info!("Using PostgreSQL event log");
            let log = PgEventLog::connect(database).await?;
            log.ensure_schema().await?;
            Arc::new(log)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory event log");
            Arc::new(InMemoryEventLog::new())
        }
    };

    // === 2. Metrics and store ===
    let metrics = Arc::new(Metrics::new()?);
    let store = AggregateStore::new(log).with_metrics(metrics.clone());

    // === 3. Open an account and record its first transactions ===
    let account_id = Uuid::new_v4();
    let mut account = BankAccount::open(account_id, "Sandeep Chandra", Money::zero())?;
    account.record_transaction("Open Account", Money::from_major(1000))?;
    account.record_transaction("Westpac transfer", Money::from_major(500))?;
    account.record_transaction("Transfer to ANZ", Money::from_major(-200))?;

    let version = store.record(&mut account).await?;
    tracing::info!(%account_id, version, total = %account.total(), "Account opened");

    // === 4. A later change on the same instance appends ===
    account.record_transaction("Electricity bill", Money::from_major(-100))?;
    let version = store.record(&mut account).await?;
    tracing::info!(%account_id, version, total = %account.total(), "Transaction recorded");

    // === 5. Rebuild from the log ===
    let restored = retry_on_transient(config.retry.clone(), "reconstruct_account", |_attempt| {
        let store = store.clone();
        async move { store.reconstruct::<Account>(account_id).await }
    })
    .await
    .into_result()?;

    tracing::info!(
        %account_id,
        owner = restored.owner_name(),
        total = %restored.total(),
        transactions = restored.transaction_count(),
        version = restored.version(),
        "Account reconstructed"
    );

    if restored.state() != account.state() {
        anyhow::bail!("reconstructed account does not match the live instance");
    }

    tracing::debug!("Metrics:\n{}", metrics.render()?);
    tracing::info!("Done");
    Ok(())
}
