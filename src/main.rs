use anyhow::Result;
use tracing_subscriber::EnvFilter;

use lottobot::config;
use lottobot::scheduler;
use lottobot::service::LottoService;
use lottobot::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(
        "Starting the lotto bot: {} game(s) per round, {:?} mode.",
        config.game_count,
        config.gen_type
    );

    let store = Store::open(&config.database_url)?;
    let buy_schedule = config.buy_schedule;
    let check_schedule = config.check_schedule;

    let service = LottoService::new(config, store)?;

    tracing::info!(
        "Buy trigger {buy_schedule:?}, winner check trigger {check_schedule:?} (KST)."
    );

    scheduler::run(service, buy_schedule, check_schedule).await;

    Ok(())
}
