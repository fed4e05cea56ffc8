use std::sync::Arc;

use journal_proxy::config::{AppState, Config};
use journal_proxy::store::entry_count;
use journal_proxy::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(AppState::new(cfg)?);

    let stored_entries = if state.config.storage.enabled {
        state.store.ensure_dir().await?;
        Some(entry_count(&state.store.load().await?))
    } else {
        None
    };

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&listener.local_addr()?, &state, stored_entries);

    server::run(listener, state, server::shutdown_signal()).await;
    Ok(())
}
