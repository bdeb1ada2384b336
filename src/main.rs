use std::sync::Arc;

use crud_service::config::Config;
use crud_service::hooks::{connect_to_database, validate_request, ConnectionRegistry};
use crud_service::http::Router;
use crud_service::memory::MemoryStore;
use crud_service::server::{self, ServerState};
use crud_service::{logger, validation, Operation, Service};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let store = Arc::new(MemoryStore::new("items"));
    let registry = Arc::new(ConnectionRegistry::new());
    let items = Service::builder()
        .methods(store.methods())
        .before_all(connect_to_database(registry, store.name(), || async {
            logger::log_info("Connected to in-memory store");
            Ok(())
        }))
        .before(
            Operation::Create,
            validate_request(vec![validation::body("name").exists().not_empty()]),
        )
        .build();

    logger::log_server_start(&addr, &cfg);
    let router = Router::new(&cfg.http).route(&cfg.http.route, items);
    let state = Arc::new(ServerState::new(cfg, router));

    server::run(listener, state, server::shutdown_signal()).await
}
