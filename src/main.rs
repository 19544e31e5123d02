//! CivicConnect - civic issue reporting backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use civicconnect::{
    config::Args,
    db::{CivicStore, MemoryStore, MongoStore},
    logging, server,
    services::auto_seed_wards,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  CivicConnect");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("City: {}", args.city);
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
    info!("======================================");

    // MongoDB is optional in dev mode
    let store: Arc<dyn CivicStore> = match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(store) => Arc::new(store),
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
            Arc::new(MemoryStore::new())
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    auto_seed_wards(store.as_ref(), &args).await;

    let state = Arc::new(AppState::new(args, store)?);
    server::run(state).await?;

    Ok(())
}
