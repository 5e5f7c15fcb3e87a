use comanda_seed::{SeedConfig, seed};
use comanda_store::{CollectionConfig, DocumentStore, MongoStore};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| {
        eprintln!("MONGODB_URI is required");
        std::process::exit(1);
    });
    let database = std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "comanda".into());
    let raw = std::env::var("COMANDA_SEED").ok();
    let config = SeedConfig::from_var(raw.as_deref()).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    let store = MongoStore::connect(&uri, &database).unwrap_or_else(|e| {
        eprintln!("failed to connect to {database}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = store.create_collection(&CollectionConfig::new("Usuario").unique("correo")) {
        eprintln!("failed to create indexes: {e}");
        std::process::exit(1);
    }

    match seed(&store, &config, &mut rand::thread_rng()) {
        Ok(report) => tracing::info!(?report, "seed complete"),
        Err(e) => {
            eprintln!("seed failed: {e}");
            std::process::exit(1);
        }
    }
}
