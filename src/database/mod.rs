//! MongoDB connection setup.

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::info;

use crate::config::Config;

/// Builds a client for `config.mongodb_uri` and returns a handle on `config.database_name`.
///
/// The driver connects lazily; server selection and connect timeouts use
/// `config.db_timeout`. Call [`ping`] to check reachability.
pub async fn open(config: &Config) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.app_name = Some("business-magnifier".to_string());
    options.server_selection_timeout = Some(config.db_timeout);
    options.connect_timeout = Some(config.db_timeout);

    let client = Client::with_options(options)?;
    Ok(client.database(&config.database_name))
}

/// Round-trips a `ping` command.
pub async fn ping(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(doc! { "ping": 1 }).await?;
    info!(database = %db.name(), "MongoDB reachable");
    Ok(())
}
