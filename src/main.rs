use std::sync::Arc;

use tokenbroker::config::{load_config, print_schema};
use tokenbroker::startup;
use tokenbroker::utils::logger::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `tokenbroker --schema` prints the config JSON schema and exits.
    if std::env::args().any(|arg| arg == "--schema") {
        print_schema();
        return Ok(());
    }

    let config = Arc::new(load_config());
    init_logging(&config.logging);

    startup::run(config).await
}
