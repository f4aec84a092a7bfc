#![cfg(not(tarpaulin_include))]

use std::sync::Arc;

use csm_dashboard::app;
use csm_dashboard::config::{Backend, Config};
use csm_dashboard::google::GoogleSheets;
use csm_dashboard::sheets::{CsvDirSheets, MemorySheets, SheetClient};
use log::info;

/// Main entry point for the dashboard web application
///
/// Reads configuration from the environment, opens the configured
/// spreadsheet backend and serves the dashboard until interrupted.
///
/// The Google backend uses a blocking HTTP client, so it is created here,
/// before the async runtime starts, and dropped after it has shut down.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let client: Arc<dyn SheetClient> = match &config.backend {
        Backend::Google {
            spreadsheet_id,
            access_token,
        } => {
            info!("using Google Sheets spreadsheet {}", spreadsheet_id);
            Arc::new(GoogleSheets::new(spreadsheet_id, access_token)?)
        }
        Backend::CsvDir(dir) => {
            info!("using CSV worksheets in {}", dir.display());
            Arc::new(CsvDirSheets::new(dir.clone()))
        }
        Backend::Memory => {
            info!("using an empty in-memory workbook");
            Arc::new(MemorySheets::new())
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(app::run(config, client.clone()));
    drop(runtime);
    drop(client);

    result
}
