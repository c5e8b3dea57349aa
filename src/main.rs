// Entrypoint for the CLI application.
// - Loads `.env`, sets up logging and reads the configuration once.
// - Keeps `main` small: build the API client and file store, then hand
//   them to the menu loop.

use n8n_cli::api::ApiClient;
use n8n_cli::config::Config;
use n8n_cli::prompt::TermPrompt;
use n8n_cli::store::WorkflowStore;
use n8n_cli::ui::{main_menu, Session};

fn main() -> anyhow::Result<()> {
    // Real environment variables take precedence over `.env`.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    let api = ApiClient::new(&config)?;
    log::debug!("using n8n instance at {}", api.base_url());
    let store = WorkflowStore::from_config(&config);

    // Blocks until the user picks "Exit".
    main_menu(&Session::new(api, store), &mut TermPrompt)?;
    Ok(())
}
