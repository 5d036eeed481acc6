use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use shipdesk::cli::{self, App, Command};
use shipdesk::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = std::env::args().collect();
    let program = if args.is_empty() { "shipdesk".to_string() } else { args.remove(0) };
    let command = match cli::parse_args(&args) {
        Ok(Command::Help) => {
            println!("{}", cli::usage(&program));
            return Ok(());
        }
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::usage(&program));
            std::process::exit(2);
        }
    };

    let config = ClientConfig::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "shipdesk",
        "shipdesk starting: RUST_LOG='{}', api_base={}, hub_path={}, state_file='{}'",
        rust_log, config.api_base, config.hub_path, config.state_file.display()
    );

    let app = App::new(config)?;
    app.run(command).await
}
