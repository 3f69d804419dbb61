use acuity_webhooks_cli::run_cli;

#[tokio::main]
async fn main() {
    // Logging may not be initialized yet, so report on stderr directly
    if let Err(e) = run_cli().await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
