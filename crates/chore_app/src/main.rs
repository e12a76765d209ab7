use chore_app::app::{run, AppConfig, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default();
    match run(config, cli) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            eprintln!("chores: {err:#}");
            std::process::exit(1);
        }
    }
}
