use anyhow::Result;
use clap::Parser;
use sidetag::cli::{Cli, Commands};
use sidetag::{Sidetag, commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    // RUST_LOG wins over the command line flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let app = Sidetag::open(&cli.config, &cli.library).await?;

    match cli.command {
        Commands::Add(args) => commands::handle_add(args, app).await?,
        Commands::Edit(args) => commands::handle_edit(args, app).await?,
        Commands::Remove(args) => commands::handle_remove(args, app).await?,
        Commands::Clear(args) => commands::handle_clear(args, app).await?,
        Commands::Show(args) => commands::handle_show(args, app).await?,
        Commands::Collect(args) => commands::handle_collect(args, app).await?,
        Commands::Library(args) => commands::handle_library(args, app).await?,
    }

    Ok(())
}
