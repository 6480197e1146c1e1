mod app;
mod cache;
mod cli;
mod config;
mod connectivity;
mod event;
mod logging;
mod resource;
mod services;
mod supabase;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cyberfolio")]
#[command(about = "A cyberpunk portfolio for the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cyberfolio/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep caches and preferences in memory only
  #[arg(long, global = true)]
  no_persist: bool,

  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let command = args.command.unwrap_or(cli::Command::Tui);
  let interactive = matches!(command, cli::Command::Tui);

  // The TUI owns the terminal, so its logs go to a file
  let target = if interactive {
    logging::LogTarget::File(logging::default_log_dir()?)
  } else {
    logging::LogTarget::Stderr
  };
  let _log_guard = logging::init(target)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let services = services::Services::from_config(&config, !args.no_persist)?;

  if interactive {
    let mut app = app::App::new(config, services);
    app.run().await
  } else {
    cli::run(command, &services).await
  }
}
