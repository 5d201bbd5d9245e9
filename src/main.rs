use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use vidmeta::scheduler::QueuedScheduler;
use vidmeta::{logging, Config, VideoResolver};

#[derive(Parser, Debug)]
#[command(name = "vidmeta")]
#[command(about = "Look up YouTube video metadata through a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/vidmeta/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print metadata for one video
  Get {
    /// Video id
    id: String,
  },
  /// Print metadata for several videos as an object keyed by id
  GetMany {
    /// Video ids
    #[arg(required = true)]
    ids: Vec<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = logging::init()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  // Write-back is drained before exit so this run populates the cache
  let scheduler = Arc::new(QueuedScheduler::new());
  let resolver = VideoResolver::from_config(&config, scheduler.clone())?;

  let output = match args.command {
    Command::Get { id } => {
      let video = resolver
        .get(&id)
        .await?
        .ok_or_else(|| eyre!("Video {} not found", id))?;
      serde_json::to_string_pretty(&video)?
    }
    Command::GetMany { ids } => {
      let videos = resolver.get_many(&ids).await?;
      serde_json::to_string_pretty(&videos)?
    }
  };

  println!("{}", output);
  scheduler.run_pending().await;

  Ok(())
}
