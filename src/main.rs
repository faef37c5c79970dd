//! Live commentary command line

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use live_commentary::commentary::CommentaryStyle;
use live_commentary::pipeline::{Collaborators, NarrationPipeline, Supervisor};
use live_commentary::speech::{SpeechService, VoiceProfiles};
use live_commentary::stats::StatsFeedExt;
use live_commentary::{logging, metrics, Config};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stop each pipeline after this many cycles
    #[arg(long, global = true)]
    cycles: Option<u64>,

    /// Force a commentary style instead of choosing one per cycle
    #[arg(long, global = true)]
    style: Option<CommentaryStyle>,

    /// Print Prometheus metrics on exit
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Narrate a single game
    Narrate {
        #[arg(long)]
        game: String,
    },
    /// Narrate every live game
    Live,
    /// List live games
    Games,
    /// List voices offered by the speech service
    Voices,
    /// Delete old synthesized clips
    Cleanup {
        #[arg(long, default_value_t = 24)]
        max_age_hours: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.style.is_some() {
        config.pipeline.style = cli.style;
    }

    logging::init(&config.logging)?;

    let collaborators =
        Collaborators::from_config(&config).context("Failed to create collaborator clients")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    match cli.command {
        Command::Narrate { game } => {
            let pipeline = NarrationPipeline::from_config(game, &config, &collaborators);
            let summary = pipeline.run(shutdown_rx, cli.cycles).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Live => {
            let supervisor = Supervisor::new(config.clone(), collaborators);
            let summaries = supervisor.run(shutdown_rx, cli.cycles).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Games => {
            let games = collaborators.feed.get_live_games().await;
            if games.is_empty() {
                println!("No live games");
            }
            for game in games {
                println!(
                    "{}\t{} vs {}\t{}",
                    game.game_id,
                    game.home_team,
                    game.away_team,
                    game.status.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Voices => {
            let speech = speech_service(&config, &collaborators)?;
            for voice in speech.available_voices().await {
                println!(
                    "{}\t{}\t{}\t{}",
                    voice.name,
                    voice.locale,
                    voice.gender,
                    voice.styles.join(",")
                );
            }
        }
        Command::Cleanup { max_age_hours } => {
            let speech = speech_service(&config, &collaborators)?;
            let removed = speech.cleanup_old_files(Duration::from_secs(max_age_hours * 3600))?;
            println!("Removed {} file(s) from {}", removed, speech.output_dir().display());
        }
    }

    if cli.print_metrics {
        print!("{}", metrics::render());
    }

    Ok(())
}

fn speech_service(config: &Config, collaborators: &Collaborators) -> Result<SpeechService> {
    let Some(backend) = collaborators.speech.clone() else {
        bail!("Speech synthesis is disabled (speech.enabled = false)");
    };
    Ok(SpeechService::new(
        backend,
        VoiceProfiles::from_config(&config.voices),
        config.speech.output_dir.clone(),
    ))
}
