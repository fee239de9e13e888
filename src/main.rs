use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use telex_sentiment::config::Config;
use telex_sentiment::integration::IntegrationDescriptor;
use telex_sentiment::moderation::delivery::TargetDelivery;
use telex_sentiment::moderation::moderator::warning_message;
use telex_sentiment::moderation::MessageModerator;
use telex_sentiment::sentiment::{create_scorer, oracle::SentimentOracle};
use telex_sentiment::web::{self, AppState};

/// Telex sentiment modifier.
///
/// Scores incoming chat messages with an external sentiment provider and
/// flags the ones below the toxicity threshold.
#[derive(Parser)]
#[command(name = "telex-sentiment", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the modifier HTTP server
    Serve {
        /// Port to listen on (default: $PORT or 3000)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Score a single message and show the moderation decision
    Score {
        /// The message text
        text: String,

        /// Also fetch the detailed breakdown (Comprehend only)
        #[arg(long)]
        detailed: bool,

        /// Threshold to compare against (default: $TOXICITY_THRESHOLD or -0.5)
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
    },

    /// Print the integration descriptor JSON
    Integration,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("telex_sentiment=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_scorer()?;

            let oracle = SentimentOracle::new(
                create_scorer(&config)?,
                config.moderation.failure_policy,
            );
            let mut moderator = MessageModerator::new(oracle, config.moderation.clone());
            if config.moderation.forward_to_target {
                moderator = moderator.with_delivery(TargetDelivery::new()?);
            }

            info!(
                backend = config.backend.name(),
                threshold = config.moderation.default_threshold,
                failure_policy = ?config.moderation.failure_policy,
                timeout_policy = ?config.moderation.timeout_policy,
                budget_ms = config.moderation.time_budget.as_millis() as u64,
                "Starting modifier"
            );

            let state = AppState::new(
                moderator,
                IntegrationDescriptor::from_config(&config),
                config.check_provider_health,
            );
            web::run_server(state, port.unwrap_or(config.port), &bind).await?;
        }

        Commands::Score {
            text,
            detailed,
            threshold,
        } => {
            let config = Config::load()?;
            config.require_scorer()?;

            let oracle = SentimentOracle::new(
                create_scorer(&config)?,
                config.moderation.failure_policy,
            );
            let threshold = threshold.unwrap_or(config.moderation.default_threshold);
            let result = oracle.analyze(&text, detailed).await?;

            println!("Backend:   {}", config.backend.name());
            println!("Score:     {:.3}", result.score);
            println!("Threshold: {threshold:.2}");
            if let Some(d) = &result.detailed {
                println!(
                    "Breakdown: {:?} (positive {:.2}, negative {:.2}, neutral {:.2}, mixed {:.2})",
                    d.sentiment, d.positive, d.negative, d.neutral, d.mixed
                );
            }

            if result.score < threshold {
                println!("\n{}", "Flagged".red().bold());
                println!("{}", warning_message(result.score, &text));
            } else {
                println!("\n{}", "Passed".green().bold());
                println!("{text}");
            }
        }

        Commands::Integration => {
            let config = Config::load()?;
            let descriptor = IntegrationDescriptor::from_config(&config);
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
    }

    Ok(())
}
