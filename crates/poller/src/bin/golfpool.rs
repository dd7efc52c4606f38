use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use poller::{
    Config, EntryImport, FixtureProvider, JobRegistry, PollContext, SlashGolfClient, StoreSource,
    SyncService, TournamentKey, apply_rebuys, import_entries,
};
use scoring::models::{BonusType, Rebuy, RebuyType};
use scoring::services::{
    LogNotifier, ScoreCalculator, ScoringRules, award_manual_bonus, rank_entries,
    ranking_analytics::{entry_history, ranking_analytics},
};
use scoring::{Database, MemoryStore, ScoreStore};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "golfpool")]
#[command(about = "Fantasy golf pool scoring", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Fetch the tournament and store a snapshot of its current round
    Sync {
        #[command(flatten)]
        tournament: ProviderTournamentArgs,
    },
    /// Load entries from a JSON file
    ImportEntries {
        #[arg(long)]
        tournament_id: Uuid,

        file: PathBuf,
    },
    /// Replace picks on a participant's existing entry
    ApplyRebuys {
        #[arg(long)]
        tournament_id: Uuid,

        #[arg(long)]
        participant: String,

        #[arg(long)]
        rebuy_type: RebuyType,

        /// ORIGINAL=REPLACEMENT player ids, repeatable
        #[arg(long = "rebuy", value_parser = parse_rebuy, required = true)]
        rebuys: Vec<Rebuy>,
    },
    /// Score every entry for one round
    Calculate {
        #[arg(long)]
        tournament_id: Uuid,

        #[arg(long)]
        round: Option<i32>,
    },
    /// Rescore rounds 1 through the current round
    CalculateAll {
        #[arg(long)]
        tournament_id: Uuid,
    },
    /// Fetch every entry player's scorecard and rescore the round
    RecheckBonuses {
        #[arg(long)]
        tournament_id: Uuid,

        #[arg(long)]
        round: Option<i32>,
    },
    /// Record a GIR or fairways leader bonus
    AwardBonus {
        #[arg(long)]
        tournament_id: Uuid,

        #[arg(long)]
        round: i32,

        #[arg(long)]
        bonus_type: BonusType,

        #[arg(long)]
        player_id: String,

        #[arg(long)]
        points: Option<i32>,
    },
    /// Movers, position spread and time in lead, or one entry's history
    Analytics {
        #[arg(long)]
        tournament_id: Uuid,

        #[arg(long)]
        entry_id: Option<Uuid>,
    },
    /// Poll the provider until Ctrl-C
    Watch {
        #[arg(long)]
        tournament_id: Uuid,
    },
    /// Score a recorded fixture in memory and print the standings
    DryRun { fixture: PathBuf },
}

#[derive(Args)]
struct ProviderTournamentArgs {
    #[arg(long, default_value = "1")]
    org_id: String,

    #[arg(long)]
    tourn_id: String,

    #[arg(long)]
    year: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "golfpool={},poller={},scoring={}",
                    log_level, log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Commands::DryRun { fixture } = &cli.command {
        return dry_run(fixture).await;
    }

    let config = Config::from_env()?;
    let database = Database::connect(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    let store = database.store();
    let rules = ScoringRules::default();
    let notifier = LogNotifier;
    let calculator = ScoreCalculator::new(&store, &rules, &notifier);

    match cli.command {
        Commands::Migrate => {
            database.run_migrations().await.context("Migration failed")?;
            tracing::info!("✓ Migrations applied");
        }
        Commands::Sync { tournament } => {
            let provider = slash_golf(&config)?;
            let key = TournamentKey::new(tournament.org_id, tournament.tourn_id, tournament.year);
            let report = SyncService::new(&store, &provider).sync(&key).await?;
            print_json(&report)?;
        }
        Commands::ImportEntries {
            tournament_id,
            file,
        } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let imports: Vec<EntryImport> = serde_json::from_str(&raw)?;
            let report = import_entries(&store, tournament_id, imports).await?;
            print_json(&report)?;
        }
        Commands::ApplyRebuys {
            tournament_id,
            participant,
            rebuy_type,
            rebuys,
        } => {
            let report =
                apply_rebuys(&store, tournament_id, &participant, rebuy_type, rebuys).await?;
            print_json(&report)?;
        }
        Commands::Calculate {
            tournament_id,
            round,
        } => {
            let outcome = calculator
                .calculate_scores_for_tournament(tournament_id, round)
                .await?;
            print_json(&outcome)?;
        }
        Commands::CalculateAll { tournament_id } => {
            let report = calculator.calculate_all_rounds(tournament_id).await?;
            print_json(&report)?;
        }
        Commands::RecheckBonuses {
            tournament_id,
            round,
        } => {
            let provider = slash_golf(&config)?;
            let report = SyncService::new(&store, &provider)
                .recheck_entry_players(&calculator, tournament_id, round)
                .await?;
            print_json(&report)?;
        }
        Commands::AwardBonus {
            tournament_id,
            round,
            bonus_type,
            player_id,
            points,
        } => {
            let outcome = award_manual_bonus(
                &store,
                &rules,
                tournament_id,
                round,
                bonus_type,
                &player_id,
                points,
            )
            .await?;
            print_json(&outcome)?;
        }
        Commands::Analytics {
            tournament_id,
            entry_id: Some(entry_id),
        } => {
            let history = entry_history(&store, tournament_id, entry_id).await?;
            print_json(&history)?;
        }
        Commands::Analytics {
            tournament_id,
            entry_id: None,
        } => {
            let analytics = ranking_analytics(&store, tournament_id).await?;
            print_json(&analytics)?;
        }
        Commands::Watch { tournament_id } => {
            watch(&config, database.clone(), tournament_id).await?;
        }
        Commands::DryRun { .. } => unreachable!("handled before connecting"),
    }

    database.close().await;
    Ok(())
}

fn slash_golf(config: &Config) -> Result<SlashGolfClient> {
    SlashGolfClient::new(&config.slash_golf_api_host, &config.slash_golf_api_key)
        .context("Cannot create Slash Golf client")
}

fn parse_rebuy(raw: &str) -> std::result::Result<Rebuy, String> {
    match raw.split_once('=') {
        Some((original, replacement))
            if !original.trim().is_empty() && !replacement.trim().is_empty() =>
        {
            Ok(Rebuy {
                original_player_id: original.trim().to_string(),
                replacement_player_id: replacement.trim().to_string(),
            })
        }
        _ => Err(format!("expected ORIGINAL=REPLACEMENT, got '{}'", raw)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn watch(config: &Config, database: Database, tournament_id: Uuid) -> Result<()> {
    let stores: Arc<dyn StoreSource> = Arc::new(database);
    stores.acquire().await?.tournament(tournament_id).await?;

    let ctx = PollContext {
        stores,
        provider: Arc::new(slash_golf(config)?),
        notifier: Arc::new(LogNotifier),
        rules: Arc::new(ScoringRules::default()),
        settings: config.poll,
    };

    let registry = JobRegistry::new();
    registry.start(ctx, tournament_id)?;
    tracing::info!("Watching tournament {} (Ctrl-C to stop)", tournament_id);

    tokio::signal::ctrl_c().await?;
    registry.stop_all().await;
    Ok(())
}

#[derive(Serialize)]
struct Standing {
    position: i32,
    participant_name: String,
    total_points: i32,
    points_behind_leader: i32,
}

async fn dry_run(path: &Path) -> Result<()> {
    let (provider, fixture) = FixtureProvider::load(path)
        .await
        .with_context(|| format!("Cannot load fixture {}", path.display()))?;
    let store = MemoryStore::new();
    let rules = ScoringRules::default();
    let sync = SyncService::new(&store, &provider);

    let key = TournamentKey::from(&fixture.tournament.to_tournament()?);
    let tournament = sync.sync_tournament(&key).await?;
    let report = import_entries(&store, tournament.tournament_id, fixture.entries).await?;
    if report.imported == 0 {
        bail!("Fixture has no valid entries");
    }

    let calculator = ScoreCalculator::new(&store, &rules, &LogNotifier);
    let recheck = sync
        .recheck_entry_players(&calculator, tournament.tournament_id, None)
        .await?;
    for error in recheck.sync.errors.iter().chain(&report.errors) {
        tracing::warn!("{}", error);
    }

    let entries = store.entries(tournament.tournament_id).await?;
    let scores = store
        .daily_scores_for_tournament(tournament.tournament_id)
        .await?;
    let standings: Vec<Standing> = rank_entries(&entries, &scores)
        .into_iter()
        .map(|ranked| Standing {
            position: ranked.position,
            participant_name: entries
                .iter()
                .find(|e| e.entry_id == ranked.entry_id)
                .map(|e| e.participant_name.clone())
                .unwrap_or_default(),
            total_points: ranked.total_points,
            points_behind_leader: ranked.points_behind_leader,
        })
        .collect();
    print_json(&standings)
}
