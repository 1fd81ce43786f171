use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use deskmatch::{seed::seed_demo_data, MatchService};
use deskmatch_core::{
    default_snapshot, EntityKey, Feedback, FeedbackLabel, MatchResult, RawTradeRecord,
};
use deskmatch_storage::{FilePersistence, MemoryStore};

/// Explainable idea/client relevance ranking for the desk
#[derive(Parser, Debug)]
#[command(name = "deskmatch")]
#[command(about = "Ranks trade ideas against client profiles, and clients against ideas", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Evaluation date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a small demo dataset and build profiles
    Seed,
    /// Show the taxonomy tags extracted from a piece of text
    ExtractTags {
        /// Free text, e.g. a call note or idea body
        text: String,
    },
    /// Recompose all profiles from the observation log
    RecomputeProfiles,
    /// Ingest blotter rows from a JSON file and rebuild feature buckets
    IngestTrades {
        /// Path to a JSON array of trade records
        file: PathBuf,
    },
    /// Rank ideas for one client
    MatchClient {
        client_id: i64,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },
    /// Rank clients for one idea
    MatchIdea {
        idea_id: i64,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },
    /// Rank portfolio managers for one idea
    MatchPms {
        idea_id: i64,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },
    /// Attach feedback to a result of a previous run
    Feedback {
        run_id: i64,
        /// Target entity, e.g. CLIENT:2 or IDEA:1
        target: String,
        #[arg(value_enum)]
        label: LabelArg,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LabelArg {
    Useful,
    NotUseful,
    Contacted,
    Traded,
}

impl From<LabelArg> for FeedbackLabel {
    fn from(label: LabelArg) -> Self {
        match label {
            LabelArg::Useful => FeedbackLabel::Useful,
            LabelArg::NotUseful => FeedbackLabel::NotUseful,
            LabelArg::Contacted => FeedbackLabel::Contacted,
            LabelArg::Traded => FeedbackLabel::Traded,
        }
    }
}

fn parse_entity_ref(value: &str) -> anyhow::Result<EntityKey> {
    let (kind, id) = value
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected TYPE:ID, got {value:?}"))?;
    let id: i64 = id.parse()?;
    match kind.to_ascii_uppercase().as_str() {
        "CLIENT" => Ok(EntityKey::client(id)),
        "IDEA" => Ok(EntityKey::idea(id)),
        "PM" => Ok(EntityKey::pm(id)),
        other => Err(anyhow::anyhow!("unknown entity type {other:?}")),
    }
}

fn print_results(results: &[MatchResult]) {
    for (pos, result) in results.iter().enumerate() {
        println!(
            "{:>3}. {} [{}] final={:.3} ({})",
            pos + 1,
            result.target_name,
            result.target,
            result.scores.final_score,
            result.explanation.explanation_text,
        );
        if !result.explanation.matched_tags.is_empty() {
            let tags: Vec<String> = result
                .explanation
                .matched_tags
                .iter()
                .map(|t| format!("{}={:.2}", t.tag_code, t.confidence))
                .collect();
            println!("     tags: {}", tags.join(", "));
        }
        if !result.explanation.top_terms.is_empty() {
            println!("     terms: {}", result.explanation.top_terms.join(", "));
        }
        if let Some(evidence) = &result.explanation.feature_evidence {
            println!(
                "     activity: {} ({}) trades={:.0} 90d={:.1}",
                evidence.region, evidence.stage, evidence.trade_count_sum, evidence.score_90d_sum
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting deskmatch v{}", env!("CARGO_PKG_VERSION"));

    let now = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let store = Arc::new(MemoryStore::new());
    let persistence = FilePersistence::new(&args.data_dir)?;
    let service =
        MatchService::new(store, default_snapshot()).with_persistence(persistence)?;

    match args.command {
        Command::Seed => {
            seed_demo_data(service.store(), now);
            let profiles = service.recompute_all_profiles(now);
            let warnings = service.ingest_trades(Vec::new(), now);
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            println!("Seeded demo data: {profiles} profiles composed");
        }
        Command::ExtractTags { text } => {
            for tag in service.extract_tags(&text) {
                println!("{} {:.2}", tag.tag_code, tag.confidence);
            }
        }
        Command::RecomputeProfiles => {
            let count = service.recompute_all_profiles(now);
            println!("Recomputed {count} profiles");
        }
        Command::IngestTrades { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let records: Vec<RawTradeRecord> = serde_json::from_str(&raw)?;
            let count = records.len();
            let warnings = service.ingest_trades(records, now);
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            println!("Ingested {count} records ({} excluded)", warnings.len());
        }
        Command::MatchClient { client_id, top_n } => {
            let (run, results) = service.match_ideas_for_client(client_id, top_n, now)?;
            println!("Run {} ({:?}) for {}", run.run_id, run.run_type, run.input_ref);
            print_results(&results);
        }
        Command::MatchIdea { idea_id, top_n } => {
            let (run, results) = service.match_clients_for_idea(idea_id, top_n, now)?;
            println!("Run {} ({:?}) for {}", run.run_id, run.run_type, run.input_ref);
            print_results(&results);
        }
        Command::MatchPms { idea_id, top_n } => {
            let (run, results) = service.match_pms_for_idea(idea_id, top_n, now)?;
            println!("Run {} ({:?}) for {}", run.run_id, run.run_type, run.input_ref);
            print_results(&results);
        }
        Command::Feedback { run_id, target, label, comment } => {
            let target = parse_entity_ref(&target)?;
            service.add_feedback(Feedback {
                run_id,
                target,
                label: label.into(),
                comment,
            })?;
            println!("Feedback recorded for run {run_id}");
        }
    }

    service.save()?;
    Ok(())
}
