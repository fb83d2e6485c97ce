use csv_analyst::assistant::{Analyst, ResponseType};
use csv_analyst::charts::{chart_data, supported_chart_types, ChartKind};
use csv_analyst::context::{chunked_analysis, ChunkAnalysis, ContextAssembler, ContextProfile};
use csv_analyst::ingestion::load_csv;
use csv_analyst::insights::technical_opinion;
use csv_analyst::lexicon::Lexicon;
use csv_analyst::llm::LlmClient;
use csv_analyst::sampler::Sampler;
use csv_analyst::{profile, RelevanceGate, Settings};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csv-analyst")]
#[command(about = "Profile CSV datasets and answer questions about them with an LLM")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the LLM context for a CSV file
    Context {
        csv: PathBuf,

        /// quick, statistical or comprehensive
        #[arg(short, long, default_value = "comprehensive")]
        profile: String,
    },
    /// Print per-column profiles as JSON
    Profile { csv: PathBuf },
    /// Print the intelligent sample of a CSV file
    Sample {
        csv: PathBuf,

        /// Maximum sample rows (default: MAX_SAMPLE_SIZE)
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// Run one analysis over consecutive row chunks
    Chunks {
        csv: PathBuf,

        /// summary, quality or patterns
        #[arg(short, long, default_value = "summary")]
        analysis: String,

        /// Rows per chunk (default: CHUNK_SIZE)
        #[arg(short, long)]
        size: Option<usize>,
    },
    /// Check whether a question would pass the relevance gate
    Check {
        question: String,

        /// Comma-separated column names for context-aware checking
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
    },
    /// Print chart data as JSON
    Chart {
        csv: PathBuf,

        /// fraud_distribution, amount_distribution or time_series
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Print a technical assessment of a CSV file
    Opinion { csv: PathBuf },
    /// Ask a question about a CSV file
    Ask { csv: PathBuf, question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match args.command {
        Commands::Context { csv, profile } => run_context(&settings, csv, &profile),
        Commands::Profile { csv } => run_profile(&settings, csv),
        Commands::Sample { csv, max } => run_sample(&settings, csv, max),
        Commands::Chunks { csv, analysis, size } => run_chunks(&settings, csv, &analysis, size),
        Commands::Check { question, columns } => run_check(&settings, &question, columns),
        Commands::Chart { csv, kind } => run_chart(&settings, csv, kind.as_deref()),
        Commands::Opinion { csv } => run_opinion(&settings, csv),
        Commands::Ask { csv, question } => run_ask(settings, csv, &question).await,
    }
}

fn run_context(settings: &Settings, csv: PathBuf, profile: &str) -> Result<()> {
    let profile: ContextProfile = profile.parse()?;
    let dataset = load_csv(&csv, settings)?;
    let assembler = ContextAssembler::new(Sampler::new(settings.max_sample_size));
    println!("{}", assembler.assemble(&dataset, profile)?);
    Ok(())
}

fn run_profile(settings: &Settings, csv: PathBuf) -> Result<()> {
    let dataset = load_csv(&csv, settings)?;
    let profiles = profile(&dataset)?;
    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}

fn run_sample(settings: &Settings, csv: PathBuf, max: Option<usize>) -> Result<()> {
    let dataset = load_csv(&csv, settings)?;
    let sampler = Sampler::new(max.unwrap_or(settings.max_sample_size));
    let sample = sampler.sample(&dataset)?;
    info!("Sampled {} of {} rows", sample.data.height(), dataset.height());
    println!("{}", sample.render()?);
    Ok(())
}

fn run_chunks(settings: &Settings, csv: PathBuf, analysis: &str, size: Option<usize>) -> Result<()> {
    let analysis: ChunkAnalysis = analysis.parse()?;
    let dataset = load_csv(&csv, settings)?;
    for chunk in chunked_analysis(&dataset, analysis, size.unwrap_or(settings.chunk_size))? {
        println!(
            "--- Chunk {} (rows {}-{}, {} rows) ---",
            chunk.chunk_id, chunk.start_row, chunk.end_row, chunk.size
        );
        println!("{}\n", chunk.analysis);
    }
    Ok(())
}

fn run_check(settings: &Settings, question: &str, columns: Option<Vec<String>>) -> Result<()> {
    let lexicon = Lexicon::load_or_builtin(settings.lexicon_path.as_deref())?;
    let gate = RelevanceGate::new(lexicon)
        .with_length_bounds(settings.min_question_length, settings.max_question_length);
    let decision = gate.evaluate(question, columns.as_deref());
    println!(
        "{} ({:?}: {})",
        if decision.relevant { "relevant" } else { "not relevant" },
        decision.mode,
        decision.reason
    );
    Ok(())
}

fn run_chart(settings: &Settings, csv: PathBuf, kind: Option<&str>) -> Result<()> {
    let Some(kind) = kind else {
        for (kind, description) in supported_chart_types() {
            println!("{:<20} {}", kind.id(), description);
        }
        return Ok(());
    };
    let kind: ChartKind = kind.parse()?;
    let dataset = load_csv(&csv, settings)?;
    let chart = chart_data(&dataset, kind)?;
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

fn run_opinion(settings: &Settings, csv: PathBuf) -> Result<()> {
    let dataset = load_csv(&csv, settings)?;
    println!("{}", technical_opinion(&dataset)?);
    Ok(())
}

async fn run_ask(settings: Settings, csv: PathBuf, question: &str) -> Result<()> {
    let llm = LlmClient::from_settings(&settings)?;
    let mut analyst = Analyst::new(settings, Box::new(llm))?;
    analyst.load_csv(&csv)?;

    let response = analyst.ask(question).await?;
    match response.kind {
        ResponseType::Answer => {
            println!("{}", response.message);
            if let Some(insights) = response.insights {
                println!("\n=== Additional insights ===\n{}", insights);
            }
        }
        _ => println!("{}", response.message),
    }
    Ok(())
}
