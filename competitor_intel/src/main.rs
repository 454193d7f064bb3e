use anyhow::Context;
use clap::{Parser, ValueEnum};
use competitor_intel::{export, Analyzer, AnalysisConfig, ApiKey, OpenAiClient, SlotPaths, Target};
use dotenv::dotenv;
use std::{num::NonZeroU32, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
    Both,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Competitive analysis of a company website", long_about = None)]
struct Args {
    /// Company website to analyse
    #[arg(short, long)]
    url: String,

    /// Company name (derived from the URL when omitted)
    #[arg(short = 'n', long)]
    company: Option<String>,

    /// Language-model API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Model used for every category
    #[arg(long, env = "INTEL_MODEL")]
    model: Option<String>,

    /// Maximum characters kept per page
    #[arg(short, long)]
    max_content_length: Option<usize>,

    /// Whole-run budget in seconds
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Throttle model calls to this many per minute
    #[arg(long)]
    requests_per_minute: Option<u32>,

    /// Only probe the primary path of each page
    #[arg(long)]
    no_alternate_paths: bool,

    /// Export format
    #[arg(short, long, value_enum, default_value_t = Format::Both)]
    format: Format,

    /// Directory the report files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

impl Args {
    fn config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::from_env();
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(chars) = self.max_content_length {
            config.max_content_chars = chars;
        }
        if let Some(secs) = self.run_timeout {
            config.run_timeout = Duration::from_secs(secs);
        }
        if let Some(rpm) = self.requests_per_minute.and_then(NonZeroU32::new) {
            config.requests_per_minute = Some(rpm);
        }
        if self.no_alternate_paths {
            config.slot_paths = SlotPaths::primary_only();
        }
        config
    }

    fn target(&self) -> Result<Target, competitor_intel::AnalysisError> {
        match &self.company {
            Some(company) => Target::new(company, &self.url),
            None => Target::from_url(&self.url),
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "competitor_intel=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = args.config();
    let target = args.target()?;

    let client = OpenAiClient::new(ApiKey::new(args.api_key.clone()), config.model.clone())?;
    let analyzer = Analyzer::new(&config, client)?;
    let report = analyzer.analyze(&target).await?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    let stem = args.output_dir.join(export::file_stem(&report));

    if matches!(args.format, Format::Json | Format::Both) {
        let path = stem.with_extension("json");
        export::save_json(&report, &path)?;
        println!("✅ {} written", path.display());
    }
    if matches!(args.format, Format::Text | Format::Both) {
        let path = stem.with_extension("txt");
        export::save_text(&report, &path)?;
        println!("✅ {} written", path.display());
    }

    for failed in report.failures() {
        if let Some(reason) = failed.failure() {
            eprintln!("⚠️ {} analysis failed: {}", failed.category, reason);
        }
    }

    Ok(())
}
