use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movierec_core::config::{expand_path, Config, Settings};
use movierec_core::types::Recommendation;
use movierec_engine::Recommender;
use movierec_similarity::{build_artifacts, ArtifactPaths, SimilarityIndex};

#[derive(Parser)]
#[command(name = "movierec")]
#[command(about = "Content-based movie recommendations from a static catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the catalog and similarity artifacts from the raw CSV
    Build {
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Write both artifacts into this directory instead of the configured paths
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Movies most similar to a title
    Similar {
        title: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Best rated movies having every given genre
    Genres {
        #[arg(required = true)]
        genres: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Best rated movies overall
    Top {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List every genre in the catalog
    Categories,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn artifact_paths(settings: &Settings, out_dir: Option<&Path>) -> Result<ArtifactPaths> {
    let cwd = std::env::current_dir().context("resolving the working directory")?;
    let configured = ArtifactPaths::from_settings(&settings.data, &cwd);
    Ok(match out_dir {
        Some(dir) => ArtifactPaths::new(
            dir.join(configured.catalog.file_name().unwrap_or_else(|| OsStr::new("movies_data.bin"))),
            dir.join(configured.similarity.file_name().unwrap_or_else(|| OsStr::new("similarity_matrix.bin"))),
        ),
        None => configured,
    })
}

fn open(settings: &Settings) -> Result<Recommender<SimilarityIndex>> {
    let paths = artifact_paths(settings, None)?;
    Recommender::open(&paths, settings.recommend.limit)
        .with_context(|| format!("opening artifacts {} / {} (run `movierec build` first)", paths.catalog.display(), paths.similarity.display()))
}

fn print_ranked(results: &[Recommendation]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. {}  (score={:.4}, id={})", i + 1, r.title, r.score, r.id);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let settings = config.settings()?;
    init_logging(&settings.log.level);

    match cli.command {
        Command::Build { catalog, out_dir } => {
            let csv = catalog.unwrap_or_else(|| expand_path(&settings.data.catalog_csv));
            let paths = artifact_paths(&settings, out_dir.as_deref())?;
            let report = build_artifacts(&csv, &paths, &settings.features)?;
            println!("Built artifacts for {} movies", report.items);
            println!("  vocabulary:        {} terms", report.vocabulary_size);
            println!("  skipped rows:      {}", report.rows_skipped);
            println!("  duplicate ids:     {}", report.duplicate_ids);
            println!("  malformed fields:  {}", report.malformed_fields);
            println!("  empty documents:   {}", report.blank_documents);
            println!("  build id:          {:016x}", report.build_id);
            println!("  catalog:           {}", report.paths.catalog.display());
            println!("  similarity:        {}", report.paths.similarity.display());
        }
        Command::Similar { title, limit } => {
            let rec = open(&settings)?;
            let results = rec.similar_to_title(&title, limit.unwrap_or(rec.limit()))?;
            println!("Movies similar to \"{}\":", title);
            print_ranked(&results);
        }
        Command::Genres { genres, limit } => {
            let rec = open(&settings)?;
            let results = rec.by_categories(&genres, limit.unwrap_or(rec.limit()));
            println!("Top rated in {}:", genres.join(" + "));
            print_ranked(&results);
        }
        Command::Top { limit } => {
            let rec = open(&settings)?;
            print_ranked(&rec.top_rated(limit.unwrap_or(rec.limit())));
        }
        Command::Categories => {
            let rec = open(&settings)?;
            for c in rec.all_categories() {
                println!("{}", c);
            }
        }
    }
    Ok(())
}
