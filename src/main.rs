use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use corpus_spans::data::DocumentParser;
use corpus_spans::engine::constants::DEFAULT_FIELD;
use corpus_spans::engine::{load_config, EngineConfig, SearchEngine};
use corpus_spans::index::PositionalIndex;
use corpus_spans::pattern::Pattern;
use corpus_spans::results::HitList;
use corpus_spans::rewrite::rewrite_with_budget;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "corpus-spans")]
#[command(about = "Rewrite and run structural corpus patterns")]
#[command(version)]
struct Args {
    /// Engine configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rewritten pattern and its compiled plan
    Rewrite {
        /// JSON-encoded pattern, or a file holding one
        pattern: String,
    },
    /// Search a corpus and print the hits
    Search {
        /// JSON-encoded pattern, or a file holding one
        pattern: String,

        /// JSON or YAML corpus file, searched in memory
        #[arg(long, conflicts_with = "index")]
        corpus: Option<PathBuf>,

        /// Tantivy corpus index directory
        #[arg(long)]
        index: Option<PathBuf>,

        /// Print only a reproducible random sample of this many hits
        #[arg(long)]
        sample: Option<usize>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    match args.command {
        Command::Rewrite { pattern } => {
            let pattern = read_pattern(&pattern)?;
            let rewritten = rewrite_with_budget(&pattern, config.max_rewrite_passes)?;
            let engine = SearchEngine::from_documents(&[], config);
            let plan = engine.prepare(&pattern)?;
            println!("Pattern:   {}", pattern);
            println!("Rewritten: {}", rewritten);
            println!("Plan:      {}", plan.root());
        }
        Command::Search { pattern, corpus, index, sample, seed, json } => {
            let pattern = read_pattern(&pattern)?;
            match (corpus, index) {
                (Some(corpus), None) => {
                    let documents = DocumentParser::parse_file(&corpus)?;
                    let engine = SearchEngine::from_documents(&documents, config);
                    run_search(&engine, &pattern, sample, seed, json)?;
                }
                (None, Some(index)) => {
                    let engine = SearchEngine::open(&index, config)?;
                    run_search(&engine, &pattern, sample, seed, json)?;
                }
                _ => return Err(anyhow!("Either --corpus or --index is required")),
            }
        }
    }
    Ok(())
}

/// Parse a pattern given inline or as a path to a JSON file
fn read_pattern(arg: &str) -> Result<Pattern> {
    let path = Path::new(arg);
    let text = if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read pattern file {}", path.display()))?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).context("Invalid pattern JSON")
}

fn run_search<I: PositionalIndex>(
    engine: &SearchEngine<I>,
    pattern: &Pattern,
    sample: Option<usize>,
    seed: u64,
    json: bool,
) -> Result<()> {
    let mut hits = engine.search(pattern)?;
    if let Some(size) = sample {
        hits = hits.sample(size, seed);
    }
    if json {
        println!("{}", hits.to_json_pretty());
        return Ok(());
    }
    print_hits(engine.index(), &hits)
}

fn print_hits<I: PositionalIndex>(index: &I, hits: &HitList) -> Result<()> {
    println!("{} hits in {} documents", hits.len(), hits.doc_count());
    for hit in hits {
        let document = index.fetch_document(hit.segment, hit.doc)?;
        let (id, text) = match &document {
            Some(doc) => {
                let words = doc.get_tokens(DEFAULT_FIELD).unwrap_or_default();
                let start = (hit.start() as usize).min(words.len());
                let end = (hit.end() as usize).min(words.len());
                (doc.id.clone(), words[start..end].join(" "))
            }
            None => (format!("{}:{}", hit.segment, hit.doc), String::new()),
        };
        println!("{} [{}, {}) {}", id, hit.start(), hit.end(), text);
        for capture in hits.named_captures(hit) {
            println!("    {} = [{}, {})", capture.name, capture.span.start, capture.span.end);
        }
    }
    Ok(())
}
