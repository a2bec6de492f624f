//! Wordbag CLI
//!
//! Builds vocabularies from labeled JSON Lines corpora and encodes corpora
//! into binary document-term matrices.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wordbag_core::{encode, Corpus, Tokenizer, Vocabulary, VocabularyBuilder, VocabularyParams};

#[derive(Parser)]
#[command(name = "wordbag")]
#[command(about = "Bag-of-words feature extraction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a vocabulary from a training corpus
    Build {
        /// Training corpus (JSON Lines with id, text, label)
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Where to write the vocabulary JSON
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Minimum corpus-wide count for a term to be kept
        #[arg(short, long, default_value_t = VocabularyParams::default().min_count)]
        min_count: u64,

        /// Keep only the most frequent terms
        #[arg(long)]
        max_features: Option<usize>,
    },

    /// Encode a corpus against a saved vocabulary
    Encode {
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Vocabulary JSON produced by `build`
        #[arg(short, long, value_name = "PATH")]
        vocabulary: PathBuf,

        /// Where to write the binary matrix
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Also write labels, one class index per line
        #[arg(long, value_name = "PATH")]
        labels: Option<PathBuf>,
    },

    /// Print the tokens of each line read from stdin
    Tokenize,

    /// Report vocabulary diagnostics
    Stats {
        #[arg(value_name = "VOCABULARY")]
        vocabulary: PathBuf,

        /// Number of rank/count pairs to show
        #[arg(short, long, default_value_t = 20)]
        top: usize,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: Level = cli
        .log_level
        .parse()
        .with_context(|| format!("Invalid log level {:?}", cli.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build {
            corpus,
            output,
            min_count,
            max_features,
        } => run_build(corpus, output, min_count, max_features),
        Commands::Encode {
            corpus,
            vocabulary,
            output,
            labels,
        } => run_encode(corpus, vocabulary, output, labels),
        Commands::Tokenize => run_tokenize(),
        Commands::Stats {
            vocabulary,
            top,
            json,
        } => run_stats(vocabulary, top, json),
    }
}

fn run_build(
    corpus_path: PathBuf,
    output: PathBuf,
    min_count: u64,
    max_features: Option<usize>,
) -> Result<()> {
    let corpus = Corpus::load(&corpus_path)
        .with_context(|| format!("Failed to load corpus {}", corpus_path.display()))?;

    let mut params = VocabularyParams::new(min_count);
    params.max_features = max_features;
    let vocab = VocabularyBuilder::new(params).build(corpus.records());

    vocab
        .save(&output)
        .with_context(|| format!("Failed to write vocabulary {}", output.display()))?;

    let stats = vocab.stats();
    info!(
        num_docs = stats.num_docs,
        vocab_size = stats.vocab_size,
        "Vocabulary written to {}",
        output.display()
    );
    println!(
        "{} documents, {} tokens, {} distinct terms, {} kept (min_count {})",
        stats.num_docs, stats.total_tokens, stats.distinct_terms, stats.vocab_size, stats.min_count
    );
    Ok(())
}

fn run_encode(
    corpus_path: PathBuf,
    vocab_path: PathBuf,
    output: PathBuf,
    labels_path: Option<PathBuf>,
) -> Result<()> {
    let vocab = Vocabulary::load(&vocab_path)
        .with_context(|| format!("Failed to load vocabulary {}", vocab_path.display()))?;
    let corpus = Corpus::load(&corpus_path)
        .with_context(|| format!("Failed to load corpus {}", corpus_path.display()))?;

    let matrix = encode(corpus.records(), &vocab);
    matrix
        .save(&output)
        .with_context(|| format!("Failed to write matrix {}", output.display()))?;

    if let Some(labels_path) = labels_path {
        let mut contents = String::with_capacity(corpus.len() * 2);
        for label in corpus.labels() {
            contents.push_str(&label.as_u8().to_string());
            contents.push('\n');
        }
        std::fs::write(&labels_path, contents)
            .with_context(|| format!("Failed to write labels {}", labels_path.display()))?;
    }

    let (rows, cols) = matrix.shape();
    println!("{rows} x {cols} matrix, {} non-zero entries", matrix.nnz());
    Ok(())
}

fn run_tokenize() -> Result<()> {
    let lines: Vec<String> = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<_>>()
        .context("Failed to read stdin")?;

    let tokenizer = Tokenizer::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for tokens in tokenizer.tokenize_batch(&lines) {
        writeln!(out, "{}", tokens.join(" "))?;
    }
    Ok(())
}

fn run_stats(vocab_path: PathBuf, top: usize, json: bool) -> Result<()> {
    let vocab = Vocabulary::load(&vocab_path)
        .with_context(|| format!("Failed to load vocabulary {}", vocab_path.display()))?;
    let stats = vocab.stats();

    if json {
        let ranks: Vec<_> = vocab
            .rank_frequencies()
            .take(top)
            .map(|(rank, term, count)| serde_json::json!({"rank": rank, "term": term, "count": count}))
            .collect();
        let report = serde_json::json!({ "stats": stats, "top_terms": ranks });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Documents:       {}", stats.num_docs);
    println!("Raw tokens:      {}", stats.total_tokens);
    println!("Distinct terms:  {}", stats.distinct_terms);
    println!("Vocabulary size: {}", stats.vocab_size);
    println!("Min count:       {}", stats.min_count);
    println!();
    for (rank, term, count) in vocab.rank_frequencies().take(top) {
        println!("{rank:>6}  {count:>10}  {term}");
    }
    Ok(())
}
