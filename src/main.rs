//! suttapub - build EPUBs from the sutta translations on theravada.ru

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use suttapub::align::{AlignSession, Decision, Outcome, Resolver, auto_align, plain_text};
use suttapub::config::CONTENT_ROOT;
use suttapub::fetch::{cache_file_name, read_page_file};
use suttapub::{Config, Extractor, FetchOptions, Fetcher, HttpClient, Observer, Pipeline};

#[derive(Parser)]
#[command(name = "suttapub")]
#[command(version, about = "Build EPUBs from the sutta translations on theravada.ru", long_about = None)]
#[command(after_help = "EXAMPLES:
    suttapub list majjhima                  Show the pages of Majjhima Nikaya
    suttapub download digha                 Fill the cache for Digha Nikaya
    suttapub build samyutta -o sn.epub      Build Samyutta Nikaya
    suttapub --offline build anguttara      Rebuild from the cache only")]
struct Cli {
    /// TOML file defining or overriding collections
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for downloaded pages, one subdirectory per collection
    #[arg(long, global = true, value_name = "DIR", default_value = "cache")]
    cache: PathBuf,

    /// Use cached pages only, never touch the network
    #[arg(long, global = true)]
    offline: bool,

    /// Show debug messages
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the source URLs of a collection
    List { collection: String },

    /// Download every page of a collection into the cache
    Download { collection: String },

    /// Print the extracted content of one saved page
    Extract {
        file: PathBuf,

        /// Print the page title and number before the content
        #[arg(long)]
        metadata: bool,
    },

    /// Build the EPUB for a collection
    Build {
        collection: String,

        /// Output file (defaults to <collection>.epub)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cover image
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Interleave a Russian and an English text section by section
    Align {
        russian: PathBuf,
        english: PathBuf,
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::List { collection } => {
            let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
            let collection = config.collection(collection)?;
            let fetcher = fetcher(&cli, &collection.name);
            for url in Pipeline::new(&fetcher, collection).sources()? {
                println!("{url}");
            }
        }
        Command::Download { collection } => {
            let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
            let collection = config.collection(collection)?;
            let fetcher = fetcher(&cli, &collection.name);
            let urls = Pipeline::new(&fetcher, collection).sources()?;

            let bar = progress_bar(urls.len(), cli.quiet);
            let available = fetcher.download_all(urls.iter().map(String::as_str), |url| {
                bar.set_message(cache_file_name(url));
                bar.inc(1);
            });
            bar.finish_and_clear();
            info!(
                collection = %collection.name,
                available,
                total = urls.len(),
                path = %fetcher.options().cache_dir.display(),
                "download finished"
            );
        }
        Command::Extract { file, metadata } => {
            let doc = read_page_file(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let (fragment, meta) = Extractor::new(CONTENT_ROOT).extract(&doc);
            if *metadata {
                println!("{}: {}", meta.original_title, meta.translated_title);
                if let Some(number) = &meta.number {
                    println!("{number}");
                }
                println!();
            }
            println!("{}", fragment.to_html());
        }
        Command::Build {
            collection,
            output,
            cover,
        } => {
            let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
            let collection = config.collection(collection)?;
            let fetcher = fetcher(&cli, &collection.name);
            let output = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.epub", collection.name)));

            let mut progress = Progress::new(cli.quiet);
            let book = Pipeline::new(&fetcher, collection)
                .with_cover(cover.clone())
                .run(&output, &mut progress)
                .with_context(|| format!("building {}", collection.name))?;

            if !cli.quiet {
                println!("{} -> {}", book.metadata.title, output.display());
            }
        }
        Command::Align {
            russian,
            english,
            output,
        } => align(russian, english, output)?,
    }
    Ok(())
}

fn fetcher(cli: &Cli, collection: &str) -> Fetcher<HttpClient> {
    let options = FetchOptions::default()
        .with_cache_dir(cli.cache.join(collection))
        .with_offline(cli.offline)
        .with_skip_cached(true);
    Fetcher::new(HttpClient::new(&options), options)
}

fn progress_bar(len: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Shows extraction progress while a book is built.
struct Progress {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }
}

impl Observer for Progress {
    fn sources_listed(&mut self, count: usize) {
        self.bar = Some(progress_bar(count, self.quiet));
    }

    fn page_done(&mut self, url: &str, _blocks: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(cache_file_name(url));
            bar.inc(1);
        }
    }

    fn chapters_grouped(&mut self, count: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        info!(chapters = count, "grouped chapters");
    }
}

fn align(russian: &Path, english: &Path, output: &Path) -> Result<()> {
    let russian_text = std::fs::read_to_string(russian)
        .with_context(|| format!("reading {}", russian.display()))?;
    let english_text = std::fs::read_to_string(english)
        .with_context(|| format!("reading {}", english.display()))?;

    let mut resolver = StdinResolver::new();
    match auto_align(&russian_text, &english_text, &mut resolver) {
        Outcome::Completed(text) => {
            std::fs::write(output, text)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(path = %output.display(), "alignment complete");
        }
        Outcome::Aborted(text) => {
            let name = output
                .file_name()
                .map(|n| format!("part_{}", n.to_string_lossy()))
                .unwrap_or_else(|| "part_aligned.txt".to_string());
            let partial = output.with_file_name(name);
            std::fs::write(&partial, text)
                .with_context(|| format!("writing {}", partial.display()))?;
            warn!(path = %partial.display(), "alignment aborted, partial result saved");
        }
    }
    Ok(())
}

/// Asks on the terminal how to pair the pending chunks.
struct StdinResolver {
    stdin: io::Stdin,
}

impl StdinResolver {
    fn new() -> Self {
        Self { stdin: io::stdin() }
    }

    fn show(session: &AlignSession) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "\n--- RU ({} left) ---", session.remaining_russian());
        let _ = writeln!(out, "{}", plain_text(&session.pending_russian()));
        let _ = writeln!(out, "--- EN ({} left) ---", session.remaining_english());
        let _ = writeln!(out, "{}", plain_text(&session.pending_english()));
        let _ = write!(
            out,
            "add Russian [r], add English [e], undo [z], ok [o or Enter], abort [A]: "
        );
        let _ = out.flush();
    }
}

/// Map one line of terminal input to a decision. `None` asks again.
fn parse_answer(answer: &str) -> Option<Decision> {
    match answer.trim() {
        "r" => Some(Decision::TakeRussian),
        "e" => Some(Decision::TakeEnglish),
        "z" => Some(Decision::Undo),
        "o" | "" => Some(Decision::Accept),
        "A" | "a" => Some(Decision::Abort),
        _ => None,
    }
}

impl Resolver for StdinResolver {
    fn resolve(&mut self, session: &AlignSession) -> Decision {
        Self::show(session);
        loop {
            let mut line = String::new();
            match self.stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return Decision::Abort,
                Ok(_) => {
                    if let Some(decision) = parse_answer(&line) {
                        return decision;
                    }
                    print!("unknown answer {:?}, try again: ", line.trim());
                    let _ = io::stdout().flush();
                }
            }
        }
    }
}
