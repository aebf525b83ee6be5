use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn, LevelFilter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use talkdeck::{render, BuildOptions, Deck, DeckError, ReferenceMap, Resources};
use walkdir::WalkDir;

const DECK_SUFFIX: &str = ".deck.json";

#[derive(Parser, Debug)]
#[command(name = "talkdeck")]
#[command(author, version, about = "Build self-contained HTML presentations and posters from deck files")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a deck, or every *.deck.json under a directory
    Build {
        /// Deck file or directory of decks
        path: PathBuf,

        /// Output HTML file (single deck only; default: next to the deck)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Inline video files instead of linking them
        #[arg(long)]
        embed_video: bool,

        /// Embed local HTML pages (the default)
        #[arg(long, overrides_with = "no_local_files")]
        local_files: bool,

        /// Reference local HTML pages with <object> instead of embedding them
        #[arg(long)]
        no_local_files: bool,

        /// Plot rendering: inline SVG or D3 from a CDN
        #[arg(long, default_value = "inline")]
        resources: Resources,

        /// Number of parallel workers (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Open the built page in the browser
        #[arg(long)]
        open: bool,

        /// Legacy switches: EmbedVideo, LocalFiles
        tokens: Vec<String>,
    },

    /// Serve a deck locally, rebuilding on every page load
    Serve {
        /// Deck file
        deck: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3002")]
        port: u16,

        /// Inline video files instead of linking them
        #[arg(long)]
        embed_video: bool,

        /// Plot rendering: inline SVG or D3 from a CDN
        #[arg(long, default_value = "inline")]
        resources: Resources,
    },

    /// Print the reference list of a deck (or a plain text file) as JSON
    Refs {
        /// Deck file, or a text file holding a numbered reference list
        file: PathBuf,
    },
}

struct Built {
    deck: PathBuf,
    result: Result<PathBuf, DeckError>,
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let code = match args.command {
        Command::Build {
            path,
            output,
            embed_video,
            local_files: _,
            no_local_files,
            resources,
            jobs,
            open,
            tokens,
        } => {
            let mut options = BuildOptions {
                embed_video,
                local_files: !no_local_files,
                resources,
            };
            apply_tokens(&mut options, &tokens);
            run_build(&path, output, options, jobs, open, args.quiet)
        }

        Command::Serve { deck, port, embed_video, resources } => {
            let options = BuildOptions { embed_video, resources, ..Default::default() };
            match talkdeck::serve::start(port, deck, options) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Server error: {}", e);
                    1
                }
            }
        }

        Command::Refs { file } => match print_refs(&file) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("\x1b[31mError:\x1b[0m {}", e);
                1
            }
        },
    };

    std::process::exit(code);
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Bare `EmbedVideo` / `LocalFiles` arguments, as the per-venue scripts took them.
/// Tokens only switch options on: local files stay embedded unless
/// `--no-local-files` is given, whatever other tokens are present.
fn apply_tokens(options: &mut BuildOptions, tokens: &[String]) {
    for token in tokens {
        match token.as_str() {
            "EmbedVideo" => options.embed_video = true,
            "LocalFiles" => options.local_files = true,
            other => warn!("Ignoring unknown argument '{}'", other),
        }
    }
}

fn run_build(
    path: &Path,
    output: Option<PathBuf>,
    options: BuildOptions,
    jobs: Option<usize>,
    open: bool,
    quiet: bool,
) -> i32 {
    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global().ok();
    }

    let decks = collect_decks(path);
    if decks.is_empty() {
        eprintln!("No deck files found (expected *{})", DECK_SUFFIX);
        return 1;
    }
    if output.is_some() && decks.len() > 1 {
        eprintln!("--output needs a single deck, found {}", decks.len());
        return 1;
    }

    if !quiet {
        eprintln!("\x1b[1mtalkdeck\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} deck(s)\n", decks.len());
    }

    let pb = if !quiet && decks.len() > 1 {
        let pb = ProgressBar::new(decks.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let started = Instant::now();
    let results: Vec<Built> = decks
        .par_iter()
        .map(|deck| {
            let result = build_one(deck, output.as_deref(), &options);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(deck.display().to_string());
            }
            Built { deck: deck.clone(), result }
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    for built in &results {
        match built.result {
            Ok(ref out) => {
                if !quiet {
                    println!("\x1b[32m{:<8}\x1b[0m {}", "[OK]", out.display());
                }
            }
            Err(ref e) => {
                println!("\x1b[31m{:<8}\x1b[0m {}: {}", "[FAIL]", built.deck.display(), e);
            }
        }
    }

    let failed = results.iter().filter(|b| b.result.is_err()).count();
    let ok = results.len() - failed;

    if !quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  \x1b[32m✓ Built:\x1b[0m  {}", ok);
        if failed > 0 {
            eprintln!("  \x1b[31m✗ Failed:\x1b[0m {}", failed);
        }
        eprintln!("\n\x1b[90mDone in {:.2}s.\x1b[0m", started.elapsed().as_secs_f64());
    }

    if open {
        for out in results.iter().filter_map(|b| b.result.as_ref().ok()) {
            if let Err(e) = open::that(out) {
                eprintln!("Failed to open {}: {}", out.display(), e);
            }
        }
    }

    if failed > 0 {
        1
    } else {
        0
    }
}

/// A deck file as-is, or every `*.deck.json` below a directory, sorted
fn collect_decks(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut decks: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| name.ends_with(DECK_SUFFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    decks.sort();
    decks
}

fn build_one(path: &Path, output: Option<&Path>, options: &BuildOptions) -> Result<PathBuf, DeckError> {
    let deck = Deck::load(path)?;
    let out = output.map(Path::to_path_buf).unwrap_or_else(|| deck.output_path());
    debug!("{} → {}", path.display(), out.display());

    let document = deck.build(options)?;
    render::save(&out, &document, options.resources)?;
    Ok(out)
}

fn print_refs(file: &Path) -> Result<(), DeckError> {
    let is_deck = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let refs = if is_deck {
        let deck = Deck::load(file)?;
        ReferenceMap::parse(deck.references.as_deref().unwrap_or(""))
    } else {
        let text = std::fs::read_to_string(file).map_err(|e| DeckError::Io { path: file.to_path_buf(), source: e })?;
        ReferenceMap::parse(&text)
    };

    let json = serde_json::to_string_pretty(&refs).map_err(|e| DeckError::Json { path: file.to_path_buf(), source: e })?;
    println!("{}", json);
    Ok(())
}
