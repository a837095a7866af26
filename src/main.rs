//! CLI entry point for embed-to-sqlite.
//!
//! Provides commands for storing embeddings, searching them and maintaining
//! pairwise similarity tables. Main components: Cli parser, Commands enum and
//! one handler per command that maps failures to exit codes.

use anyhow::anyhow;
use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use embed_to_sqlite::commands::{
    EmbeddingsOptions, IngestInput, SearchOptions, SimilarMode, SimilarOptions, run_embeddings,
    run_search, run_similar,
};
use embed_to_sqlite::display::{IngestProgress, Status, THEME, with_spinner};
use embed_to_sqlite::io::{ExitCode, JsonResponse, OutputFormat, ResponseMeta};
use embed_to_sqlite::source::{InputFormat, InputSpec};
use embed_to_sqlite::{
    BatchSize, EmbedError, EmbedResult, FailurePolicy, OpenAiProvider, SelfPairs, Settings,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, fmt};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Store text embeddings in SQLite and query them by similarity
#[derive(Parser)]
#[command(
    name = "embed-to-sqlite",
    version = env!("CARGO_PKG_VERSION"),
    about = "Store text embeddings in SQLite and query them by similarity",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Provider options shared by commands that call the embedding API
#[derive(Args)]
struct ProviderArgs {
    /// API token
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    token: Option<String>,

    /// Embedding model (overrides config)
    #[arg(long)]
    model: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Write a documented .embed-to-sqlite/settings.toml")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings (token redacted)")]
    Config,

    /// Store embeddings for one or more text documents
    #[command(
        about = "Store embeddings for CSV, TSV, JSON or SQL query rows",
        long_about = "Store embeddings for one or more text documents.\n\nInput can be CSV, TSV, a JSON array of objects, newline-delimited JSON, or the rows of an SQL query. The first column is the id; all other columns are joined into the text that is embedded.",
        after_help = "Examples:\n  embed-to-sqlite embeddings docs.db -i content.csv\n  cat items.json | embed-to-sqlite embeddings docs.db\n  embed-to-sqlite embeddings docs.db --sql 'select id, title, body from other.posts' --attach other blog.db"
    )]
    Embeddings {
        /// SQLite database to store embeddings in
        db_path: PathBuf,

        /// Input file, or - for standard input
        #[arg(short, long, value_name = "FILE", conflicts_with = "sql")]
        input: Option<PathBuf>,

        /// SQL query returning id and text columns
        #[arg(long)]
        sql: Option<String>,

        /// Attach another database for --sql, as ALIAS PATH
        #[arg(long, num_args = 2, value_names = ["ALIAS", "PATH"], requires = "sql")]
        attach: Vec<String>,

        /// Table to store embeddings in
        #[arg(long)]
        table: Option<String>,

        /// Records per embedding request (1-2048)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Input format, detected from content when omitted
        #[arg(long, value_enum, conflicts_with_all = ["csv", "tsv"])]
        format: Option<InputFormat>,

        /// Treat input as CSV
        #[arg(long, conflicts_with = "tsv")]
        csv: bool,

        /// Treat input as TSV
        #[arg(long)]
        tsv: bool,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Abort at the first failed batch
        #[arg(long)]
        strict: bool,

        /// Skip ids that already have an embedding
        #[arg(long)]
        skip_existing: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Search embeddings using cosine similarity against a query
    #[command(about = "Rank stored embeddings against a query string")]
    Search {
        /// SQLite database containing embeddings
        db_path: PathBuf,

        /// Text to search for
        query: String,

        /// Number of results
        #[arg(long)]
        count: Option<usize>,

        /// Table containing embeddings
        #[arg(long)]
        table: Option<String>,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find stored ids most similar to other stored ids
    #[command(
        about = "Compute nearest neighbors between stored embeddings",
        after_help = "Examples:\n  embed-to-sqlite similar docs.db 1 2\n  embed-to-sqlite similar docs.db --all --save\n  embed-to-sqlite similar docs.db 42 --recalculate-for-matches --save"
    )]
    Similar {
        /// SQLite database containing embeddings
        db_path: PathBuf,

        /// Ids to find neighbors for
        ids: Vec<String>,

        /// Compute neighbors for every stored id
        #[arg(long)]
        all: bool,

        /// Neighbors per id
        #[arg(long)]
        count: Option<usize>,

        /// Table containing embeddings
        #[arg(long)]
        table: Option<String>,

        /// Table to save similarity scores in
        #[arg(long)]
        similarity_table: Option<String>,

        /// Save results to the similarity table
        #[arg(long)]
        save: bool,

        /// Print results even when saving
        #[arg(long)]
        print: bool,

        /// Also recalculate neighbors for every id matched by the given ids
        #[arg(long)]
        recalculate_for_matches: bool,

        /// Keep each id in its own neighbor list
        #[arg(long)]
        include_self: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", THEME.status(Status::Error, &format!("{e:#}")));
            std::process::exit(ExitCode::ConfigError.into());
        }
    };

    init_logging(cli.verbose || settings.debug);

    let code = match cli.command {
        Commands::Init { force } => init(force),
        Commands::Config => show_config(&settings),
        Commands::Embeddings {
            db_path,
            input,
            sql,
            attach,
            table,
            batch_size,
            format,
            csv,
            tsv,
            provider,
            strict,
            skip_existing,
            no_progress,
        } => {
            if let Some(table) = table {
                settings.tables.vectors = table;
            }
            if let Some(size) = batch_size {
                settings.ingest.batch_size = size;
            }
            settings.ingest.strict |= strict;
            settings.ingest.skip_existing |= skip_existing;
            settings.ingest.progress &= !no_progress;

            let source = match sql {
                Some(sql) => IngestInput::Query { sql },
                None => IngestInput::File {
                    input: InputSpec::from_arg(input.as_deref().unwrap_or(Path::new("-"))),
                    format: format
                        .or(csv.then_some(InputFormat::Csv))
                        .or(tsv.then_some(InputFormat::Tsv)),
                },
            };
            let attach = attach
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), PathBuf::from(&pair[1])))
                .collect();

            embeddings(&settings, db_path, source, attach, provider)
                .unwrap_or_else(|e| report_error(&e, OutputFormat::Text))
        }
        Commands::Search {
            db_path,
            query,
            count,
            table,
            provider,
            json,
        } => {
            if let Some(table) = table {
                settings.tables.vectors = table;
            }
            if let Some(count) = count {
                settings.similarity.count = count;
            }
            let format = OutputFormat::from_json_flag(json);
            search(&settings, db_path, query, provider, format)
                .unwrap_or_else(|e| report_error(&e, format))
        }
        Commands::Similar {
            db_path,
            ids,
            all,
            count,
            table,
            similarity_table,
            save,
            print,
            recalculate_for_matches,
            include_self,
            json,
        } => {
            if let Some(table) = table {
                settings.tables.vectors = table;
            }
            if let Some(table) = similarity_table {
                settings.tables.similarities = table;
            }
            if let Some(count) = count {
                settings.similarity.count = count;
            }
            settings.similarity.include_self |= include_self;

            let format = OutputFormat::from_json_flag(json);
            SimilarMode::from_flags(ids, all, recalculate_for_matches)
                .and_then(|mode| similar(&settings, db_path, mode, save, print, format))
                .unwrap_or_else(|e| report_error(&e, format))
        }
    };

    std::process::exit(code.into());
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .map_err(|e| anyhow!("Configuration error loading from {}: {e}", path.display())),
        None => Settings::load().map_err(|e| anyhow!("Configuration error: {e}")),
    }
}

/// Logs go to stderr so stdout stays clean for results.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("embed_to_sqlite=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn init(force: bool) -> ExitCode {
    match Settings::init_config_file(force) {
        Ok(path) => {
            println!(
                "{}",
                THEME.status(Status::Success, &format!(
                    "Created configuration file at: {}",
                    path.display()
                ))
            );
            println!("Edit this file to customize your settings.");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", THEME.status(Status::Error, &e.to_string()));
            ExitCode::ConfigError
        }
    }
}

fn show_config(settings: &Settings) -> ExitCode {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(&settings.redacted()) {
        Ok(toml_str) => {
            println!("{toml_str}");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error displaying config: {e}");
            ExitCode::GeneralError
        }
    }
}

/// Builds the HTTP provider, failing before any request when no token is
/// available.
fn build_provider(settings: &Settings, args: ProviderArgs) -> EmbedResult<OpenAiProvider> {
    let token = args
        .token
        .or_else(|| settings.provider.token.clone())
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            EmbedError::config(
                "API token is required, use --token or set the OPENAI_API_KEY environment variable",
            )
        })?;
    let model = args.model.unwrap_or_else(|| settings.provider.model.clone());

    Ok(OpenAiProvider::new(
        &token,
        &settings.provider.api_base,
        &model,
        Duration::from_secs(settings.provider.timeout_secs),
        settings.provider.max_retries,
    )?)
}

fn embeddings(
    settings: &Settings,
    db_path: PathBuf,
    input: IngestInput,
    attach: Vec<(String, PathBuf)>,
    provider_args: ProviderArgs,
) -> EmbedResult<ExitCode> {
    let provider = build_provider(settings, provider_args)?;
    settings.validate()?;

    let options = EmbeddingsOptions {
        db_path,
        input,
        attach,
        table: settings.tables.vectors.clone(),
        batch_size: BatchSize::new(settings.ingest.batch_size)?,
        policy: FailurePolicy::from_strict_flag(settings.ingest.strict),
        skip_existing: settings.ingest.skip_existing,
        text_separator: settings.ingest.text_separator.clone(),
    };

    let progress = IngestProgress::new(settings.ingest.progress);
    let result = run_embeddings(&options, &provider, &mut |n| progress.update(n));
    progress.finish();
    let report = result?;

    eprintln!("Total tokens used: {}", report.total_tokens);
    if report.skipped > 0 {
        eprintln!("Skipped {} rows that already existed", report.skipped);
    }

    if report.has_failures() {
        for failure in &report.failures {
            eprintln!(
                "{}",
                THEME.status(Status::Warning, &format!(
                    "Failed to embed {} record(s): {}",
                    failure.ids.len(),
                    failure.reason
                ))
            );
        }
        eprintln!("Failed ids: {}", report.failed_ids().join(", "));
        return Ok(ExitCode::PartialFailure);
    }

    eprintln!(
        "{}",
        THEME.status(Status::Success, &format!(
            "Stored {} embedding(s) in table '{}'",
            report.stored, options.table
        ))
    );
    Ok(ExitCode::Success)
}

fn search(
    settings: &Settings,
    db_path: PathBuf,
    query: String,
    provider_args: ProviderArgs,
    format: OutputFormat,
) -> EmbedResult<ExitCode> {
    let started = Instant::now();
    let provider = build_provider(settings, provider_args)?;
    settings.validate()?;

    let options = SearchOptions {
        db_path,
        query,
        table: settings.tables.vectors.clone(),
        count: settings.similarity.count,
    };
    let results = run_search(&options, &provider)?;

    if format.is_json() {
        let response = JsonResponse::success(&results)
            .with_message(format!("{} result(s)", results.len()))
            .with_meta(ResponseMeta::now(Some(elapsed_ms(started))));
        print_json(&response);
    } else {
        for result in &results {
            println!("{} {}", THEME.score(result.score), result.id);
        }
    }
    Ok(ExitCode::Success)
}

fn similar(
    settings: &Settings,
    db_path: PathBuf,
    mode: SimilarMode,
    save: bool,
    print: bool,
    format: OutputFormat,
) -> EmbedResult<ExitCode> {
    let started = Instant::now();
    settings.validate()?;

    let all = matches!(mode, SimilarMode::All);
    let options = SimilarOptions {
        db_path,
        mode,
        table: settings.tables.vectors.clone(),
        similarity_table: settings.tables.similarities.clone(),
        count: settings.similarity.count,
        self_pairs: SelfPairs::from_include_flag(settings.similarity.include_self),
        save,
    };

    let outcome = if all {
        with_spinner("Computing similarities", || run_similar(&options))?
    } else {
        run_similar(&options)?
    };

    if !save || print {
        if format.is_json() {
            let response = JsonResponse::success(&outcome.results)
                .with_meta(ResponseMeta::now(Some(elapsed_ms(started))));
            print_json(&response);
        } else {
            for result in &outcome.results {
                for neighbor in &result.neighbors {
                    println!(
                        "{} {} {}",
                        result.source_id,
                        neighbor.id,
                        THEME.score(neighbor.score)
                    );
                }
            }
        }
    }

    if let Some(written) = outcome.saved_edges {
        eprintln!(
            "{}",
            THEME.status(Status::Success, &format!(
                "Saved {written} similarity score(s) for {} id(s) to table '{}'",
                outcome.results.len(),
                options.similarity_table
            ))
        );
    }
    Ok(ExitCode::Success)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn print_json<T: serde::Serialize>(response: &JsonResponse<T>) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing response: {e}"),
    }
}

fn report_error(error: &EmbedError, format: OutputFormat) -> ExitCode {
    let code = ExitCode::from_error(error);
    if format.is_json() {
        print_json(&JsonResponse::from_error(error));
    } else {
        eprintln!("{}", THEME.status(Status::Error, &error.to_string()));
        for suggestion in error.recovery_suggestions() {
            eprintln!("  - {suggestion}");
        }
    }
    code
}
