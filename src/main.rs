//! xport - Twitter/X archive importer CLI
//!
//! Main entry point for the xport command-line tool.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use xport::config::Config;
use xport::logging;
use xport::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_cli_logging(cli.quiet, cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Run the appropriate command
    match &cli.command {
        Commands::Import(args) => cmd_import(&cli, args),
        Commands::Preview(args) => cmd_preview(&cli, args),
        Commands::Stats(args) => cmd_stats(&cli, args),
        Commands::Check(args) => cmd_check(&cli, args),
        Commands::Config(args) => cmd_config(&cli, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn resolve_db_path(cli: &Cli, config: &Config) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| config.db_path())
}

/// Read an archive into a collection, with pretty errors for bad paths.
fn load_collection(path: &Path) -> Result<TweetCollection> {
    let raw = FileArchiveLoader::new()
        .load(path)
        .map_err(|e| anyhow::anyhow!("{}", render_error(&e)))?;
    Ok(TweetCollection::new(raw))
}

/// Wire up the processors the import command can run.
///
/// Builders capture paths by value so every batch gets a fresh store
/// connection and uploader.
fn build_registry(
    dry_run: bool,
    db_path: &Path,
    media_dir: &Path,
    media_base_url: Option<String>,
    author: String,
) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();

    let db_path = db_path.to_path_buf();
    let media_dir = media_dir.to_path_buf();
    registry.register(BlockProcessor::SELECTOR, move || {
        let options = BlockOptions {
            media_base_url: media_base_url.clone(),
            author: author.clone(),
            ..BlockOptions::default()
        };
        if dry_run {
            Ok(Box::new(BlockProcessor::new(
                Box::new(MemoryStore::new()),
                Box::new(NullMediaUploader::new()),
                options,
            )))
        } else {
            let store = SqliteStore::open(&db_path)?;
            let media = HttpMediaUploader::new(&media_dir, None)?;
            Ok(Box::new(BlockProcessor::new(
                Box::new(store),
                Box::new(media),
                options,
            )))
        }
    });

    registry
}

fn cmd_import(cli: &Cli, args: &cli::ImportArgs) -> Result<()> {
    let config = Config::load();
    let archive_path = &args.archive_path;

    if !archive_path.exists() {
        anyhow::bail!("Archive file does not exist: {}", archive_path.display());
    }

    // CLI flags win over the config file, which wins over defaults.
    let db_path = resolve_db_path(cli, &config);
    let media_dir = args
        .media_dir
        .clone()
        .unwrap_or_else(|| config.media_dir());
    let batch_size = args.batch_size.unwrap_or(config.import.batch_size);
    let on_duplicate = args
        .on_duplicate
        .map_or_else(|| config.import.policy(), OnDuplicate::from);
    let selector = args
        .processor
        .clone()
        .unwrap_or_else(|| config.import.processor.clone());
    let media_base_url = args
        .media_base_url
        .clone()
        .or_else(|| config.import.media_base_url.clone());
    let delay = args.delay.unwrap_or(config.import.delay_secs);
    let author = args.author.clone().unwrap_or_default();

    debug!(
        "Import resolved: db {}, media dir {}, processor {selector}",
        db_path.display(),
        media_dir.display()
    );

    if !args.dry_run {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let text_output = !cli.quiet && matches!(cli.format, OutputFormat::Text);
    if text_output {
        println!("{}", "Importing X data archive...".bold().cyan());
        println!("  Archive:  {}", archive_path.display());
        if args.dry_run {
            println!("  Store:    {}", "in-memory (dry run)".yellow());
        } else {
            println!("  Database: {}", db_path.display());
            println!("  Media:    {}", media_dir.display());
        }
        println!("  Policy:   {on_duplicate}");
        println!();
    }

    let registry = build_registry(
        args.dry_run,
        &db_path,
        &media_dir,
        media_base_url.clone(),
        author,
    );
    let action = ImportAction::new(Box::new(FileArchiveLoader::new()), registry);

    let mut import_config = ImportConfig::new(archive_path.clone());
    import_config.media_base_url = media_base_url;
    import_config.batch_size = batch_size;
    import_config.on_duplicate = on_duplicate;
    import_config.delay = delay;
    import_config.last_tweet_id = args.resume_from.clone();
    import_config.processor = selector;

    let guard = logging::OperationGuard::new("import");

    let mut responses = Vec::new();
    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut batches = 0usize;

    loop {
        batches += 1;

        let spinner = text_output.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            pb.set_message(format!("Importing batch {batches}..."));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        });

        let result = action.execute(&import_config);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                guard.fail(&e);
                anyhow::bail!("{}", render_error(&e));
            }
        };

        let attempted = response.attempted();
        processed += response.processed_ids().len();
        failed += response.failed_ids().len();
        import_config.last_tweet_id = response.last_tweet_id().map(ToString::to_string);

        if text_output && attempted > 0 {
            print_batch(batches, args.all, &response);
        }
        responses.push(response);

        // An empty or short batch means the archive ran out. The empty check
        // stands on its own: a zero batch size never fills.
        if !args.all || attempted == 0 || attempted < batch_size {
            break;
        }
        if delay > 0 {
            std::thread::sleep(std::time::Duration::from_secs(delay));
        }
    }

    guard.complete();

    // --all always emits an array, even for a single batch, so scripted
    // consumers get a stable shape.
    match cli.format {
        OutputFormat::Json => {
            if args.all || responses.len() > 1 {
                println!("{}", serde_json::to_string(&responses)?);
            } else {
                println!("{}", serde_json::to_string(&responses[0])?);
            }
        }
        OutputFormat::JsonPretty => {
            if args.all || responses.len() > 1 {
                println!("{}", serde_json::to_string_pretty(&responses)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&responses[0])?);
            }
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!();
                if processed + failed == 0 {
                    println!("{}", "Nothing to import.".yellow());
                } else {
                    println!("{}", "Import complete!".bold().green());
                    println!(
                        "  Processed: {}",
                        format_number(processed).green()
                    );
                    if failed > 0 {
                        println!("  Failed:    {}", format_number(failed).red());
                    }
                    if let Some(cursor) = &import_config.last_tweet_id {
                        println!("  Cursor:    {cursor}");
                        if !args.all {
                            println!();
                            println!(
                                "Resume with {}.",
                                format!(
                                    "xport import {} --resume-from {cursor}",
                                    archive_path.display()
                                )
                                .bold()
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_batch(batch: usize, all: bool, response: &ImportResponse) {
    if all {
        println!("{}", format!("Batch {batch}").bold());
    }
    for message in response.messages() {
        if message.starts_with("Failed") || message.contains("Error") {
            println!("  {} {message}", "✗".red());
        } else {
            println!("  {} {message}", "✓".green());
        }
    }
}

#[derive(Serialize)]
struct PreviewEntry {
    tweet: Tweet,
    thread: Vec<Tweet>,
}

fn cmd_preview(cli: &Cli, args: &cli::PreviewArgs) -> Result<()> {
    let collection = load_collection(&args.archive_path)?;

    let mut cursor = args.after.clone().unwrap_or_default();
    let mut entries = Vec::new();
    for _ in 0..args.limit {
        let Some(tweet) = collection.get_next_tweet(&cursor, args.roots_only) else {
            break;
        };
        cursor = tweet.id.clone();
        let thread = if args.thread {
            collection.get_threaded_tweets(&tweet.id)
        } else {
            Vec::new()
        };
        entries.push(PreviewEntry { tweet, thread });
    }

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&entries)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("{}", "No tweets found.".yellow());
                return Ok(());
            }

            for (i, entry) in entries.iter().enumerate() {
                print_preview_entry(i + 1, entry);
            }
            if let Some(last) = entries.last() {
                println!(
                    "Continue with {}.",
                    format!(
                        "xport preview {} --after {}",
                        args.archive_path.display(),
                        last.tweet.id
                    )
                    .bold()
                );
            }
        }
    }

    Ok(())
}

fn print_preview_entry(num: usize, entry: &PreviewEntry) {
    let tweet = &entry.tweet;
    let badge = if tweet.is_reply() {
        "REPLY".on_magenta()
    } else {
        "TWEET".on_blue()
    };

    println!(
        "{}. {} {} {}",
        num.to_string().dimmed(),
        badge,
        tweet.id.dimmed(),
        format_optional_date(tweet.parsed_date()).dimmed()
    );

    // Word wrap the text
    let wrapped = textwrap::wrap(&tweet.content, 78);
    for line in wrapped {
        println!("   {line}");
    }

    if !entry.thread.is_empty() {
        let ids = entry
            .thread
            .iter()
            .map(|t| format_short_id(&t.id))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "   {}",
            format!("{} replies: {ids}", entry.thread.len()).dimmed()
        );
    }

    println!();
}

fn cmd_stats(cli: &Cli, args: &cli::StatsArgs) -> Result<()> {
    let collection = load_collection(&args.archive_path)?;
    let survey = collection.survey();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&survey)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&survey)?),
        OutputFormat::Text => {
            println!("{}", "Archive Statistics".bold().cyan());
            println!("{}", "─".repeat(40));
            println!("  {:<20} {:>10}", "Entries:", format_count(survey.entries));
            println!("  {:<20} {:>10}", "Tweets:", format_count(survey.tweets));
            println!("  {:<20} {:>10}", "Roots:", format_count(survey.roots));
            println!("  {:<20} {:>10}", "Replies:", format_count(survey.replies));
            println!(
                "  {:<20} {:>10}",
                "With media:",
                format_count(survey.with_media)
            );
            if survey.skipped > 0 {
                println!("  {:<20} {:>10}", "Malformed:", format_count(survey.skipped));
            }
            println!("{}", "─".repeat(40));

            if !survey.hashtags.is_empty() {
                println!("  Top hashtags:");
                let top = survey
                    .hashtags
                    .iter()
                    .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
                    .take(args.top);
                for (tag, count) in top {
                    println!("    {:<26} {:>8}", format!("#{tag}"), format_count(*count));
                }
                println!("{}", "─".repeat(40));
            }

            if let (Some(first), Some(last)) = (survey.first_date, survey.last_date) {
                println!(
                    "  First tweet: {}",
                    first.format("%Y-%m-%d").to_string().green()
                );
                println!(
                    "  Last tweet:  {}",
                    last.format("%Y-%m-%d").to_string().green()
                );
            }
        }
    }

    Ok(())
}

fn format_count(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn cmd_check(cli: &Cli, args: &cli::CheckArgs) -> Result<()> {
    let path = &args.archive_path;

    if !path.exists() {
        anyhow::bail!("Archive file does not exist: {}", path.display());
    }

    let collection = load_collection(path)?;
    let survey = collection.survey();

    if matches!(cli.format, OutputFormat::Json | OutputFormat::JsonPretty) {
        let json = if matches!(cli.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(&survey)?
        } else {
            serde_json::to_string(&survey)?
        };
        println!("{json}");
        if survey.tweets == 0 {
            anyhow::bail!("Archive contains no importable tweets");
        }
        return Ok(());
    }

    println!("{}", "Checking archive...".bold().cyan());

    let size = std::fs::metadata(path)?.len();
    println!("  {} file readable ({})", "✓".green(), format_bytes(size));

    if survey.entries == 0 {
        println!(
            "  {} no entries decoded (not a JSON array or tweets.js export)",
            "✗".red()
        );
        anyhow::bail!("Archive is not importable: {}", path.display());
    }
    println!(
        "  {} {} entries decoded",
        "✓".green(),
        format_number(survey.entries)
    );

    if survey.skipped > 0 {
        println!(
            "  {} {} malformed entries will be skipped",
            "!".yellow(),
            format_number(survey.skipped)
        );
    }

    if survey.tweets == 0 {
        println!("  {} no importable tweets", "✗".red());
        anyhow::bail!("Archive contains no importable tweets");
    }
    println!(
        "  {} {} tweets ({} roots, {} replies)",
        "✓".green(),
        format_number(survey.tweets),
        format_number(survey.roots),
        format_number(survey.replies)
    );

    if survey.with_media > 0 {
        println!(
            "  {} {} tweets carry media",
            "✓".green(),
            format_number(survey.with_media)
        );
    }

    match (survey.first_date, survey.last_date) {
        (Some(first), Some(last)) => println!(
            "  {} spans {} to {}",
            "✓".green(),
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        _ => println!("  {} no parseable tweet dates", "!".yellow()),
    }

    println!();
    println!("{}", "Archive looks importable.".bold().green());

    Ok(())
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> Result<()> {
    if args.init {
        let config = Config::default();
        config.save()?;
        if let Some(path) = Config::user_config_path() {
            println!("{} Wrote default config to {}", "✓".green(), path.display());
        }
        return Ok(());
    }

    let config = Config::load();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&config)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            println!("{}", "Current Configuration".bold().cyan());
            println!("  Database:   {}", resolve_db_path(cli, &config).display());
            println!("  Media dir:  {}", config.media_dir().display());
            println!("  Batch size: {}", config.import.batch_size);
            println!("  Policy:     {}", config.import.policy());
            println!("  Processor:  {}", config.import.processor);
            if let Some(path) = Config::user_config_path() {
                let status = if path.exists() { "present" } else { "absent" };
                println!("  File:       {} ({status})", path.display());
            }
        }
    }

    Ok(())
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "xport", &mut io::stdout());
    Ok(())
}
