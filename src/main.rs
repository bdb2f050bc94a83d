//! Command-line interface for the dle_rs library.
//!
//! This CLI looks words up in the Diccionario de la lengua española, prints
//! definitions and verb conjugations, and manages the local page cache.

use clap::{Parser, Subcommand};
use colored::*;
use dle_rs::{
    Article, Conjugation, Definition, Dle, Entry, LemaHeader, LoadOptions, Mood, NonPersonal,
    ParsedNode, Person, SearchResult,
    error::Result,
    parse::{parse_search_result, parse_search_result_lossy},
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Diccionario de la lengua española CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a custom page cache file (optional)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Site to search instead of https://dle.rae.es
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Fetch pages again even when they are cached
    #[arg(long, global = true, default_value_t = false)]
    force_refresh: bool,

    /// Only use cached pages, never the network
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look a word up and show its definitions
    Search {
        /// The word to look up
        word: String,
        /// Print the parsed page as JSON
        #[arg(long)]
        json: bool,
        /// Include identifiers, source text and derived flags in the JSON
        #[arg(long)]
        extended: bool,
        /// Skip articles that fail to parse instead of failing the search
        #[arg(long)]
        lossy: bool,
    },
    /// Show the conjugation of a verb
    Conjugate {
        /// The verb, in infinitive
        verb: String,
    },
    /// Parse a saved results page and print it as JSON
    Parse {
        /// Path to the HTML file
        file: PathBuf,
        /// Include identifiers, source text and derived flags
        #[arg(long)]
        extended: bool,
        /// Skip articles that fail to parse instead of failing
        #[arg(long)]
        lossy: bool,
    },
    /// List the cached pages
    Cached {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the page cache
    ClearCache,
}

/// Sets up logging based on verbosity level.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Prints an error in red and exits with a failure status.
fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, e);
    eprintln!("{}", format!("{}: {}", context, e).red());
    std::process::exit(1);
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let db_path = cli.db_path.as_ref().map(PathBuf::from);

    // Commands that never need the client.
    match &cli.command {
        Commands::ClearCache => {
            info!("Clearing page cache...");
            match Dle::clear_database(db_path) {
                Ok(_) => println!("{}", "Page cache cleared successfully.".green()),
                Err(e) => fail("Error clearing page cache", e),
            }
            return Ok(());
        }
        Commands::Parse {
            file,
            extended,
            lossy,
        } => {
            if let Err(e) = handle_parse(file, *extended, *lossy).await {
                fail(&format!("Error parsing {:?}", file), e);
            }
            return Ok(());
        }
        _ => {}
    }

    let load_options = LoadOptions {
        db_path,
        base_url: cli.base_url.clone(),
        force_refresh: cli.force_refresh,
        offline: cli.offline,
    };
    let dle = match Dle::load_with_options(load_options).await {
        Ok(dle) => dle,
        Err(e) => fail("Error opening page cache", e),
    };

    match cli.command {
        Commands::Search {
            word,
            json,
            extended,
            lossy,
        } => {
            if let Err(e) = handle_search(&dle, &word, json, extended, lossy).await {
                fail(&format!("Error looking up '{}'", word), e);
            }
        }
        Commands::Conjugate { verb } => {
            if let Err(e) = handle_conjugate(&dle, &verb).await {
                fail(&format!("Error conjugating '{}'", verb), e);
            }
        }
        Commands::Cached { json } => {
            if let Err(e) = handle_cached(&dle, json) {
                fail("Error listing cached pages", e);
            }
        }
        Commands::ClearCache | Commands::Parse { .. } => {}
    }

    Ok(())
}

/// Fetches (or reads from cache) and parses the page for `word`, showing a
/// spinner while the request is in flight.
async fn fetch_result(dle: &Dle, word: &str, lossy: bool) -> Result<SearchResult> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Looking up '{}'...", word));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let start = Instant::now();
    let html = dle.search_html(word).await;
    spinner.finish_and_clear();
    std::io::stdout().flush().ok();
    let html = html?;
    debug!("Fetching '{}' took: {:?}", word, start.elapsed());

    let start = Instant::now();
    let result = if lossy {
        parse_search_result_lossy(html).await?
    } else {
        parse_search_result(html).await?
    };
    debug!("Parsing '{}' took: {:?}", word, start.elapsed());
    Ok(result)
}

/// Handles the search command.
async fn handle_search(dle: &Dle, word: &str, json: bool, extended: bool, lossy: bool) -> Result<()> {
    info!("Looking up word: '{}'", word);
    let result = fetch_result(dle, word, lossy).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_dict(extended))?);
        return Ok(());
    }

    if result.articles().is_empty() {
        if result.related_entries().is_empty() {
            println!("No entries found for '{}'.", word.yellow());
        } else {
            println!("'{}' has no entry of its own.", word.yellow());
            for (label, words) in result.related_entries() {
                let words: Vec<String> = words.iter().map(|w| w.text().green().to_string()).collect();
                println!("\n{}\n  {}", label.bold(), words.join(", "));
            }
        }
        return Ok(());
    }

    for article in result.articles() {
        print_article(article);
    }
    print_word_list("Sinónimos", result.synonyms());
    print_word_list("Antónimos", result.antonyms());
    Ok(())
}

fn print_article(article: &Article) {
    let lema = article.lema();
    let mut header = lema.lema().bold().cyan().to_string();
    if lema.index() > 0 {
        header.push_str(&lema.index().to_string().dimmed().to_string());
    }
    if !lema.female_suffix().is_empty() {
        header.push_str(&format!(", {}", lema.female_suffix()));
    }
    if article.is_verb() {
        header.push_str(&format!(" ~ {}", "verbo".italic()));
    }
    println!("\n{}", header);

    print_entry_body(article.entry());

    for complex_form in article.complex_forms() {
        println!("\n  {}", complex_form.lema().lema().bold());
        print_entry_body(complex_form);
    }

    if !article.other_entries().is_empty() {
        let others: Vec<String> = article
            .other_entries()
            .iter()
            .map(|w| w.text().to_string())
            .collect();
        println!("\n  {} {}", "Véase también:".dimmed(), others.join(", "));
    }
}

fn print_entry_body<L: LemaHeader>(entry: &Entry<L>) {
    for note in entry.supplementary_info() {
        println!("  {}", note.text().dimmed());
    }
    for definition in entry.definitions() {
        print_definition(definition);
    }
}

fn print_definition(definition: &Definition) {
    let mut marks = vec![definition.category().abbr().to_string()];
    marks.extend(definition.abbreviations().iter().map(|a| a.abbr().to_string()));
    println!(
        "  {} {} {}",
        format!("{}.", definition.index()).bold(),
        marks.join(" ").italic(),
        definition.text()
    );
    for example in definition.examples() {
        println!("        {}", example.text().italic());
    }
    for group in definition.synonyms() {
        println!("        {} {}", "Sin.:".dimmed(), group.join(", ").green());
    }
    for group in definition.antonyms() {
        println!("        {} {}", "Ant.:".dimmed(), group.join(", ").red());
    }
}

fn print_word_list(label: &str, words: &[String]) {
    if !words.is_empty() {
        println!("\n{}: {}", label.bold(), words.join(", "));
    }
}

/// Handles the conjugate command.
async fn handle_conjugate(dle: &Dle, verb: &str) -> Result<()> {
    info!("Conjugating verb: '{}'", verb);
    let result = fetch_result(dle, verb, true).await?;

    match result.articles().iter().find_map(Article::conjugation) {
        Some(conjugation) => print_conjugation(conjugation),
        None => println!("No conjugation found for '{}'.", verb.yellow()),
    }
    Ok(())
}

fn print_conjugation(conjugation: &Conjugation) {
    println!("\n{}", conjugation.verb().bold().cyan());

    println!("\n{}", "Formas no personales".bold());
    for form in NonPersonal::ALL {
        println!("  {:<12} {}", form.label().dimmed(), conjugation.non_personal(form));
    }

    for mood in Mood::ALL {
        println!("\n{}", mood.label().bold());
        for tense in mood.tenses() {
            let forms: Vec<(Person, &str)> = Person::ALL
                .iter()
                .filter_map(|p| conjugation.form(mood, *tense, *p).map(|f| (*p, f)))
                .collect();
            if forms.is_empty() {
                continue;
            }
            println!("  {}", tense.label().italic());
            for (person, form) in forms {
                println!("    {:<10} {}", person.label().dimmed(), form);
            }
        }
    }
}

/// Handles the parse command.
async fn handle_parse(file: &Path, extended: bool, lossy: bool) -> Result<()> {
    info!("Reading results page from {:?}", file);
    let html = tokio::fs::read_to_string(file).await?;
    let result = if lossy {
        parse_search_result_lossy(html).await?
    } else {
        parse_search_result(html).await?
    };
    println!("{}", serde_json::to_string_pretty(&result.to_dict(extended))?);
    Ok(())
}

/// Handles the cached command.
fn handle_cached(dle: &Dle, json: bool) -> Result<()> {
    let pages = dle.cached_pages()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }
    if pages.is_empty() {
        println!("The page cache at {:?} is empty.", dle.db_path());
        return Ok(());
    }
    println!("{} cached pages in {:?}", pages.len().to_string().bold(), dle.db_path());
    for page in pages {
        println!("  {:<24} {:>8} bytes", page.term.cyan(), page.size);
    }
    Ok(())
}
