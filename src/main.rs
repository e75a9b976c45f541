use clap::Parser;
use dotenv::dotenv;
use futures::StreamExt;
use github_reaper::{
    Args, CloneReport, Config, Error, GitHubClient, RepositoryCloner, SearchResult, SelectionSet,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::Duration;
use tracing::{error, info, warn};

const RULE_WIDTH: usize = 80;
const DESCRIPTION_WIDTH: usize = 70;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize the tracing logger; stdout is reserved for the listing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    dotenv().ok();

    let args = Args::parse();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let query = match args.query.clone() {
        Some(query) => query,
        None => match prompt(&mut input, "Enter your search query (or 'quit' to exit): ").await? {
            Some(query) if !query.eq_ignore_ascii_case("quit") => query,
            _ => return Ok(ExitCode::SUCCESS),
        },
    };

    let (results, search_error) = search(config.clone(), &query).await?;
    if let Some(e) = &search_error {
        error!("Search stopped early: {}", e);
        eprintln!("\nError: {}", e);
        if results.is_empty() {
            return Ok(ExitCode::FAILURE);
        }
        eprintln!("Continuing with the {} repositories received so far.", results.len());
    }
    if results.is_empty() {
        println!("No repositories found.");
        return Ok(ExitCode::SUCCESS);
    }

    display_repositories(&results);

    let selection = match &args.select {
        Some(spec) => match SelectionSet::parse(spec, results.len()) {
            Ok(selection) => selection,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(ExitCode::FAILURE);
            }
        },
        None => match prompt_selection(&mut input, results.len()).await? {
            Some(selection) => selection,
            None => return Ok(ExitCode::SUCCESS),
        },
    };

    let cloner = RepositoryCloner::from_config(&config).await?.with_progress();
    let report = cloner.clone_selected(&results, &selection).await;
    display_report(&report);

    if search_error.is_some() || !report.is_success() {
        Ok(ExitCode::FAILURE)
    } else {
        info!("All selected repositories are in place");
        Ok(ExitCode::SUCCESS)
    }
}

/// Run the search with a spinner, returning what arrived before any error.
async fn search(config: Config, query: &str) -> Result<(Vec<SearchResult>, Option<Error>), Error> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Searching for '{}'", query));

    let per_page = config.per_page;
    let client = GitHubClient::new(config)?.with_progress(spinner.clone());

    let stream = client.search(query, per_page);
    futures::pin_mut!(stream);

    let mut results = Vec::new();
    let mut search_error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(result) => {
                results.push(result);
                spinner.set_message(format!(
                    "Searching for '{}' - {} repositories so far",
                    query,
                    results.len()
                ));
            }
            Err(e) => {
                search_error = Some(e);
                break;
            }
        }
    }

    spinner.finish_and_clear();
    Ok((results, search_error))
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, message: &str) -> std::io::Result<Option<String>> {
    print!("{}", message);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

/// Ask which repositories to clone until the answer parses.
///
/// Enter selects everything and `none` selects nothing. Returns `None` when
/// stdin is closed.
async fn prompt_selection(
    input: &mut Lines<BufReader<Stdin>>,
    total: usize,
) -> std::io::Result<Option<SelectionSet>> {
    println!("\nEnter the repositories to clone:");
    println!("  - Single numbers: 1, 5, 10");
    println!("  - Ranges: 1-5, 10-15");
    println!("  - Combined: 1-5,10,15-20");
    println!("  - Press Enter to clone all");
    println!("  - Type 'none' to exit without cloning");

    loop {
        let answer = match prompt(input, "\nYour selection: ").await? {
            Some(answer) => answer,
            None => return Ok(None),
        };

        if answer.is_empty() {
            return Ok(Some(SelectionSet::all(total)));
        }
        if answer.eq_ignore_ascii_case("none") {
            return Ok(Some(SelectionSet::default()));
        }

        match SelectionSet::parse(&answer, total) {
            Ok(selection) => return Ok(Some(selection)),
            Err(e) if e.is_recoverable() => {
                warn!("Rejected selection '{}': {}", answer, e);
                println!("{}. Valid indices are 1-{}.", e, total);
            }
            Err(e) => return Err(std::io::Error::other(e.to_string())),
        }
    }
}

fn display_repositories(results: &[SearchResult]) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{}", rule);
    println!("Repositories Found: {}", results.len());
    println!("{}", rule);

    for repo in results {
        let lang = repo
            .language
            .as_deref()
            .map(|l| format!(" [{}]", l))
            .unwrap_or_default();
        let stars = if repo.stars > 0 {
            format!(" ⭐ {}", repo.stars)
        } else {
            String::new()
        };
        println!("{:3}. {}{}{}", repo.index, repo.full_name, lang, stars);

        if let Some(description) = repo.description.as_deref().filter(|d| !d.trim().is_empty()) {
            println!("     {}", truncate(description.trim(), DESCRIPTION_WIDTH));
        }
    }

    println!("{}", rule);
}

fn display_report(report: &CloneReport) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{}", rule);
    println!("Cloning Results:");
    println!("{}", rule);

    if !report.cloned.is_empty() {
        println!("\n✅ Successfully cloned {} repositories:", report.cloned.len());
        for name in &report.cloned {
            println!("   - {}", name);
        }
    }
    if !report.skipped.is_empty() {
        println!("\n⏭  Skipped {} existing repositories:", report.skipped.len());
        for name in &report.skipped {
            println!("   - {}", name);
        }
    }
    if !report.failed.is_empty() {
        println!("\n❌ Failed to clone {} repositories:", report.failed.len());
        for (name, reason) in &report.failed {
            println!("   - {}: {}", name, reason);
        }
    }

    println!(
        "\nTotal: {} cloned, {} skipped, {} failed",
        report.cloned.len(),
        report.skipped.len(),
        report.failed.len()
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width).collect();
        format!("{}...", cut.trim_end())
    }
}
