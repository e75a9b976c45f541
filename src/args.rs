use clap::Parser;
use std::path::PathBuf;

/// Search GitHub for repositories and clone a chosen subset of the results.
#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Searches GitHub repositories, lists the matches and batch-clones the ones you pick with range expressions such as \"1-5,10,15-20\"."
)]
pub struct Args {
    /// Search query, using GitHub repository search syntax.
    /// Prompted for when omitted.
    pub query: Option<String>,

    /// Results to clone, e.g. "1-5,10". Prompted for when omitted.
    #[clap(short, long, value_name = "SPEC")]
    pub select: Option<String>,

    /// Directory to clone repositories into.
    #[clap(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Maximum number of repositories to list.
    #[clap(short = 'n', long, default_value = "1000", value_name = "NUM")]
    pub max_results: usize,

    /// Results requested per page (GitHub allows at most 100).
    #[clap(short = 'p', long, default_value = "100", value_name = "NUM")]
    pub per_page: u32,

    /// Attempts per page, counting the first request, before giving up on
    /// rate limits or network errors.
    #[clap(short = 'a', long, default_value = "5", value_name = "NUM")]
    pub max_attempts: u32,

    /// GitHub API token for authentication. Falls back to GITHUB_TOKEN.
    #[clap(short, long)]
    pub token: Option<String>,
}
