use std::path::{Path, PathBuf};
use std::process::Stdio;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{CloneOutcome, CloneReport, SearchResult};
use crate::selection::SelectionSet;

/// Runs `git clone` for selected search results, one at a time.
pub struct RepositoryCloner {
    clone_dir: PathBuf,
    git_program: String,
    timeout: Duration,
    progress: ProgressBar,
}

impl RepositoryCloner {
    /// Creates the clone directory if it does not exist yet.
    pub async fn new(clone_dir: impl Into<PathBuf>, clone_timeout: Duration) -> Result<Self> {
        let clone_dir = clone_dir.into();
        tokio::fs::create_dir_all(&clone_dir).await?;

        Ok(RepositoryCloner {
            clone_dir,
            git_program: "git".to_string(),
            timeout: clone_timeout,
            progress: ProgressBar::hidden(),
        })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.clone_dir, config.clone_timeout).await
    }

    /// Use a different executable in place of `git`.
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    /// Render batch progress on a visible bar.
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.progress = pb;
        self
    }

    pub fn clone_dir(&self) -> &Path {
        &self.clone_dir
    }

    /// Clone every selected result in index order. Individual failures are
    /// recorded in the report and never stop the batch.
    pub async fn clone_selected(
        &self,
        results: &[SearchResult],
        selection: &SelectionSet,
    ) -> CloneReport {
        let selected: Vec<&SearchResult> = results
            .iter()
            .filter(|r| selection.contains(r.index))
            .collect();

        let mut report = CloneReport::default();
        if selected.is_empty() {
            info!("No repositories selected for cloning");
            return report;
        }

        info!(
            "Cloning {} repositories into {}",
            selected.len(),
            self.clone_dir.display()
        );
        self.progress.set_length(selected.len() as u64);
        self.progress.set_position(0);

        for result in selected {
            self.progress
                .set_message(format!("Cloning {}", result.full_name));
            let outcome = self.clone_one(result).await;

            match &outcome {
                CloneOutcome::Cloned => {
                    self.progress
                        .println(format!("✓ Cloned {}", result.full_name));
                }
                CloneOutcome::Skipped => {
                    self.progress
                        .println(format!("- Skipped {}: already exists", result.full_name));
                }
                CloneOutcome::Failed { reason } => {
                    self.progress
                        .println(format!("✗ Failed {}: {}", result.full_name, reason));
                }
            }

            report.record(&result.full_name, outcome);
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        report
    }

    /// Clone a single repository into `<clone_dir>/<name>`.
    pub async fn clone_one(&self, result: &SearchResult) -> CloneOutcome {
        let destination = self.clone_dir.join(&result.name);

        if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
            warn!(
                "Skipping {}: {} already exists",
                result.full_name,
                destination.display()
            );
            return CloneOutcome::Skipped;
        }

        debug!(
            "Running {} clone {} {}",
            self.git_program,
            result.url,
            destination.display()
        );
        let mut command = Command::new(&self.git_program);
        command
            .arg("clone")
            .arg(&result.url)
            .arg(&destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Could not run {} for {}: {}", self.git_program, result.full_name, e);
                return CloneOutcome::Failed {
                    reason: format!("could not run {}: {}", self.git_program, e),
                };
            }
            Err(_) => {
                error!(
                    "Timed out cloning {} after {}s",
                    result.full_name,
                    self.timeout.as_secs()
                );
                return CloneOutcome::Failed {
                    reason: format!("timed out after {}s", self.timeout.as_secs()),
                };
            }
        };

        if output.status.success() {
            info!("Cloned {} into {}", result.full_name, destination.display());
            return CloneOutcome::Cloned;
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| output.status.to_string());
        error!("Error cloning {}: {}", result.full_name, reason);
        CloneOutcome::Failed { reason }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn result(index: usize, name: &str) -> SearchResult {
        SearchResult {
            index,
            name: name.to_string(),
            full_name: format!("user/{}", name),
            url: format!("https://github.com/user/{}.git", name),
            description: None,
            language: None,
            stars: 0,
        }
    }

    async fn cloner(dir: &Path, program: &str) -> RepositoryCloner {
        RepositoryCloner::new(dir, Duration::from_secs(10))
            .await
            .unwrap()
            .with_git_program(program)
    }

    #[tokio::test]
    async fn creates_missing_clone_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("clones");
        let cloner = cloner(&dir, "true").await;
        assert!(cloner.clone_dir().is_dir());
    }

    #[tokio::test]
    async fn zero_exit_is_cloned() {
        let tmp = tempfile::tempdir().unwrap();
        let cloner = cloner(tmp.path(), "true").await;
        assert_eq!(cloner.clone_one(&result(1, "repo")).await, CloneOutcome::Cloned);
    }

    #[tokio::test]
    async fn non_zero_exit_is_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let cloner = cloner(tmp.path(), "false").await;
        assert!(matches!(
            cloner.clone_one(&result(1, "repo")).await,
            CloneOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn missing_program_is_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let cloner = cloner(tmp.path(), "definitely-not-a-real-git-binary").await;
        match cloner.clone_one(&result(1, "repo")).await {
            CloneOutcome::Failed { reason } => assert!(reason.starts_with("could not run")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn existing_destination_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("repo")).unwrap();
        // `false` would fail if it were ever run.
        let cloner = cloner(tmp.path(), "false").await;
        assert_eq!(cloner.clone_one(&result(1, "repo")).await, CloneOutcome::Skipped);
    }

    #[tokio::test]
    async fn only_selected_results_are_cloned() {
        let tmp = tempfile::tempdir().unwrap();
        let cloner = cloner(tmp.path(), "true").await;
        let results: Vec<_> = (1..=5).map(|i| result(i, &format!("repo{}", i))).collect();
        let selection = SelectionSet::parse("2,4-5", results.len()).unwrap();

        let report = cloner.clone_selected(&results, &selection).await;
        assert_eq!(report.cloned, vec!["user/repo2", "user/repo4", "user/repo5"]);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("repo1")).unwrap();
        let cloner = cloner(tmp.path(), "false").await;
        let results: Vec<_> = (1..=3).map(|i| result(i, &format!("repo{}", i))).collect();

        let report = cloner
            .clone_selected(&results, &SelectionSet::all(results.len()))
            .await;
        assert_eq!(report.skipped, vec!["user/repo1"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.total(), 3);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn empty_selection_clones_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cloner = cloner(tmp.path(), "false").await;
        let results = vec![result(1, "repo1")];
        let report = cloner
            .clone_selected(&results, &SelectionSet::default())
            .await;
        assert_eq!(report.total(), 0);
    }
}
