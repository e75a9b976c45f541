use chrono::Utc;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::{Config, MAX_PER_PAGE};
use crate::error::{Error, Result};
use crate::models::{SearchPage, SearchResult};
use crate::retry::RetryPhase;

const API_VERSION: &str = "2022-11-28";

/// Paginated repository search with rate-limit-aware retries.
pub struct GitHubClient {
    client: Client,
    config: Config,
    progress: ProgressBar,
}

/// How a single page request ended.
enum PageResponse {
    Page(SearchPage),
    /// GitHub refuses to serve beyond its search window.
    End,
    RateLimited(Option<Duration>),
}

/// A retryable failure of one attempt.
enum Retryable {
    RateLimited(Option<Duration>),
    Transport(reqwest::Error),
}

struct Cursor {
    query: String,
    page: u32,
    page_size: u32,
    next_index: usize,
    done: bool,
}

impl GitHubClient {
    /// Create a new client from a resolved configuration
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;

        Ok(GitHubClient {
            client,
            config,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report rate-limit waits on `pb` instead of staying silent.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lazily search repositories matching `query`.
    ///
    /// Pages are fetched one at a time as the stream is polled, and results
    /// are numbered from 1 in the order they are yielded. The stream ends when
    /// GitHub has no further pages or `max_results` is reached. The first error
    /// is yielded once and ends the stream; dropping the stream early abandons
    /// the search.
    pub fn search(
        &self,
        query: &str,
        page_size: u32,
    ) -> impl Stream<Item = Result<SearchResult>> + '_ {
        let cursor = Cursor {
            query: query.trim().to_string(),
            page: 1,
            page_size: page_size.clamp(1, MAX_PER_PAGE),
            next_index: 1,
            done: false,
        };

        stream::try_unfold(cursor, move |cursor| self.next_page(cursor))
            .map_ok(|results| stream::iter(results.into_iter().map(Ok::<_, Error>)))
            .try_flatten()
    }

    async fn next_page(&self, mut cursor: Cursor) -> Result<Option<(Vec<SearchResult>, Cursor)>> {
        if cursor.done {
            return Ok(None);
        }
        if cursor.query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let remaining = self
            .config
            .max_results
            .saturating_sub(cursor.next_index - 1);
        if remaining == 0 {
            info!("Max results reached for '{}'", cursor.query);
            return Ok(None);
        }

        if cursor.page > 1 && !self.config.request_delay.is_zero() {
            sleep(self.config.request_delay).await;
        }

        let page = match self
            .fetch_page(&cursor.query, cursor.page, cursor.page_size)
            .await?
        {
            Some(page) => page,
            None => return Ok(None),
        };

        let received = page.items.len();
        if received == 0 {
            debug!("No more results for '{}'", cursor.query);
            return Ok(None);
        }
        if page.incomplete_results {
            warn!(
                "GitHub reported incomplete results for '{}' page {}",
                cursor.query, cursor.page
            );
        }

        let first = cursor.next_index;
        let results: Vec<SearchResult> = page
            .items
            .into_iter()
            .take(remaining)
            .enumerate()
            .map(|(offset, item)| item.into_result(first + offset))
            .collect();

        cursor.next_index += results.len();
        let seen = cursor.next_index - 1;
        cursor.done = received < cursor.page_size as usize
            || seen as u64 >= page.total_count
            || seen >= self.config.max_results;

        info!(
            "Received {} results for '{}' page {} ({} of {})",
            results.len(),
            cursor.query,
            cursor.page,
            seen,
            page.total_count
        );
        cursor.page += 1;

        Ok(Some((results, cursor)))
    }

    /// Fetch one page, retrying rate limits and transport failures.
    ///
    /// Returns `None` when GitHub signals that no further pages exist.
    pub async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Option<SearchPage>> {
        let mut state = self.config.retry.start();

        loop {
            let failure = match self.attempt_page(query, page, page_size).await? {
                Ok(PageResponse::Page(body)) => {
                    state.succeed();
                    return Ok(Some(body));
                }
                Ok(PageResponse::End) => {
                    state.succeed();
                    warn!("Reached search limit for '{}' at page {}", query, page);
                    return Ok(None);
                }
                Ok(PageResponse::RateLimited(hint)) => Retryable::RateLimited(hint),
                Err(e) => Retryable::Transport(e),
            };

            let hint = match &failure {
                Retryable::RateLimited(hint) => *hint,
                Retryable::Transport(_) => None,
            };

            match state.fail(hint) {
                RetryPhase::BackingOff { attempt, wait } => {
                    let reason = match &failure {
                        Retryable::RateLimited(_) => "Rate limited".to_string(),
                        Retryable::Transport(e) => format!("Transport error ({})", e),
                    };
                    warn!(
                        "{} on '{}' page {} (attempt {}/{}). Waiting {:.1} seconds...",
                        reason,
                        query,
                        page,
                        attempt,
                        self.config.retry.max_attempts,
                        wait.as_secs_f64()
                    );
                    self.wait_with_progress(&reason, wait).await;
                    state.resume();
                }
                _ => {
                    let attempts = state.attempt();
                    return Err(match failure {
                        Retryable::RateLimited(_) => Error::RateLimitExhausted { attempts },
                        Retryable::Transport(source) => Error::Transport { attempts, source },
                    });
                }
            }
        }
    }

    /// One network round trip. The outer `Result` carries failures that must
    /// not be retried; the inner one carries transient transport errors.
    async fn attempt_page(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<std::result::Result<PageResponse, reqwest::Error>> {
        debug!(
            "Requesting {} q={} page={} per_page={}",
            self.config.base_url, query, page, page_size
        );

        let response = match self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", query.to_string()),
                ("per_page", page_size.to_string()),
                ("page", page.to_string()),
            ])
            .header(ACCEPT, "application/vnd.github+json")
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if is_transient(&e) => return Ok(Err(e)),
            Err(e) => return Err(Error::Client(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<SearchPage>().await {
                Ok(body) => Ok(Ok(PageResponse::Page(body))),
                Err(e) if e.is_decode() => Err(Error::Decode(e)),
                Err(e) if is_transient(&e) => Ok(Err(e)),
                Err(e) => Err(Error::Client(e)),
            };
        }

        if let Some(hint) = rate_limit_hint(status, response.headers()) {
            return Ok(Ok(PageResponse::RateLimited(hint)));
        }

        match status {
            // Past the first page a 422 means the search window is used up;
            // on the first page it is a rejected query.
            StatusCode::UNPROCESSABLE_ENTITY if page > 1 => Ok(Ok(PageResponse::End)),
            StatusCode::UNAUTHORIZED => Err(Error::Authentication(
                error_message(response).await.unwrap_or_else(|| "Bad credentials".into()),
            )),
            _ => Err(Error::SearchRequest {
                status: status.as_u16(),
                message: error_message(response).await.unwrap_or_default(),
            }),
        }
    }

    async fn wait_with_progress(&self, reason: &str, wait: Duration) {
        let original_msg = self.progress.message();
        let end = tokio::time::Instant::now() + wait;

        loop {
            let now = tokio::time::Instant::now();
            if now >= end {
                break;
            }
            let remaining = end - now;
            self.progress.set_message(format!(
                "{} - waiting {}s",
                reason,
                remaining.as_secs() + 1
            ));
            sleep(remaining.min(Duration::from_millis(500))).await;
        }

        self.progress.set_message(original_msg);
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
}

/// Detects a rate-limit response and extracts the server's wait hint.
///
/// Returns `None` if the response is not a rate limit at all, and
/// `Some(None)` if it is one without a usable hint.
fn rate_limit_hint(status: StatusCode, headers: &HeaderMap) -> Option<Option<Duration>> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    let retry_after = header_u64(RETRY_AFTER.as_str());
    let exhausted = header_u64("X-RateLimit-Remaining") == Some(0);

    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (exhausted || retry_after.is_some()));
    if !limited {
        return None;
    }

    if let Some(secs) = retry_after {
        return Some(Some(Duration::from_secs(secs)));
    }

    let reset_hint = header_u64("X-RateLimit-Reset").and_then(|reset_timestamp| {
        let now = Utc::now().timestamp().max(0) as u64;
        (exhausted && reset_timestamp > now)
            .then(|| Duration::from_secs(reset_timestamp - now + 1))
    });
    Some(reset_hint)
}

/// GitHub error bodies look like `{"message": "..."}`.
async fn error_message(response: Response) -> Option<String> {
    let text = response.text().await.ok()?;
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    let message = message.trim().to_string();
    (!message.is_empty()).then_some(message)
}

/// Drain a search stream, keeping the results received before any error.
pub async fn collect_results<S>(results: S) -> (Vec<SearchResult>, Option<Error>)
where
    S: Stream<Item = Result<SearchResult>>,
{
    futures::pin_mut!(results);
    let mut collected = Vec::new();

    while let Some(item) = results.next().await {
        match item {
            Ok(result) => collected.push(result),
            Err(e) => return (collected, Some(e)),
        }
    }
    (collected, None)
}
