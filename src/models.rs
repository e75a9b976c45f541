use serde::Deserialize;

/// One repository in the displayed result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// 1-based position in the displayed list.
    pub index: usize,
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
}

/// Body of a `GET /search/repositories` response.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<RepositoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryItem {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
}

impl RepositoryItem {
    pub fn into_result(self, index: usize) -> SearchResult {
        SearchResult {
            index,
            name: self.name,
            full_name: self.full_name,
            url: self.clone_url.unwrap_or(self.html_url),
            description: self.description,
            language: self.language,
            stars: self.stargazers_count,
        }
    }
}

/// What happened to a single selected repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned,
    /// The destination directory already existed.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Default, Clone)]
pub struct CloneReport {
    pub cloned: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl CloneReport {
    pub fn record(&mut self, full_name: &str, outcome: CloneOutcome) {
        match outcome {
            CloneOutcome::Cloned => self.cloned.push(full_name.to_string()),
            CloneOutcome::Skipped => self.skipped.push(full_name.to_string()),
            CloneOutcome::Failed { reason } => self.failed.push((full_name.to_string(), reason)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.cloned.len() + self.skipped.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repository_item_from_api_json() {
        let page: SearchPage = serde_json::from_value(json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [{
                "id": 123,
                "name": "awesome-project",
                "full_name": "user/awesome-project",
                "html_url": "https://github.com/user/awesome-project",
                "clone_url": "https://github.com/user/awesome-project.git",
                "description": null,
                "language": "Rust",
                "stargazers_count": 1000
            }]
        }))
        .unwrap();

        let result = page.items.into_iter().next().unwrap().into_result(7);
        assert_eq!(result.index, 7);
        assert_eq!(result.name, "awesome-project");
        assert_eq!(result.url, "https://github.com/user/awesome-project.git");
        assert_eq!(result.description, None);
        assert_eq!(result.stars, 1000);
    }

    #[test]
    fn html_url_is_used_without_clone_url() {
        let item: RepositoryItem = serde_json::from_value(json!({
            "name": "repo",
            "full_name": "user/repo",
            "html_url": "https://github.com/user/repo"
        }))
        .unwrap();
        let result = item.into_result(1);
        assert_eq!(result.url, "https://github.com/user/repo");
        assert_eq!(result.stars, 0);
    }

    #[test]
    fn report_counts_outcomes() {
        let mut report = CloneReport::default();
        report.record("a/one", CloneOutcome::Cloned);
        report.record("a/two", CloneOutcome::Skipped);
        assert!(report.is_success());

        report.record(
            "a/three",
            CloneOutcome::Failed {
                reason: "exit status: 128".into(),
            },
        );
        assert!(!report.is_success());
        assert_eq!(report.total(), 3);
        assert_eq!(report.failed[0].0, "a/three");
    }
}
