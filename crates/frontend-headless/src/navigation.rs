//! Session history and the staged notifications of a page load

use std::collections::VecDeque;

/// One notification of a load in progress, raised one per engine poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStep {
    Started(String),
    Progress(u8),
    Title(String),
    Finished(String),
    Failed { url: String, description: String },
}

/// Back/forward list plus the queue of load notifications still to raise
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    index: Option<usize>,
    pending: VecDeque<LoadStep>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.index
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn can_go_back(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Navigate to `url`, dropping any forward entries
    pub fn navigate(&mut self, url: &str) {
        if !is_loadable(url) {
            tracing::debug!("Headless engine cannot load {:?}", url);
            self.pending.clear();
            self.pending.push_back(LoadStep::Failed {
                url: url.to_string(),
                description: "Unsupported URL".to_string(),
            });
            return;
        }

        let keep = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(url.to_string());
        self.index = Some(self.entries.len() - 1);
        self.stage_load(url.to_string());
    }

    pub fn back(&mut self) -> bool {
        match self.index {
            Some(i) if i > 0 => self.revisit(i - 1),
            _ => false,
        }
    }

    pub fn forward(&mut self) -> bool {
        match self.index {
            Some(i) if i + 1 < self.entries.len() => self.revisit(i + 1),
            _ => false,
        }
    }

    pub fn reload(&mut self) {
        if let Some(url) = self.current().map(str::to_string) {
            self.stage_load(url);
        }
    }

    /// Abandon the load in progress
    pub fn stop(&mut self) {
        self.pending.clear();
    }

    pub fn next_step(&mut self) -> Option<LoadStep> {
        self.pending.pop_front()
    }

    fn revisit(&mut self, index: usize) -> bool {
        let Some(url) = self.entries.get(index).cloned() else {
            return false;
        };
        self.index = Some(index);
        self.stage_load(url);
        true
    }

    fn stage_load(&mut self, url: String) {
        self.pending.clear();
        self.pending.extend([
            LoadStep::Started(url.clone()),
            LoadStep::Progress(10),
            LoadStep::Progress(60),
            LoadStep::Title(title_for(&url)),
            LoadStep::Progress(100),
            LoadStep::Finished(url),
        ]);
    }
}

/// Whether the headless engine can "load" `url`
pub fn is_loadable(url: &str) -> bool {
    url.starts_with("about:") || url.starts_with("data:") || url.contains("://")
}

/// Page title derived from the URL: everything after the scheme
pub fn title_for(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .trim_end_matches('/');
    if rest.is_empty() {
        url.to_string()
    } else {
        rest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(history: &mut History) -> Vec<LoadStep> {
        std::iter::from_fn(|| history.next_step()).collect()
    }

    #[test]
    fn test_load_raises_steps_in_order() {
        let mut history = History::new();
        history.navigate("https://example.com/a");

        assert_eq!(
            drain(&mut history),
            vec![
                LoadStep::Started("https://example.com/a".into()),
                LoadStep::Progress(10),
                LoadStep::Progress(60),
                LoadStep::Title("example.com/a".into()),
                LoadStep::Progress(100),
                LoadStep::Finished("https://example.com/a".into()),
            ]
        );
        assert!(!history.is_loading());
    }

    #[test]
    fn test_back_forward_and_truncation() {
        let mut history = History::new();
        history.navigate("https://a.test/");
        history.navigate("https://b.test/");
        history.navigate("https://c.test/");
        assert!(history.can_go_back());
        assert!(!history.can_go_forward());

        assert!(history.back());
        assert!(history.back());
        assert_eq!(history.current(), Some("https://a.test/"));
        assert!(!history.back());
        assert!(history.can_go_forward());

        // Navigating from the middle drops the forward entries
        history.navigate("https://d.test/");
        assert!(!history.can_go_forward());
        assert!(history.back());
        assert_eq!(history.current(), Some("https://a.test/"));
    }

    #[test]
    fn test_invalid_url_fails_without_history_entry() {
        let mut history = History::new();
        history.navigate("example");
        assert!(matches!(
            drain(&mut history).as_slice(),
            [LoadStep::Failed { url, .. }] if url == "example"
        ));
        assert_eq!(history.current(), None);
    }

    #[test]
    fn test_stop_abandons_pending_steps() {
        let mut history = History::new();
        history.navigate("about:blank");
        history.next_step();
        history.stop();
        assert!(history.next_step().is_none());
        assert_eq!(history.current(), Some("about:blank"));
    }

    #[test]
    fn test_title_for() {
        assert_eq!(title_for("https://example.com/"), "example.com");
        assert_eq!(title_for("about:blank"), "about:blank");
    }
}
