use dashmap::DashSet;

/// Canonical key for visited-set lookups.
///
/// Only surrounding whitespace and one trailing slash are removed. Queries and
/// fragments are kept, so `/a?x=1` and `/a?x=2` are different pages.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

/// Set of URLs already claimed by a crawl run.
///
/// Membership is decided by a single insert on a sharded concurrent set, so
/// two tasks racing on the same link cannot both win.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url` for fetching. Returns `true` only for the first caller.
    pub fn try_visit(&self, url: &str) -> bool {
        self.urls.insert(normalize_url(url))
    }

    /// Number of distinct URLs claimed so far.
    pub fn claimed(&self) -> usize {
        self.urls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("  http://a.test/b/ "), "http://a.test/b");
        assert_eq!(normalize_url("http://a.test/"), "http://a.test");
        assert_eq!(normalize_url("http://a.test//"), "http://a.test/");
        assert_eq!(normalize_url("http://a.test/b?x=1"), "http://a.test/b?x=1");
        assert_eq!(normalize_url("http://a.test/b#top"), "http://a.test/b#top");
    }

    #[test]
    fn test_try_visit_once() {
        let visited = VisitedSet::new();
        assert!(visited.try_visit("http://a.test/b"));
        assert!(!visited.try_visit("http://a.test/b/"));
        assert!(!visited.try_visit(" http://a.test/b"));
        assert!(visited.try_visit("http://a.test/b?page=2"));
        assert_eq!(visited.claimed(), 2);
    }

    #[test]
    fn test_concurrent_try_visit_single_winner() {
        let visited = Arc::new(VisitedSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| visited.try_visit(&format!("http://a.test/{i}")))
                        .count()
                })
            })
            .collect();

        let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(wins, 100);
        assert_eq!(visited.claimed(), 100);
    }
}
