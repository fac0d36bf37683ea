//! Domain scoping for a crawl run.

use crate::CrawlError;
use tracing::debug;
use url::Url;

/// The seed's host and the rule that keeps a crawl inside it.
///
/// A candidate is in scope when its host equals the seed host or is a
/// subdomain of it. Comparison is case-insensitive.
#[derive(Debug, Clone)]
pub struct DomainScope {
    domain: String,
    subdomain_suffix: String,
}

impl DomainScope {
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        let subdomain_suffix = format!(".{domain}");
        Self {
            domain,
            subdomain_suffix,
        }
    }

    /// Parses the seed and derives the crawl domain from its host.
    pub fn from_seed(seed: &str) -> Result<(Self, Url), CrawlError> {
        let url = Url::parse(seed.trim())
            .map_err(|e| CrawlError::SeedInvalid(format!("{seed}: {e}")))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CrawlError::SeedInvalid(format!("{seed}: URL has no host")))?;
        Ok((Self::new(host), url))
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn host_in_scope(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.domain || host.ends_with(&self.subdomain_suffix)
    }

    /// Returns whether `candidate` may be scheduled. Unparseable candidates
    /// are logged and treated as out of scope.
    pub fn in_scope(&self, candidate: &str) -> bool {
        match self.check(candidate) {
            Ok(in_scope) => in_scope,
            Err(e) => {
                debug!("Dropping link: {}", e);
                false
            }
        }
    }

    pub fn check(&self, candidate: &str) -> Result<bool, CrawlError> {
        let url = Url::parse(candidate.trim())
            .map_err(|e| CrawlError::LinkInvalid(format!("{candidate}: {e}")))?;
        match url.host_str() {
            Some(host) => Ok(self.host_in_scope(host)),
            None => Err(CrawlError::LinkInvalid(format!("{candidate}: URL has no host"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_in_scope() {
        let scope = DomainScope::new("example.com");
        assert!(scope.in_scope("https://example.com/path"));
        assert!(scope.in_scope("http://EXAMPLE.com/other?q=1"));
    }

    #[test]
    fn test_subdomain_in_scope() {
        let scope = DomainScope::new("example.com");
        assert!(scope.in_scope("https://blog.example.com/"));
        assert!(scope.in_scope("https://a.b.example.com/x"));
    }

    #[test]
    fn test_lookalike_hosts_out_of_scope() {
        let scope = DomainScope::new("example.com");
        assert!(!scope.in_scope("https://notexample.com/"));
        assert!(!scope.in_scope("https://example.com.evil.test/"));
        assert!(!scope.in_scope("https://other.test/x"));
    }

    #[test]
    fn test_malformed_link_out_of_scope() {
        let scope = DomainScope::new("example.com");
        assert!(!scope.in_scope("not a url"));
        assert!(!scope.in_scope("mailto:someone@example.com"));
        assert!(matches!(
            scope.check("::::"),
            Err(CrawlError::LinkInvalid(_))
        ));
    }

    #[test]
    fn test_from_seed() {
        let (scope, url) = DomainScope::from_seed("  http://WWW.Shop.test/index.htm#top ").unwrap();
        assert_eq!(scope.domain(), "www.shop.test");
        assert_eq!(url.host_str(), Some("www.shop.test"));
    }

    #[test]
    fn test_from_seed_rejects_hostless() {
        assert!(matches!(
            DomainScope::from_seed("invalid-url"),
            Err(CrawlError::SeedInvalid(_))
        ));
        assert!(matches!(
            DomainScope::from_seed("file:///etc/passwd"),
            Err(CrawlError::SeedInvalid(_))
        ));
    }
}
