//! Ordered table of preferred link domains.

use url::Url;

use crate::config::DEFAULT_PRIORITY_DOMAINS;

/// Ordered list of domain substrings; earlier entries rank higher.
///
/// A URL matches entry `i` when its host contains the entry. The score of a
/// match is `len - i`, so the first entry scores highest and non-matching
/// URLs score zero.
///
/// ```rust
/// use eizo::resolve::PriorityTable;
///
/// let table = PriorityTable::new(vec!["wixmp.com".into(), "sharepoint.com".into()]);
/// assert_eq!(table.score("https://repackager.wixmp.com/v.mp4"), 2);
/// assert_eq!(table.score("https://x.sharepoint.com/v.mp4"), 1);
/// assert_eq!(table.score("https://elsewhere.example/v.mp4"), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    domains: Vec<String>,
}

impl PriorityTable {
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Index of the first entry matching the URL's host.
    pub fn rank(&self, url: &str) -> Option<usize> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        self.domains
            .iter()
            .position(|domain| !domain.is_empty() && host.contains(domain.as_str()))
    }

    /// `len - rank` for matching URLs, zero otherwise.
    pub fn score(&self, url: &str) -> usize {
        self.rank(url).map_or(0, |index| self.domains.len() - index)
    }

    /// Whether the URL matches one of the first `depth` entries.
    pub fn is_urgent(&self, url: &str, depth: usize) -> bool {
        self.rank(url).is_some_and(|index| index < depth)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_DOMAINS.iter().map(|d| d.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriorityTable {
        PriorityTable::new(vec![
            "alpha.example".into(),
            "beta.example".into(),
            "gamma.example".into(),
            "delta.example".into(),
        ])
    }

    #[test]
    fn score_is_length_minus_index() {
        let t = table();
        assert_eq!(t.score("https://cdn.alpha.example/a"), 4);
        assert_eq!(t.score("https://beta.example/a"), 3);
        assert_eq!(t.score("https://delta.example/a"), 1);
        assert_eq!(t.score("https://omega.example/a"), 0);
    }

    #[test]
    fn only_host_is_matched() {
        let t = table();
        assert_eq!(t.score("https://omega.example/alpha.example/v.mp4"), 0);
        assert_eq!(t.score("not a url"), 0);
    }

    #[test]
    fn urgency_respects_depth() {
        let t = table();
        assert!(t.is_urgent("https://gamma.example/a", 3));
        assert!(!t.is_urgent("https://delta.example/a", 3));
        assert!(!t.is_urgent("https://omega.example/a", 3));
    }

    #[test]
    fn default_table_is_populated() {
        assert!(!PriorityTable::default().is_empty());
    }
}
