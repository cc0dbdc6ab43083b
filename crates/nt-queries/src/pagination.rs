//! Pagination parameters
//!
//! Parsing is permissive: a malformed or non-positive `page`/`limit` falls
//! back to its default instead of rejecting the listing request.

/// Page used when `page` is absent or malformed (1-indexed)
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or malformed
pub const DEFAULT_LIMIT: u64 = 100;

/// Largest page size honoured; larger requests are clamped
pub const MAX_LIMIT: u64 = 1000;

/// A requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Read raw `page` and `limit` values
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(
            parse_positive(page).unwrap_or(DEFAULT_PAGE),
            parse_positive(limit).unwrap_or(DEFAULT_LIMIT),
        )
    }

    /// Number of documents skipped before this page
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip() {
        assert_eq!(PageRequest::parse(Some("2"), Some("10")).skip(), 10);
        assert_eq!(PageRequest::parse(Some("3"), Some("25")).skip(), 50);
        assert_eq!(PageRequest::parse(Some("1"), Some("7")).skip(), 0);
    }

    #[test]
    fn test_defaults() {
        let page = PageRequest::parse(None, None);
        assert_eq!(page, PageRequest::default());
        assert_eq!(page.limit, DEFAULT_LIMIT);
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let page = PageRequest::parse(Some("two"), Some("-5"));
        assert_eq!(page.page, DEFAULT_PAGE);
        assert_eq!(page.limit, DEFAULT_LIMIT);

        let zero = PageRequest::parse(Some("0"), Some("0"));
        assert_eq!(zero, PageRequest::default());

        let fractional = PageRequest::parse(Some("1.5"), Some("abc"));
        assert_eq!(fractional, PageRequest::default());
    }

    #[test]
    fn test_limit_is_capped() {
        let page = PageRequest::parse(Some("1"), Some("1000000"));
        assert_eq!(page.limit, MAX_LIMIT);
    }
}
