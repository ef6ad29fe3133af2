//! Wildcard filters used for subscriber listing and status search.
//!
//! `*` matches any run of characters; every other character is literal.
//! A blank pattern or a lone `*` matches everything.

use crate::{EntitlementError, EntitlementResult};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct WildcardFilter {
    matcher: Option<Regex>,
}

impl WildcardFilter {
    /// Compile a wildcard pattern. The match is anchored at both ends.
    pub fn new(pattern: &str) -> EntitlementResult<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern.chars().all(|c| c == '*') {
            return Ok(Self::match_all());
        }
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| {
            EntitlementError::with_source(format!("invalid search pattern '{pattern}'"), e)
        })?;
        Ok(Self {
            matcher: Some(regex),
        })
    }

    pub fn match_all() -> Self {
        Self { matcher: None }
    }

    pub fn matches_all(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            None => true,
            Some(re) => re.is_match(candidate),
        }
    }

    /// Match an optional value. Absent values only pass a match-all filter.
    pub fn matches_opt(&self, candidate: Option<&str>) -> bool {
        match candidate {
            Some(c) => self.matches(c),
            None => self.matches_all(),
        }
    }
}

impl Default for WildcardFilter {
    fn default() -> Self {
        Self::match_all()
    }
}
