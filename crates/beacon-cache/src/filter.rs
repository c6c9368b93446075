//! Include/exclude page pattern matching.

use regex::Regex;

use crate::error::CacheConfigError;

/// Compiled page include and exclude lists.
///
/// Patterns match anywhere in the page id. An exclude match always wins over
/// an include match.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PageFilter {
    /// Compiles both pattern lists.
    ///
    /// # Errors
    ///
    /// Returns `CacheConfigError::InvalidPattern` for the first pattern that
    /// fails to compile.
    pub fn compile<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, CacheConfigError> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// Whether events on `page_id` may be recorded.
    pub fn allows(&self, page_id: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(page_id)) {
            return false;
        }
        !self.exclude.iter().any(|re| re.is_match(page_id))
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, CacheConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).map_err(|source| CacheConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn empty_lists_allow_everything() {
        let filter = PageFilter::compile(&NONE, &NONE).unwrap();
        assert!(filter.allows(""));
        assert!(filter.allows("/console/home"));
    }

    #[test]
    fn include_list_requires_a_match() {
        let filter = PageFilter::compile(&["^/console"], &NONE).unwrap();
        assert!(filter.allows("/console/home"));
        assert!(!filter.allows("/admin"));
    }

    #[test]
    fn any_include_pattern_is_enough() {
        let filter = PageFilter::compile(&["^/a", "^/b"], &NONE).unwrap();
        assert!(filter.allows("/b/page"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = PageFilter::compile(&[".*"], &[".*"]).unwrap();
        assert!(!filter.allows("/console/home"));
    }

    #[test]
    fn exclude_matches_anywhere_in_the_id() {
        let filter = PageFilter::compile(&NONE, &["secret"]).unwrap();
        assert!(!filter.allows("/users/secret/settings"));
        assert!(filter.allows("/users/public"));
    }

    #[test]
    fn malformed_pattern_is_reported() {
        let err = PageFilter::compile(&NONE, &["(unclosed"]).unwrap_err();
        match err {
            CacheConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
