use std::collections::HashSet;

use super::{CURRENT_USER_ID, INBOX_LABEL};

/// Filters applied when listing candidate messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub user_id: String,
    pub label_ids: Vec<String>,
    pub excluded_ids: HashSet<String>,
    /// Forwarded to the provider as the per-page maximum.
    pub max_results: Option<u32>,
    pub query: Option<String>,
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    pub fn is_excluded(&self, message_id: &str) -> bool {
        self.excluded_ids.contains(message_id)
    }

    /// Returns the query only when it has non-whitespace content.
    pub fn effective_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct SearchCriteriaBuilder {
    user_id: String,
    label_ids: Vec<String>,
    excluded_ids: HashSet<String>,
    max_results: Option<u32>,
    query: Option<String>,
}

impl Default for SearchCriteriaBuilder {
    fn default() -> Self {
        Self {
            user_id: CURRENT_USER_ID.to_string(),
            label_ids: vec![INBOX_LABEL.to_string()],
            excluded_ids: HashSet::new(),
            max_results: None,
            query: None,
        }
    }
}

impl SearchCriteriaBuilder {
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn label_ids<I, S>(mut self, label_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_ids = label_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn max_results(mut self, max_results: Option<u32>) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    pub fn build(self) -> SearchCriteria {
        SearchCriteria {
            user_id: self.user_id,
            label_ids: self.label_ids,
            excluded_ids: self.excluded_ids,
            max_results: self.max_results,
            query: self.query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let criteria = SearchCriteria::builder().build();
        assert_eq!(criteria.user_id, "me");
        assert_eq!(criteria.label_ids, vec!["INBOX".to_string()]);
        assert!(criteria.excluded_ids.is_empty());
        assert_eq!(criteria.max_results, None);
        assert_eq!(criteria.query, None);
        assert_eq!(criteria, SearchCriteria::default());
    }

    #[test]
    fn test_builder_overrides() {
        let criteria = SearchCriteria::builder()
            .user_id("someone@example.com")
            .label_ids(["INBOX", "IMPORTANT"])
            .exclude(["a", "b"])
            .max_results(Some(20))
            .query(Some("is:unread".to_string()))
            .build();

        assert_eq!(criteria.user_id, "someone@example.com");
        assert_eq!(criteria.label_ids.len(), 2);
        assert!(criteria.is_excluded("a"));
        assert!(!criteria.is_excluded("c"));
        assert_eq!(criteria.max_results, Some(20));
        assert_eq!(criteria.effective_query(), Some("is:unread"));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let criteria = SearchCriteria::builder()
            .query(Some("   ".to_string()))
            .build();
        assert_eq!(criteria.effective_query(), None);
    }
}
