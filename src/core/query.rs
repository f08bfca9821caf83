// Launcher Plugin Host - Query Model
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Keyword owned by plugins that want every query no other keyword claims
pub const GLOBAL_ACTION_KEYWORD: &str = "*";

/// A user query as typed into the launcher
///
/// The leading token only becomes the action name once the user has typed a
/// separator after it: `"g rust"` and `"g "` carry action `g`, a bare `"g"` is
/// still plain search text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub raw_query: String,
    pub action_name: String,
    pub action_parameters: Vec<String>,
    pub search: String,
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        let mut query = Query {
            raw_query: raw.to_string(),
            search: raw.trim().to_string(),
            ..Default::default()
        };

        let trimmed = raw.trim_start();
        let Some((first, rest)) = trimmed.split_once(char::is_whitespace) else {
            return query;
        };

        query.action_name = first.to_string();
        query.action_parameters = rest.split_whitespace().map(str::to_string).collect();
        query.search = rest.trim().to_string();
        query
    }

    /// Build a query with an explicit action token, bypassing parsing
    pub fn with_action(action_name: &str, search: &str) -> Self {
        Query {
            raw_query: format!("{} {}", action_name, search),
            action_name: action_name.to_string(),
            action_parameters: search.split_whitespace().map(str::to_string).collect(),
            search: search.to_string(),
        }
    }

    pub fn has_action(&self) -> bool {
        !self.action_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keyword_query() {
        let query = Query::parse("g rust lang");
        assert_eq!(query.action_name, "g");
        assert_eq!(query.action_parameters, vec!["rust", "lang"]);
        assert_eq!(query.search, "rust lang");
        assert_eq!(query.raw_query, "g rust lang");
    }

    #[test]
    fn test_parse_single_token_has_no_action() {
        let query = Query::parse("firefox");
        assert!(!query.has_action());
        assert_eq!(query.search, "firefox");
        assert!(query.action_parameters.is_empty());
    }

    #[test]
    fn test_parse_trailing_space_claims_action() {
        let query = Query::parse("g ");
        assert_eq!(query.action_name, "g");
        assert!(query.action_parameters.is_empty());
        assert_eq!(query.search, "");
    }

    #[test]
    fn test_parse_empty() {
        let query = Query::parse("");
        assert!(!query.has_action());
        assert_eq!(query.search, "");
    }

    #[test]
    fn test_with_action() {
        let query = Query::with_action("wiki", "rust");
        assert_eq!(query.action_name, "wiki");
        assert_eq!(query.search, "rust");
    }
}
