//! # Text Index
//!
//! Inverted index over the `username`, `name` and `email` of every user.
//!
//! Each user has a `SearchDocument`: the bag of lowercase tokens drawn from
//! the three fields, with each token weighted by the fields it occurs in.
//! Re-indexing a user first withdraws the postings of its previous document,
//! so stale tokens never match.
//!
//! ## Scoring
//!
//! Integer only. For every distinct query token, a document earns
//! `field weight x EXACT_MATCH_FACTOR` per exactly matching token and
//! `field weight x PREFIX_MATCH_FACTOR` per token the query token prefixes.
//! Hits are ordered by score descending, then username ascending.

use crate::User;
use crate::primitives::{
    EMAIL_WEIGHT, EXACT_MATCH_FACTOR, NAME_WEIGHT, PREFIX_MATCH_FACTOR, USERNAME_WEIGHT,
};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Per-user token bag: token -> summed weight of the fields containing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchDocument {
    tokens: BTreeMap<String, u64>,
}

impl SearchDocument {
    /// Build the document for a user from its indexed fields.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        let mut doc = Self::default();
        doc.add_field(&user.username, USERNAME_WEIGHT);
        doc.add_field(&user.name, NAME_WEIGHT);
        doc.add_field(&user.email, EMAIL_WEIGHT);
        doc
    }

    /// A field contributes its weight once per distinct token.
    fn add_field(&mut self, text: &str, weight: u64) {
        let distinct: BTreeSet<String> = tokenize(text).collect();
        for token in distinct {
            let slot = self.tokens.entry(token).or_insert(0);
            *slot = slot.saturating_add(weight);
        }
    }

    /// Tokens of this document in ascending order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }
}

/// The ranked search index.
#[derive(Debug, Clone)]
pub struct TextIndex {
    /// When false the ranking index is unavailable and callers fall back
    /// to substring matching.
    enabled: bool,
    /// token -> (username -> weight)
    postings: BTreeMap<String, BTreeMap<String, u64>>,
    /// username -> document currently indexed
    documents: BTreeMap<String, SearchDocument>,
}

impl Default for TextIndex {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TextIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            postings: BTreeMap::new(),
            documents: BTreeMap::new(),
        }
    }

    /// Whether ranked search is available.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// (Re)index a user. Postings of the previous document are withdrawn.
    pub fn index(&mut self, user: &User) {
        self.remove(&user.username);
        let doc = SearchDocument::from_user(user);
        for (token, weight) in &doc.tokens {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(user.username.clone(), *weight);
        }
        self.documents.insert(user.username.clone(), doc);
    }

    /// Withdraw a user from the index.
    pub fn remove(&mut self, username: &str) {
        let Some(doc) = self.documents.remove(username) else {
            return;
        };
        for token in doc.tokens.keys() {
            if let Some(posting) = self.postings.get_mut(token) {
                posting.remove(username);
                if posting.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
    }

    /// The document currently indexed for a user.
    #[must_use]
    pub fn document(&self, username: &str) -> Option<&SearchDocument> {
        self.documents.get(username)
    }

    /// Number of distinct indexed tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.postings.clear();
        self.documents.clear();
    }

    /// Score every document against a query.
    ///
    /// Returns `None` when the query has no tokens, which callers treat as
    /// "ranking unavailable for this query". Otherwise returns
    /// `(username, score)` pairs, score descending then username ascending,
    /// truncated to `limit`. Zero-score documents are omitted.
    #[must_use]
    pub fn rank(&self, query: &str, limit: usize) -> Option<Vec<(String, u64)>> {
        let terms: BTreeSet<String> = tokenize(query).collect();
        if terms.is_empty() {
            return None;
        }

        let mut scores: BTreeMap<&str, u64> = BTreeMap::new();
        for term in &terms {
            let candidates = self
                .postings
                .range::<str, _>((Bound::Included(term.as_str()), Bound::Unbounded))
                .take_while(|(token, _)| token.starts_with(term.as_str()));

            for (token, posting) in candidates {
                let factor = if token == term {
                    EXACT_MATCH_FACTOR
                } else {
                    PREFIX_MATCH_FACTOR
                };
                for (username, weight) in posting {
                    let slot = scores.entry(username.as_str()).or_insert(0);
                    *slot = slot.saturating_add(weight.saturating_mul(factor));
                }
            }
        }

        let mut ranked: Vec<(String, u64)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .map(|(username, score)| (username.to_string(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Some(ranked)
    }
}

/// Case-insensitive substring match on username or name.
///
/// `users` must already be in username order; the first `limit` matches are
/// returned. A blank query matches everyone; any other query is matched
/// as given, surrounding whitespace included.
pub fn substring_matches<'a>(
    users: impl Iterator<Item = &'a User>,
    query: &str,
    limit: usize,
) -> Vec<&'a User> {
    if query.trim().is_empty() {
        return users.take(limit).collect();
    }
    let needle = query.to_lowercase();
    users
        .filter(|u| {
            u.username.to_lowercase().contains(&needle) || u.name.to_lowercase().contains(&needle)
        })
        .take(limit)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;

    fn user(username: &str, name: &str, email: &str) -> User {
        User {
            username: username.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            bio: String::new(),
            password_hash: String::new(),
            salt: String::new(),
            created_at: Timestamp(0),
            updated_at: Timestamp(0),
        }
    }

    #[test]
    fn tokenize_splits_and_lowercases() {
        let tokens: Vec<String> = tokenize("Alice_Smith@Example.com").collect();
        assert_eq!(tokens, vec!["alice", "smith", "example", "com"]);
    }

    #[test]
    fn document_weights_sum_across_fields() {
        let doc = SearchDocument::from_user(&user("alice", "Alice Smith", "alice@example.com"));
        // username (3) + name (2) + email (1)
        assert_eq!(doc.tokens.get("alice"), Some(&6));
        assert_eq!(doc.tokens.get("smith"), Some(&2));
        assert_eq!(doc.tokens.get("example"), Some(&1));
    }

    #[test]
    fn exact_beats_prefix_and_username_beats_email() {
        let mut index = TextIndex::new(true);
        index.index(&user("alice", "Alice Smith", "alice@example.com"));
        index.index(&user("alicia", "Alicia Keys", "ak@example.com"));
        index.index(&user("bob", "Bob Lee", "alice.fan@example.com"));

        let ranked = index.rank("alice", 10).expect("ranked");
        let names: Vec<&str> = ranked.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(ranked[0].1, 12);
        assert_eq!(ranked[1].1, 2);

        let prefix = index.rank("ali", 10).expect("ranked");
        assert_eq!(prefix.len(), 3);
        assert!(prefix.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn ties_break_by_username() {
        let mut index = TextIndex::new(true);
        index.index(&user("zed", "Sam", "z@example.com"));
        index.index(&user("amy", "Sam", "a@example.com"));

        let ranked = index.rank("sam", 10).expect("ranked");
        assert_eq!(ranked[0].0, "amy");
        assert_eq!(ranked[1].0, "zed");
        assert_eq!(ranked[0].1, ranked[1].1);
    }

    #[test]
    fn reindex_withdraws_stale_tokens() {
        let mut index = TextIndex::new(true);
        index.index(&user("carol", "Carol King", "carol@example.com"));
        assert_eq!(index.rank("king", 10).map(|r| r.len()), Some(1));

        index.index(&user("carol", "Carol Queen", "carol@example.com"));
        assert_eq!(index.rank("king", 10).map(|r| r.len()), Some(0));
        assert_eq!(index.rank("queen", 10).map(|r| r.len()), Some(1));
    }

    #[test]
    fn punctuation_only_query_is_unranked() {
        let mut index = TextIndex::new(true);
        index.index(&user("carol", "Carol King", "carol@example.com"));
        assert!(index.rank("  ?!* ", 10).is_none());
    }

    #[test]
    fn remove_clears_postings() {
        let mut index = TextIndex::new(true);
        index.index(&user("carol", "Carol King", "carol@example.com"));
        index.remove("carol");
        assert_eq!(index.token_count(), 0);
        assert!(index.document("carol").is_none());
    }

    #[test]
    fn substring_matches_username_or_name() {
        let users = [
            user("alice", "Alice Smith", "a@example.com"),
            user("bob", "Bob Lee", "b@example.com"),
            user("carol", "Carol Leeds", "c@example.com"),
        ];

        let hits = substring_matches(users.iter(), "LEE", 10);
        let names: Vec<&str> = hits.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);

        assert_eq!(substring_matches(users.iter(), "", 2).len(), 2);
        assert_eq!(substring_matches(users.iter(), "   ", 10).len(), 3);
    }

    #[test]
    fn substring_keeps_surrounding_whitespace() {
        let users = [
            user("bob", "Bob Lee", "b@example.com"),
            user("carol", "Carol Lee", "c@example.com"),
        ];

        assert!(substring_matches(users.iter(), " bob", 10).is_empty());
        let hits = substring_matches(users.iter(), " lee", 10);
        assert_eq!(hits.len(), 2);
    }
}
