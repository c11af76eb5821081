//! # Property-Based Tests
//!
//! Invariants of the social graph under arbitrary follow/unfollow sequences.

use proptest::collection::vec;
use proptest::prelude::*;
use socialgraph_core::{NewUser, ProfileUpdate, SearchMode, SocialError, SocialGraph, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

const POOL: usize = 8;

fn username(i: usize) -> String {
    format!("user{}", i)
}

fn populated(count: usize) -> SocialGraph {
    let mut graph = SocialGraph::new(true);
    for i in 0..count {
        graph
            .register(
                &NewUser::new(
                    username(i),
                    format!("Person {}", i),
                    format!("user{}@example.com", i),
                    "",
                ),
                Timestamp(1),
            )
            .expect("register");
    }
    graph
}

/// `(follow?, src, dst)` operations over the fixed user pool.
fn ops() -> impl Strategy<Value = Vec<(bool, usize, usize)>> {
    vec((any::<bool>(), 0..POOL, 0..POOL), 0..60)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The edge store matches a reference set after any operation sequence.
    #[test]
    fn edges_match_reference_model(ops in ops()) {
        let mut graph = populated(POOL);
        let mut model: BTreeSet<(String, String)> = BTreeSet::new();

        for (i, (follow, a, b)) in ops.iter().enumerate() {
            let (src, dst) = (username(*a), username(*b));
            if *follow {
                let ok = graph.follow(&src, &dst, Timestamp(i as u64)).expect("follow");
                prop_assert_eq!(ok, a != b);
                if a != b {
                    model.insert((src, dst));
                }
            } else {
                let removed = graph.unfollow(&src, &dst);
                let expected = usize::from(model.remove(&(src, dst)));
                prop_assert_eq!(removed, expected);
            }
        }

        let stored: BTreeSet<(String, String)> =
            graph.edges().map(|e| (e.src, e.dst)).collect();
        prop_assert_eq!(stored, model);
    }

    /// Usernames and emails stay unique whatever order registrations arrive in.
    #[test]
    fn registration_enforces_uniqueness(attempts in vec((0..POOL, 0..POOL), 0..40)) {
        let mut graph = SocialGraph::new(true);
        let mut taken_names = BTreeSet::new();
        let mut taken_emails = BTreeSet::new();

        for (n, e) in &attempts {
            let result = graph.register(
                &NewUser::new(username(*n), "Someone", format!("e{}@example.com", e), ""),
                Timestamp(1),
            );
            let expect_ok = !taken_names.contains(n) && !taken_emails.contains(e);
            prop_assert_eq!(result.is_ok(), expect_ok);
            if expect_ok {
                taken_names.insert(*n);
                taken_emails.insert(*e);
            } else {
                prop_assert!(matches!(result, Err(SocialError::DuplicateKey(_))));
            }
        }
        prop_assert_eq!(graph.stats().user_count, taken_names.len());
    }

    /// Following the same pair repeatedly keeps one edge and its first timestamp.
    #[test]
    fn follow_is_idempotent(a in 0..POOL, b in 0..POOL, repeats in 1usize..5) {
        prop_assume!(a != b);
        let mut graph = populated(POOL);
        for t in 0..repeats {
            prop_assert!(graph.follow(&username(a), &username(b), Timestamp(t as u64 + 10)).expect("follow"));
        }
        let edges: Vec<_> = graph.edges().collect();
        prop_assert_eq!(edges.len(), 1);
        prop_assert_eq!(edges[0].since, Timestamp(10));
    }

    /// After arbitrary renames, ranked search for a name finds exactly the
    /// users currently holding it.
    #[test]
    fn index_agrees_with_identity(renames in vec((0..POOL, 0..4usize), 0..30)) {
        let mut graph = populated(POOL);
        let mut current: BTreeMap<usize, String> = BTreeMap::new();

        for (i, (who, k)) in renames.iter().enumerate() {
            let name = format!("zeta{}", k);
            let update = ProfileUpdate { name: Some(name.clone()), ..ProfileUpdate::default() };
            graph.update(&username(*who), &update, Timestamp(i as u64 + 2)).expect("update");
            current.insert(*who, name);
        }

        for k in 0..4usize {
            let name = format!("zeta{}", k);
            let expected: BTreeSet<String> = current
                .iter()
                .filter(|(_, n)| **n == name)
                .map(|(who, _)| username(*who))
                .collect();
            let found: BTreeSet<String> = graph
                .search(&name, 100)
                .hits
                .into_iter()
                .map(|h| h.username)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }

    /// No edge ever points from a user to itself.
    #[test]
    fn no_self_edges(ops in ops()) {
        let mut graph = populated(POOL);
        for (follow, a, b) in &ops {
            if *follow {
                graph.follow(&username(*a), &username(*b), Timestamp(1)).expect("follow");
            }
        }
        prop_assert!(graph.edges().all(|e| e.src != e.dst));
    }

    /// mutual(a, b) and mutual(b, a) return the same set.
    #[test]
    fn mutual_connections_symmetric_in_arguments(ops in ops(), a in 0..POOL, b in 0..POOL) {
        let mut graph = populated(POOL);
        for (follow, x, y) in &ops {
            if *follow {
                graph.follow(&username(*x), &username(*y), Timestamp(1)).expect("follow");
            }
        }

        let ab = graph.mutual_connections(&username(a), &username(b), 100);
        let ba = graph.mutual_connections(&username(b), &username(a), 100);
        prop_assert_eq!(ab, ba);
    }

    /// Recommendations never include self or already-followed users, and are
    /// sorted by (mutuals desc, followers desc, username asc).
    #[test]
    fn recommendations_well_formed(ops in ops(), who in 0..POOL) {
        let mut graph = populated(POOL);
        for (follow, x, y) in &ops {
            if *follow {
                graph.follow(&username(*x), &username(*y), Timestamp(1)).expect("follow");
            }
        }

        let me = username(who);
        let recs = graph.recommend(&me, 100);
        for rec in &recs {
            prop_assert_ne!(&rec.username, &me);
            prop_assert!(!graph.is_following(&me, &rec.username));
            prop_assert!(rec.mutuals >= 1);
        }
        for pair in recs.windows(2) {
            let key = |r: &socialgraph_core::Recommendation| {
                (std::cmp::Reverse(r.mutuals), std::cmp::Reverse(r.followers), r.username.clone())
            };
            prop_assert!(key(&pair[0]) <= key(&pair[1]));
        }
    }

    /// Popular lists every user, follower counts sum to the edge count.
    #[test]
    fn popularity_is_complete(ops in ops()) {
        let mut graph = populated(POOL);
        for (follow, x, y) in &ops {
            if *follow {
                graph.follow(&username(*x), &username(*y), Timestamp(1)).expect("follow");
            }
        }

        let popular = graph.popular(100);
        prop_assert_eq!(popular.len(), POOL);
        let total: usize = popular.iter().map(|p| p.follower_count).sum();
        prop_assert_eq!(total, graph.stats().edge_count);
    }

    /// Ranked search scores never increase down the result list.
    #[test]
    fn ranked_scores_non_increasing(query in "[a-z]{1,5}") {
        let graph = populated(POOL);
        let results = graph.search(&query, 100);
        prop_assert_eq!(results.mode, SearchMode::Ranked);
        for hit in &results.hits {
            prop_assert!(hit.score.is_some());
        }
        for pair in results.hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Substring fallback never carries scores and is alphabetic.
    #[test]
    fn substring_results_alphabetic(query in "[a-z0-9 ]{0,4}") {
        let mut graph = SocialGraph::new(false);
        for i in 0..POOL {
            graph
                .register(
                    &NewUser::new(username(i), format!("Person {}", i), format!("p{}@example.com", i), ""),
                    Timestamp(1),
                )
                .expect("register");
        }

        let results = graph.search(&query, 100);
        prop_assert_eq!(results.mode, SearchMode::Substring);
        prop_assert!(results.hits.iter().all(|h| h.score.is_none()));
        for pair in results.hits.windows(2) {
            prop_assert!(pair[0].username < pair[1].username);
        }
    }
}
