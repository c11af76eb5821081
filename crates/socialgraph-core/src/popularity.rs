//! # Popularity Ranking
//!
//! Follower counts derived from the Edge Store, for the "explore" view.

use crate::PopularUser;
use crate::edges::EdgeStore;
use crate::identity::IdentityStore;
use crate::primitives::clamp_limit;

/// Every registered user ranked by follower count descending, then
/// username ascending. Users nobody follows appear with a count of zero.
#[must_use]
pub fn popular(identity: &IdentityStore, edges: &EdgeStore, limit: usize) -> Vec<PopularUser> {
    let mut ranked: Vec<PopularUser> = identity
        .iter()
        .map(|user| PopularUser {
            username: user.username.clone(),
            name: user.name.clone(),
            follower_count: edges.follower_count(&user.username),
        })
        .collect();

    // Identity iteration is already username-ascending and the sort is
    // stable, so equal counts keep that order.
    ranked.sort_by(|a, b| b.follower_count.cmp(&a.follower_count));
    ranked.truncate(clamp_limit(limit));
    ranked
}
