//! Per-viewer, per-post authorization
//!
//! The rule set is a pure function over facts fetched up front (viewer
//! profile, post, author profile). The only fact fetched on demand is the
//! connection edge, and only for `connections_only` posts by someone else.

use uuid::Uuid;

use super::connection_graph::ConnectionGraph;
use crate::models::{Post, TrustLevel, UserProfile, Visibility};

/// Who is asking.
#[derive(Debug, Clone)]
pub enum Viewer {
    Anonymous,
    Authenticated(UserProfile),
}

impl Viewer {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(profile) => Some(profile.id),
        }
    }
}

/// Outcome of the pure rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    /// Allowed iff viewer and author hold an accepted connection.
    RequiresConnection { viewer_id: Uuid, author_id: Uuid },
}

/// Apply the visibility rules without touching storage.
///
/// `author` is `None` when the author's profile could not be found.
pub fn decide(viewer: &Viewer, post: &Post, author: Option<&UserProfile>) -> Decision {
    if post.is_deleted() {
        return Decision::Deny;
    }

    let profile = match viewer {
        Viewer::Anonymous => {
            return if post.visibility == Visibility::Public {
                Decision::Allow
            } else {
                Decision::Deny
            };
        }
        Viewer::Authenticated(profile) => profile,
    };

    if profile.id == post.author_id {
        return Decision::Allow;
    }

    match post.visibility {
        Visibility::Public => Decision::Allow,
        Visibility::AlumniOnly => {
            if profile.trust_level >= TrustLevel::VerifiedAlumni {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        Visibility::SchoolOnly => match author {
            Some(author) if profile.shares_school_with(author) => Decision::Allow,
            _ => Decision::Deny,
        },
        Visibility::ConnectionsOnly => Decision::RequiresConnection {
            viewer_id: profile.id,
            author_id: post.author_id,
        },
        Visibility::Private => Decision::Deny,
    }
}

#[derive(Clone)]
pub struct VisibilityEvaluator {
    graph: ConnectionGraph,
}

impl VisibilityEvaluator {
    pub fn new(graph: ConnectionGraph) -> Self {
        Self { graph }
    }

    pub async fn can_view(&self, viewer: &Viewer, post: &Post, author: Option<&UserProfile>) -> bool {
        match decide(viewer, post, author) {
            Decision::Allow => true,
            Decision::Deny => false,
            Decision::RequiresConnection {
                viewer_id,
                author_id,
            } => self.graph.are_connected(viewer_id, author_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionStatus, PrivacyPreference};
    use crate::repository::MockConnectionStore;
    use anyhow::anyhow;
    use chrono::Utc;
    use std::sync::Arc;

    fn profile(trust_level: TrustLevel, school_ids: Vec<Uuid>) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            display_name: "alum".to_string(),
            trust_level,
            school_ids,
            privacy: PrivacyPreference::Public,
            disabled_at: None,
        }
    }

    fn post_by(author: &UserProfile, visibility: Visibility) -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: author.id,
            body: "Homecoming this Saturday".to_string(),
            media_urls: vec![],
            visibility,
            created_at: Utc::now(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            deleted_at: None,
        }
    }

    fn viewer(profile: &UserProfile) -> Viewer {
        Viewer::Authenticated(profile.clone())
    }

    #[test]
    fn test_public_visible_to_everyone() {
        let author = profile(TrustLevel::Unverified, vec![]);
        let post = post_by(&author, Visibility::Public);

        assert_eq!(decide(&Viewer::Anonymous, &post, Some(&author)), Decision::Allow);
        let stranger = profile(TrustLevel::Unverified, vec![]);
        assert_eq!(decide(&viewer(&stranger), &post, Some(&author)), Decision::Allow);
    }

    #[test]
    fn test_anonymous_sees_only_public() {
        let author = profile(TrustLevel::Staff, vec![]);
        for visibility in Visibility::ALL {
            let post = post_by(&author, visibility);
            let expected = if visibility == Visibility::Public {
                Decision::Allow
            } else {
                Decision::Deny
            };
            assert_eq!(decide(&Viewer::Anonymous, &post, Some(&author)), expected);
        }
    }

    #[test]
    fn test_alumni_only_requires_verified_alumni_or_higher() {
        let author = profile(TrustLevel::VerifiedAlumni, vec![]);
        let post = post_by(&author, Visibility::AlumniOnly);

        let unverified = profile(TrustLevel::Unverified, vec![]);
        assert_eq!(decide(&viewer(&unverified), &post, Some(&author)), Decision::Deny);

        for level in [
            TrustLevel::VerifiedAlumni,
            TrustLevel::SchoolAdmin,
            TrustLevel::Moderator,
            TrustLevel::Staff,
        ] {
            let v = profile(level, vec![]);
            assert_eq!(decide(&viewer(&v), &post, Some(&author)), Decision::Allow);
        }
    }

    #[test]
    fn test_school_only_requires_shared_school() {
        let school = Uuid::new_v4();
        let author = profile(TrustLevel::VerifiedAlumni, vec![school]);
        let post = post_by(&author, Visibility::SchoolOnly);

        let classmate = profile(TrustLevel::Unverified, vec![Uuid::new_v4(), school]);
        let other = profile(TrustLevel::Staff, vec![Uuid::new_v4()]);

        assert_eq!(decide(&viewer(&classmate), &post, Some(&author)), Decision::Allow);
        assert_eq!(decide(&viewer(&other), &post, Some(&author)), Decision::Deny);
        // Unknown author fails closed
        assert_eq!(decide(&viewer(&classmate), &post, None), Decision::Deny);
    }

    #[test]
    fn test_connections_only_defers_to_graph() {
        let author = profile(TrustLevel::VerifiedAlumni, vec![]);
        let post = post_by(&author, Visibility::ConnectionsOnly);
        let v = profile(TrustLevel::VerifiedAlumni, vec![]);

        assert_eq!(
            decide(&viewer(&v), &post, Some(&author)),
            Decision::RequiresConnection {
                viewer_id: v.id,
                author_id: author.id
            }
        );
    }

    #[test]
    fn test_private_only_author() {
        let author = profile(TrustLevel::Unverified, vec![]);
        let post = post_by(&author, Visibility::Private);
        let staff = profile(TrustLevel::Staff, vec![]);

        assert_eq!(decide(&viewer(&author), &post, Some(&author)), Decision::Allow);
        assert_eq!(decide(&viewer(&staff), &post, Some(&author)), Decision::Deny);
    }

    #[test]
    fn test_author_sees_own_posts_under_every_visibility() {
        let author = profile(TrustLevel::Unverified, vec![]);
        for visibility in Visibility::ALL {
            let post = post_by(&author, visibility);
            assert_eq!(decide(&viewer(&author), &post, Some(&author)), Decision::Allow);
        }
    }

    #[test]
    fn test_deleted_posts_hidden_from_everyone() {
        let author = profile(TrustLevel::Staff, vec![]);
        let mut post = post_by(&author, Visibility::Public);
        post.deleted_at = Some(Utc::now());

        assert_eq!(decide(&viewer(&author), &post, Some(&author)), Decision::Deny);
        assert_eq!(decide(&Viewer::Anonymous, &post, Some(&author)), Decision::Deny);
    }

    #[test]
    fn test_disabled_author_does_not_narrow_audience() {
        let mut author = profile(TrustLevel::VerifiedAlumni, vec![]);
        author.disabled_at = Some(Utc::now());
        let public = post_by(&author, Visibility::Public);
        let private = post_by(&author, Visibility::Private);
        let other = profile(TrustLevel::Staff, vec![]);

        assert_eq!(decide(&viewer(&other), &public, Some(&author)), Decision::Allow);
        assert_eq!(decide(&Viewer::Anonymous, &public, Some(&author)), Decision::Allow);
        assert_eq!(decide(&viewer(&other), &private, Some(&author)), Decision::Deny);
        assert_eq!(decide(&viewer(&author), &private, Some(&author)), Decision::Allow);
    }

    #[tokio::test]
    async fn test_can_view_connections_only() {
        let author = profile(TrustLevel::VerifiedAlumni, vec![]);
        let friend = profile(TrustLevel::VerifiedAlumni, vec![]);
        let stranger = profile(TrustLevel::VerifiedAlumni, vec![]);
        let post = post_by(&author, Visibility::ConnectionsOnly);

        let (friend_id, author_id) = (friend.id, author.id);
        let mut store = MockConnectionStore::new();
        store.expect_connection_status().returning(move |a, b| {
            if (a, b) == (friend_id, author_id) {
                Ok(Some(ConnectionStatus::Accepted))
            } else {
                Ok(None)
            }
        });

        let evaluator = VisibilityEvaluator::new(ConnectionGraph::new(Arc::new(store)));
        assert!(evaluator.can_view(&viewer(&friend), &post, Some(&author)).await);
        assert!(!evaluator.can_view(&viewer(&stranger), &post, Some(&author)).await);
        assert!(evaluator.can_view(&viewer(&author), &post, Some(&author)).await);
    }

    #[tokio::test]
    async fn test_can_view_fails_closed_on_graph_error() {
        let author = profile(TrustLevel::VerifiedAlumni, vec![]);
        let v = profile(TrustLevel::VerifiedAlumni, vec![]);
        let post = post_by(&author, Visibility::ConnectionsOnly);

        let mut store = MockConnectionStore::new();
        store
            .expect_connection_status()
            .returning(|_, _| Err(anyhow!("graph store down")));

        let evaluator = VisibilityEvaluator::new(ConnectionGraph::new(Arc::new(store)));
        assert!(!evaluator.can_view(&viewer(&v), &post, Some(&author)).await);
    }
}
