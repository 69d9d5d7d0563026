use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Coarse authorization tier. Declaration order is the privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Unverified,
    VerifiedAlumni,
    SchoolAdmin,
    Moderator,
    Staff,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Unverified => "unverified",
            TrustLevel::VerifiedAlumni => "verified_alumni",
            TrustLevel::SchoolAdmin => "school_admin",
            TrustLevel::Moderator => "moderator",
            TrustLevel::Staff => "staff",
        }
    }

    /// Position in the privilege order, starting at 0 for `Unverified`.
    pub fn rank(&self) -> u8 {
        match self {
            TrustLevel::Unverified => 0,
            TrustLevel::VerifiedAlumni => 1,
            TrustLevel::SchoolAdmin => 2,
            TrustLevel::Moderator => 3,
            TrustLevel::Staff => 4,
        }
    }

    /// Unknown values collapse to the least privileged tier.
    pub fn from_db(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("verified_alumni") | Some("verified") => TrustLevel::VerifiedAlumni,
            Some("school_admin") => TrustLevel::SchoolAdmin,
            Some("moderator") => TrustLevel::Moderator,
            Some("staff") | Some("admin") => TrustLevel::Staff,
            _ => TrustLevel::Unverified,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared audience of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    AlumniOnly,
    SchoolOnly,
    ConnectionsOnly,
    Private,
}

impl Visibility {
    pub const ALL: [Visibility; 5] = [
        Visibility::Public,
        Visibility::AlumniOnly,
        Visibility::SchoolOnly,
        Visibility::ConnectionsOnly,
        Visibility::Private,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::AlumniOnly => "alumni_only",
            Visibility::SchoolOnly => "school_only",
            Visibility::ConnectionsOnly => "connections_only",
            Visibility::Private => "private",
        }
    }

    /// Parse a stored visibility value. Null or unrecognized values are
    /// `Private` so a malformed row can never widen its audience.
    pub fn from_db(raw: Option<&str>) -> Self {
        let Some(value) = raw else {
            warn!("Post visibility is null, treating as private");
            return Visibility::Private;
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Visibility::Public,
            "alumni_only" | "alumni" => Visibility::AlumniOnly,
            "school_only" | "school" => Visibility::SchoolOnly,
            "connections_only" | "connections" | "friends" => Visibility::ConnectionsOnly,
            "private" => Visibility::Private,
            other => {
                warn!(visibility = %other, "Unrecognized post visibility, treating as private");
                Visibility::Private
            }
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile-level privacy preference. Carried for the profile surface; feed
/// visibility is decided per post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyPreference {
    #[default]
    Public,
    Alumni,
    Connections,
}

impl PrivacyPreference {
    pub fn from_db(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("alumni") | Some("alumni_only") => PrivacyPreference::Alumni,
            Some("connections") | Some("connections_only") | Some("private") => {
                PrivacyPreference::Connections
            }
            _ => PrivacyPreference::Public,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub trust_level: TrustLevel,
    pub school_ids: Vec<Uuid>,
    pub privacy: PrivacyPreference,
    pub disabled_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }

    pub fn shares_school_with(&self, other: &UserProfile) -> bool {
        self.school_ids
            .iter()
            .any(|school| other.school_ids.contains(school))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn from_db(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ConnectionStatus::Pending),
            "accepted" => Some(ConnectionStatus::Accepted),
            "rejected" | "declined" => Some(ConnectionStatus::Rejected),
            _ => None,
        }
    }
}

/// Directed connection edge (requester -> addressee).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub requester_id: Uuid,
    pub addressee_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_media(&self) -> bool {
        !self.media_urls.is_empty()
    }

    pub fn text_length(&self) -> usize {
        self.body.trim().chars().count()
    }
}

/// Which candidate source a feed request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Posts by the viewer's accepted connections and the viewer.
    Network,
    /// Recent posts from the whole network, filtered by visibility.
    ForYou,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Network => "network",
            FeedKind::ForYou => "for_you",
        }
    }
}

/// A post that survived visibility filtering, with its ranking score.
#[derive(Debug, Clone)]
pub struct RankedPost {
    pub post: Post,
    pub score: f64,
}

/// Request-scoped result of feed assembly.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<RankedPost>,
    pub next_cursor: Option<String>,
}

impl FeedPage {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementMetrics {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Post summary as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub metrics: EngagementMetrics,
    pub ranking_score: f64,
}

impl From<RankedPost> for FeedItem {
    fn from(ranked: RankedPost) -> Self {
        let post = ranked.post;
        Self {
            id: post.id.to_string(),
            author_id: post.author_id.to_string(),
            content: post.body,
            media_urls: post.media_urls,
            visibility: post.visibility,
            created_at: post.created_at,
            metrics: EngagementMetrics {
                likes: post.like_count,
                comments: post.comment_count,
                shares: post.share_count,
            },
            ranking_score: ranked.score,
        }
    }
}

/// Feed response body. Error responses reuse this shape with an empty page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<FeedPage> for FeedResponse {
    fn from(page: FeedPage) -> Self {
        let has_more = page.has_more();
        Self {
            items: page.items.into_iter().map(FeedItem::from).collect(),
            next_cursor: page.next_cursor,
            has_more,
            error: None,
        }
    }
}
