//! Backend-agnostic domain types shared by every manga service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a [`Tag`] filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Tag,
    Type,
    Genre,
}

/// A catalog filter value. Opaque to callers; each backend maps it onto its
/// own query parameters or request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub kind: TagKind,
    pub id: String,
    pub name: String,
}

impl Tag {
    pub fn new(kind: TagKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A group of chapters under one title (translation team, volume set...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub chapters: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manga {
    pub id: String,
    pub title: String,
    pub alt_title: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<Tag>,
    pub branches: Vec<Branch>,
    pub bookmark: Option<BookmarkType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub volume: Option<String>,
    /// Chapter number as displayed by the backend ("12", "12.5").
    pub number: String,
    pub name: Option<String>,
    /// Ordering key; increases from the oldest chapter to the newest.
    pub index: u32,
    pub is_read: bool,
    pub is_liked: bool,
    pub is_paid: bool,
    pub is_bought: bool,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub chapter_id: String,
    pub index: u32,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: CommentAuthor,
    pub body: String,
    pub parent_id: Option<String>,
    pub score: i64,
    /// `None` when the backend does not report reply counts.
    pub replies: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A reading-status category a title can be bookmarked under.
///
/// The id is backend-specific and must be passed back unchanged to
/// [`set_bookmark`](crate::MangaService::set_bookmark).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookmarkType {
    pub id: String,
    pub name: String,
}

impl BookmarkType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The bookmark categories every backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookmarkKind {
    Reading,
    PlanToRead,
    Completed,
    OnHold,
    Dropped,
    NotInteresting,
}

impl BookmarkKind {
    pub const ALL: [BookmarkKind; 6] = [
        Self::Reading,
        Self::PlanToRead,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
        Self::NotInteresting,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Reading => "Reading",
            Self::PlanToRead => "Plan to Read",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
            Self::Dropped => "Dropped",
            Self::NotInteresting => "Not Interesting",
        }
    }
}

impl std::fmt::Display for BookmarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Build the canonical bookmark list using a backend's ids.
pub fn canonical_bookmark_types(id_of: impl Fn(BookmarkKind) -> &'static str) -> Vec<BookmarkType> {
    BookmarkKind::ALL
        .iter()
        .map(|&kind| BookmarkType::new(id_of(kind), kind.display_name()))
        .collect()
}

/// Append backend-reported types to the canonical list, skipping any id
/// already present. Order of `extras` is kept.
pub fn merge_bookmark_types(
    mut types: Vec<BookmarkType>,
    extras: impl IntoIterator<Item = BookmarkType>,
) -> Vec<BookmarkType> {
    for extra in extras {
        if !types.iter().any(|t| t.id == extra.id) {
            types.push(extra);
        }
    }
    types
}

/// Parse an RFC 3339 timestamp, ignoring anything malformed.
pub(crate) fn parse_timestamp(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
