//! Trait definitions for manga reading services.
//!
//! All backend clients (ReManga, NewManga) implement [`MangaService`],
//! allowing the rest of the application to be backend-agnostic.

use std::future::Future;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{BookmarkType, Chapter, Comment, Manga, Page, Tag, User};
use crate::session::Session;

/// A unified manga service interface.
///
/// Operations a backend has no equivalent for return
/// [`ApiError::NotSupported`] rather than an empty result, unless an empty
/// result is the honest answer (a backend without chapter comments has zero
/// of them).
pub trait MangaService: Send + Sync {
    fn backend(&self) -> Backend;

    /// Human-readable service name.
    fn name(&self) -> &'static str {
        self.backend().display_name()
    }

    fn session(&self) -> &Session;

    /// Sign in with a token obtained elsewhere. Persists it and refreshes the
    /// cached profile in the background.
    fn authorize(&self, token: String);

    /// Headers an image loader must send so authenticated images load.
    fn image_headers(&self) -> HeaderMap;

    /// Browse the catalog.
    fn fetch_catalog(
        &self,
        page: u32,
        filters: &[Tag],
    ) -> impl Future<Output = Result<Vec<Manga>, ApiError>> + Send;

    /// Search titles by name.
    fn fetch_search(
        &self,
        query: &str,
        page: u32,
        filters: &[Tag],
    ) -> impl Future<Output = Result<Vec<Manga>, ApiError>> + Send;

    /// Full title record, with the viewer's bookmark when it can be resolved.
    fn fetch_details(&self, id: &str) -> impl Future<Output = Result<Manga, ApiError>> + Send;

    /// Chapters of a branch, oldest first.
    fn fetch_title_chapters(
        &self,
        branch: &str,
        count: u32,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Chapter>, ApiError>> + Send;

    fn fetch_chapter(&self, id: &str) -> impl Future<Output = Result<Vec<Page>, ApiError>> + Send;

    fn fetch_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Comment>, ApiError>> + Send;

    fn fetch_comments_count(&self, id: &str) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn fetch_chapter_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Comment>, ApiError>> + Send;

    fn fetch_chapter_comments_count(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn fetch_comments_replies(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Comment>, ApiError>> + Send;

    fn mark_chapter_read(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn set_chapter_like(
        &self,
        id: &str,
        value: bool,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Purchase a paid chapter. `true` means the chapter is now available.
    fn buy_chapter(&self, id: &str) -> impl Future<Output = Result<bool, ApiError>> + Send;

    /// Vote on a comment (`None` withdraws the vote). Returns the resulting
    /// score.
    fn mark_comment(
        &self,
        id: &str,
        value: Option<bool>,
    ) -> impl Future<Output = Result<i64, ApiError>> + Send;

    /// Profile of the signed-in user. Fails with [`ApiError::Unauthorized`]
    /// (and signs out) if the session is rejected.
    fn fetch_user_info(&self) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// The canonical bookmark categories followed by backend extras.
    fn fetch_bookmark_types(
        &self,
    ) -> impl Future<Output = Result<Vec<BookmarkType>, ApiError>> + Send;

    /// Bookmark a title under `bookmark`, or remove its bookmark with `None`.
    fn set_bookmark(
        &self,
        title_id: &str,
        bookmark: Option<&BookmarkType>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn fetch_bookmarks(&self) -> impl Future<Output = Result<Vec<Manga>, ApiError>> + Send;

    /// Sign out: forget the token and the cached profile.
    fn deauth(&self) {
        self.session().clear();
    }
}

/// Supported manga backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    ReManga,
    NewManga,
}

impl Backend {
    pub const ALL: &[Backend] = &[Self::ReManga, Self::NewManga];

    /// Stable config/CLI identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReManga => "remanga",
            Self::NewManga => "newmanga",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::ReManga => "ReManga",
            Self::NewManga => "NewManga",
        }
    }

    /// Key the backend's auth token is persisted under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::ReManga => "ReAuthToken",
            Self::NewManga => "NewAuthToken",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown backend: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("remanga".parse::<Backend>(), Ok(Backend::ReManga));
        assert_eq!("NewManga".parse::<Backend>(), Ok(Backend::NewManga));
        assert!("mangadex".parse::<Backend>().is_err());
    }

    #[test]
    fn test_storage_keys_are_distinct() {
        assert_ne!(
            Backend::ReManga.storage_key(),
            Backend::NewManga.storage_key()
        );
    }
}
