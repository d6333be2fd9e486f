//! Backend selection.

use std::sync::Arc;

use reqwest::header::HeaderMap;

use crate::error::ApiError;
use crate::models::{BookmarkType, Chapter, Comment, Manga, Page, Tag, User};
use crate::newmanga::NewMangaClient;
use crate::remanga::ReMangaClient;
use crate::session::{Session, TokenStore};
use crate::traits::{Backend, MangaService};
use crate::transport::ClientOptions;

/// Any supported backend, chosen at construction time.
#[derive(Clone)]
pub enum MangaClient {
    ReManga(ReMangaClient),
    NewManga(NewMangaClient),
}

macro_rules! dispatch {
    ($self:ident, $client:ident => $call:expr) => {
        match $self {
            MangaClient::ReManga($client) => $call,
            MangaClient::NewManga($client) => $call,
        }
    };
}

impl MangaClient {
    pub fn new(backend: Backend, store: Arc<dyn TokenStore>, options: &ClientOptions) -> Self {
        tracing::debug!(%backend, "creating client");
        match backend {
            Backend::ReManga => Self::ReManga(ReMangaClient::new(store, options)),
            Backend::NewManga => Self::NewManga(NewMangaClient::new(store, options)),
        }
    }
}

impl MangaService for MangaClient {
    fn backend(&self) -> Backend {
        dispatch!(self, c => c.backend())
    }

    fn session(&self) -> &Session {
        dispatch!(self, c => c.session())
    }

    fn authorize(&self, token: String) {
        dispatch!(self, c => c.authorize(token))
    }

    fn image_headers(&self) -> HeaderMap {
        dispatch!(self, c => c.image_headers())
    }

    async fn fetch_catalog(&self, page: u32, filters: &[Tag]) -> Result<Vec<Manga>, ApiError> {
        dispatch!(self, c => c.fetch_catalog(page, filters).await)
    }

    async fn fetch_search(
        &self,
        query: &str,
        page: u32,
        filters: &[Tag],
    ) -> Result<Vec<Manga>, ApiError> {
        dispatch!(self, c => c.fetch_search(query, page, filters).await)
    }

    async fn fetch_details(&self, id: &str) -> Result<Manga, ApiError> {
        dispatch!(self, c => c.fetch_details(id).await)
    }

    async fn fetch_title_chapters(
        &self,
        branch: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Chapter>, ApiError> {
        dispatch!(self, c => c.fetch_title_chapters(branch, count, page).await)
    }

    async fn fetch_chapter(&self, id: &str) -> Result<Vec<Page>, ApiError> {
        dispatch!(self, c => c.fetch_chapter(id).await)
    }

    async fn fetch_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        dispatch!(self, c => c.fetch_comments(id, count, page).await)
    }

    async fn fetch_comments_count(&self, id: &str) -> Result<u64, ApiError> {
        dispatch!(self, c => c.fetch_comments_count(id).await)
    }

    async fn fetch_chapter_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        dispatch!(self, c => c.fetch_chapter_comments(id, count, page).await)
    }

    async fn fetch_chapter_comments_count(&self, id: &str) -> Result<u64, ApiError> {
        dispatch!(self, c => c.fetch_chapter_comments_count(id).await)
    }

    async fn fetch_comments_replies(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        dispatch!(self, c => c.fetch_comments_replies(id, count, page).await)
    }

    async fn mark_chapter_read(&self, id: &str) -> Result<(), ApiError> {
        dispatch!(self, c => c.mark_chapter_read(id).await)
    }

    async fn set_chapter_like(&self, id: &str, value: bool) -> Result<(), ApiError> {
        dispatch!(self, c => c.set_chapter_like(id, value).await)
    }

    async fn buy_chapter(&self, id: &str) -> Result<bool, ApiError> {
        dispatch!(self, c => c.buy_chapter(id).await)
    }

    async fn mark_comment(&self, id: &str, value: Option<bool>) -> Result<i64, ApiError> {
        dispatch!(self, c => c.mark_comment(id, value).await)
    }

    async fn fetch_user_info(&self) -> Result<User, ApiError> {
        dispatch!(self, c => c.fetch_user_info().await)
    }

    async fn fetch_bookmark_types(&self) -> Result<Vec<BookmarkType>, ApiError> {
        dispatch!(self, c => c.fetch_bookmark_types().await)
    }

    async fn set_bookmark(
        &self,
        title_id: &str,
        bookmark: Option<&BookmarkType>,
    ) -> Result<(), ApiError> {
        dispatch!(self, c => c.set_bookmark(title_id, bookmark).await)
    }

    async fn fetch_bookmarks(&self) -> Result<Vec<Manga>, ApiError> {
        dispatch!(self, c => c.fetch_bookmarks().await)
    }

    fn deauth(&self) {
        dispatch!(self, c => c.deauth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;

    #[test]
    fn test_backend_selection() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let options = ClientOptions::default();

        for &backend in Backend::ALL {
            let client = MangaClient::new(backend, store.clone(), &options);
            assert_eq!(client.backend(), backend);
            assert_eq!(client.session().storage_key(), backend.storage_key());
            assert!(!client.session().is_authenticated());
        }
    }

    // Plain tests: without a runtime no background profile refresh is spawned.
    #[test]
    fn test_sessions_are_isolated_per_backend() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        store.set(Backend::NewManga.storage_key(), Some("nm"));
        let options = ClientOptions::default();

        let re = MangaClient::new(Backend::ReManga, store.clone(), &options);
        let nm = MangaClient::new(Backend::NewManga, store.clone(), &options);
        assert!(!re.session().is_authenticated());
        assert_eq!(nm.session().token().as_deref(), Some("nm"));

        re.deauth();
        assert_eq!(store.get(Backend::NewManga.storage_key()).as_deref(), Some("nm"));
    }
}
