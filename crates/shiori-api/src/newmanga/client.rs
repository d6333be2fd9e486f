use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{
    bookmark_id, bookmark_type, CatalogRequest, CatalogResponse, ImageBase,
    NewMangaBookmarkEntry, NewMangaBookmarkTypeCount, NewMangaChapter, NewMangaChapterPages,
    NewMangaComment, NewMangaHeartResult, NewMangaMarkResult, NewMangaProject, NewMangaUser,
};
use crate::error::ApiError;
use crate::models::{
    canonical_bookmark_types, merge_bookmark_types, BookmarkType, Chapter, Comment, Manga, Page,
    Tag, User,
};
use crate::session::{Session, TokenStore};
use crate::traits::{Backend, MangaService};
use crate::transport::{self, ClientOptions};

const API_URL: &str = "https://api.newmanga.org";
const CATALOGUE_URL: &str = "https://neo.newmanga.org/catalogue";
const CARD_IMAGE_URL: &str = "https://img.newmanga.org/ProjectCard/webp/";
const AVATAR_IMAGE_URL: &str = "https://img.newmanga.org/Avatar/webp/";

/// Base URLs of the NewManga service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: String,
    /// Full URL of the catalogue search endpoint (separate host).
    pub catalogue_url: String,
    pub card_image_url: String,
    pub avatar_image_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: API_URL.into(),
            catalogue_url: CATALOGUE_URL.into(),
            card_image_url: CARD_IMAGE_URL.into(),
            avatar_image_url: AVATAR_IMAGE_URL.into(),
        }
    }
}

/// NewManga REST client. Authenticates with the `user_session` cookie.
///
/// Chapter and comment listings are not paginated server-side: page 1 carries
/// everything and later pages are empty.
#[derive(Clone)]
pub struct NewMangaClient {
    http: Client,
    session: Arc<Session>,
    endpoints: Arc<Endpoints>,
}

impl NewMangaClient {
    pub fn new(store: Arc<dyn TokenStore>, options: &ClientOptions) -> Self {
        let client = Self {
            http: transport::build_http(options),
            session: Arc::new(Session::load(Backend::NewManga.storage_key(), store)),
            endpoints: Arc::new(options.newmanga.clone()),
        };
        if client.session.is_authenticated() {
            client.refresh_profile();
        }
        client
    }

    fn images(&self) -> ImageBase<'_> {
        ImageBase {
            cards: &self.endpoints.card_image_url,
            avatars: &self.endpoints.avatar_image_url,
        }
    }

    fn cookie_value(&self) -> Option<HeaderValue> {
        let token = self.session.token()?;
        HeaderValue::from_str(&format!("user_session={token}")).ok()
    }

    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(cookie) = self.cookie_value() {
            req = req.header(COOKIE, cookie);
        }
        req
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.endpoints.api_url.trim_end_matches('/'));
        self.request_url(method, &url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let request = req.build()?;
        let sent = request
            .headers()
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("user_session="))
            .map(str::to_owned);

        let resp = self.http.execute(request).await?;
        tracing::debug!(url = %resp.url(), status = %resp.status(), "NewManga response");
        transport::check_response(&self.session, sent.as_deref(), resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.send(self.request(Method::GET, path)).await?;
        transport::decode(resp).await
    }

    /// POST with a JSON body; `None` sends no body, only the JSON content type.
    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<Response, ApiError> {
        let req = self.request(Method::POST, path);
        let req = match body {
            Some(body) => req.json(&body),
            None => req.header(CONTENT_TYPE, "application/json"),
        };
        self.send(req).await
    }

    fn refresh_profile(&self) {
        let this = self.clone();
        self.session
            .spawn_refresh(async move { this.fetch_user_info().await });
    }
}

impl MangaService for NewMangaClient {
    fn backend(&self) -> Backend {
        Backend::NewManga
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn authorize(&self, token: String) {
        if self.session.set_token(Some(token)) {
            self.refresh_profile();
        }
    }

    fn image_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = self.cookie_value() {
            headers.insert(COOKIE, cookie);
        }
        headers
    }

    async fn fetch_catalog(&self, page: u32, filters: &[Tag]) -> Result<Vec<Manga>, ApiError> {
        self.fetch_search("", page, filters).await
    }

    async fn fetch_search(
        &self,
        query: &str,
        page: u32,
        filters: &[Tag],
    ) -> Result<Vec<Manga>, ApiError> {
        let body = CatalogRequest::new(query, page, filters);
        let req = self
            .request_url(Method::POST, &self.endpoints.catalogue_url)
            .json(&body);
        let resp: CatalogResponse = transport::decode(self.send(req).await?).await?;

        let images = self.images();
        Ok(resp
            .result
            .hits
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| h.document)
            .map(|d| d.into_manga(&images))
            .collect())
    }

    async fn fetch_details(&self, id: &str) -> Result<Manga, ApiError> {
        let project: NewMangaProject = self.get(&format!("/v2/projects/{id}")).await?;
        let bookmark = project.bookmark.as_ref().map(|b| b.type_.clone());
        let mut manga = project.into_manga(&self.images());

        if let Some(bookmark) = bookmark {
            match self.fetch_bookmark_types().await {
                Ok(types) => manga.bookmark = types.into_iter().find(|t| t.id == bookmark),
                Err(e) => tracing::warn!(id, error = %e, "could not resolve bookmark"),
            }
        }
        Ok(manga)
    }

    async fn fetch_title_chapters(
        &self,
        branch: &str,
        _count: u32,
        page: u32,
    ) -> Result<Vec<Chapter>, ApiError> {
        if page > 1 {
            return Ok(Vec::new());
        }
        let chapters: Vec<NewMangaChapter> = self
            .get(&format!("/v3/branches/{branch}/chapters/all"))
            .await?;

        // Served newest first.
        Ok(chapters
            .into_iter()
            .rev()
            .zip(1..)
            .map(|(c, index)| c.into_chapter(index))
            .collect())
    }

    async fn fetch_chapter(&self, id: &str) -> Result<Vec<Page>, ApiError> {
        let pages: NewMangaChapterPages = self.get(&format!("/v3/chapters/{id}/pages")).await?;
        Ok(pages.into_pages(id))
    }

    async fn fetch_comments(
        &self,
        id: &str,
        _count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        if page > 1 {
            return Ok(Vec::new());
        }
        let comments: Vec<NewMangaComment> = self
            .get(&format!("/v2/projects/{id}/comments?sort_by=new"))
            .await?;

        let images = self.images();
        Ok(comments
            .into_iter()
            .filter_map(|c| c.into_comment(&images))
            .collect())
    }

    async fn fetch_comments_count(&self, _id: &str) -> Result<u64, ApiError> {
        Err(ApiError::not_supported(
            "No need to fetch comments count on NewManga backend",
        ))
    }

    async fn fetch_chapter_comments(
        &self,
        _id: &str,
        _count: u32,
        _page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        // NewManga has no chapter-level comments.
        Ok(Vec::new())
    }

    async fn fetch_chapter_comments_count(&self, _id: &str) -> Result<u64, ApiError> {
        Ok(0)
    }

    async fn fetch_comments_replies(
        &self,
        _id: &str,
        _count: u32,
        _page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        Err(ApiError::not_supported(
            "No need to fetch comments replies on NewManga backend",
        ))
    }

    async fn mark_chapter_read(&self, id: &str) -> Result<(), ApiError> {
        self.post(&format!("/v2/chapters/{id}/read"), None).await?;
        Ok(())
    }

    async fn set_chapter_like(&self, id: &str, value: bool) -> Result<(), ApiError> {
        let resp = self
            .post(
                &format!("/v2/chapters/{id}/heart"),
                Some(serde_json::json!({ "value": value })),
            )
            .await?;
        let result: NewMangaHeartResult = transport::decode(resp).await?;
        tracing::debug!(id, hearts = result.hearts, "chapter like updated");
        Ok(())
    }

    async fn buy_chapter(&self, id: &str) -> Result<bool, ApiError> {
        // The response body carries nothing to verify; a non-error status is
        // treated as a successful purchase.
        self.post(&format!("/v2/chapters/{id}/buy"), None).await?;
        Ok(true)
    }

    async fn mark_comment(&self, id: &str, value: Option<bool>) -> Result<i64, ApiError> {
        let resp = self
            .post(
                &format!("/v2/comments/{id}/mark"),
                Some(serde_json::json!({ "value": value })),
            )
            .await?;
        let result: NewMangaMarkResult = transport::decode(resp).await?;
        Ok(result.score())
    }

    async fn fetch_user_info(&self) -> Result<User, ApiError> {
        let user: NewMangaUser = self.get("/v2/user").await?;
        Ok(user.into_user(&self.images()))
    }

    async fn fetch_bookmark_types(&self) -> Result<Vec<BookmarkType>, ApiError> {
        let user = self.fetch_user_info().await?;
        let reported: Vec<NewMangaBookmarkTypeCount> = self
            .get(&format!("/v2/users/{}/bookmarks/types", user.id))
            .await?;

        Ok(merge_bookmark_types(
            canonical_bookmark_types(bookmark_id),
            reported
                .into_iter()
                .map(|t| bookmark_type(t.type_)),
        ))
    }

    async fn set_bookmark(
        &self,
        title_id: &str,
        bookmark: Option<&BookmarkType>,
    ) -> Result<(), ApiError> {
        let path = format!("/v2/projects/{title_id}/bookmark");
        match bookmark {
            Some(b) => {
                self.post(&path, Some(serde_json::json!({ "type": b.id })))
                    .await?;
            }
            None => {
                self.send(self.request(Method::DELETE, &path)).await?;
            }
        }
        Ok(())
    }

    async fn fetch_bookmarks(&self) -> Result<Vec<Manga>, ApiError> {
        let entries: Vec<NewMangaBookmarkEntry> = self.get("/v2/user/bookmarks").await?;
        let images = self.images();
        Ok(entries.into_iter().map(|e| e.into_manga(&images)).collect())
    }
}
