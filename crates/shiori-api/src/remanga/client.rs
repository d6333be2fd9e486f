use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, REFERER};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{
    Envelope, ReMangaCatalogItem, ReMangaChapter, ReMangaChapterPages, ReMangaComment,
    ReMangaDetails, ReMangaUser,
};
use crate::error::ApiError;
use crate::models::{
    canonical_bookmark_types, BookmarkKind, BookmarkType, Chapter, Comment, Manga, Page, Tag,
    TagKind, User,
};
use crate::session::{Session, TokenStore};
use crate::traits::{Backend, MangaService};
use crate::transport::{self, ClientOptions};

const API_URL: &str = "https://api.remanga.org";
const SITE_URL: &str = "https://remanga.org/";

/// Page size used by catalog and search listings.
const LIST_COUNT: &str = "30";

/// Base URLs of the ReManga service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: String,
    /// Site root; image paths and the image referer are resolved against it.
    pub site_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: API_URL.into(),
            site_url: SITE_URL.into(),
        }
    }
}

/// ReManga's numeric bookmark categories.
fn bookmark_id(kind: BookmarkKind) -> &'static str {
    match kind {
        BookmarkKind::Reading => "0",
        BookmarkKind::PlanToRead => "1",
        BookmarkKind::Completed => "2",
        BookmarkKind::Dropped => "3",
        BookmarkKind::OnHold => "4",
        BookmarkKind::NotInteresting => "5",
    }
}

/// Translate generic filters into ReManga query parameters.
pub fn filter_params(filters: &[Tag]) -> Vec<(&'static str, String)> {
    filters
        .iter()
        .map(|f| {
            let key = match f.kind {
                TagKind::Tag => "categories",
                TagKind::Type => "types",
                TagKind::Genre => "genres",
            };
            (key, f.id.clone())
        })
        .collect()
}

fn parse_id(id: &str) -> Result<u64, ApiError> {
    id.parse()
        .map_err(|_| ApiError::Parse(format!("invalid ReManga id: {id}")))
}

/// ReManga REST client. Authenticates with a bearer token.
#[derive(Clone)]
pub struct ReMangaClient {
    http: Client,
    session: Arc<Session>,
    endpoints: Arc<Endpoints>,
}

impl ReMangaClient {
    pub fn new(store: Arc<dyn TokenStore>, options: &ClientOptions) -> Self {
        let client = Self {
            http: transport::build_http(options),
            session: Arc::new(Session::load(Backend::ReManga.storage_key(), store)),
            endpoints: Arc::new(options.remanga.clone()),
        };
        if client.session.is_authenticated() {
            client.refresh_profile();
        }
        client
    }

    fn auth_value(&self) -> Option<HeaderValue> {
        let token = self.session.token()?;
        HeaderValue::from_str(&format!("bearer {token}")).ok()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.endpoints.api_url.trim_end_matches('/'));
        let mut req = self.http.request(method, url);
        if let Some(auth) = self.auth_value() {
            req = req.header(AUTHORIZATION, auth);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let request = req.build()?;
        let sent = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bearer "))
            .map(str::to_owned);

        let resp = self.http.execute(request).await?;
        tracing::debug!(url = %resp.url(), status = %resp.status(), "ReManga response");
        transport::check_response(&self.session, sent.as_deref(), resp).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self.send(self.request(Method::GET, path).query(query)).await?;
        let body: Envelope<T> = transport::decode(resp).await?;
        Ok(body.content)
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<Response, ApiError> {
        self.send(self.request(Method::POST, path).json(&body)).await
    }

    async fn get_comments(&self, query: &[(&str, String)]) -> Result<Vec<Comment>, ApiError> {
        let items: Vec<ReMangaComment> = self.get("/api/activity/comments/", query).await?;
        Ok(items
            .into_iter()
            .filter_map(|c| c.into_comment(&self.endpoints.site_url))
            .collect())
    }

    fn refresh_profile(&self) {
        let this = self.clone();
        self.session
            .spawn_refresh(async move { this.fetch_user_info().await });
    }

    fn map_list(&self, items: Vec<ReMangaCatalogItem>) -> Vec<Manga> {
        items
            .into_iter()
            .map(|i| i.into_manga(&self.endpoints.site_url))
            .collect()
    }
}

impl MangaService for ReMangaClient {
    fn backend(&self) -> Backend {
        Backend::ReManga
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
        if let Some(auth) = self.auth_value() {
            headers.insert(AUTHORIZATION, auth);
        }
        if let Ok(referer) = HeaderValue::from_str(&self.endpoints.site_url) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    async fn fetch_catalog(&self, page: u32, filters: &[Tag]) -> Result<Vec<Manga>, ApiError> {
        let mut query = vec![
            ("count", LIST_COUNT.to_string()),
            ("ordering", "-rating".to_string()),
            ("page", page.to_string()),
        ];
        query.extend(filter_params(filters));

        let items: Vec<ReMangaCatalogItem> = self.get("/api/search/catalog/", &query).await?;
        Ok(self.map_list(items))
    }

    async fn fetch_search(
        &self,
        query: &str,
        page: u32,
        filters: &[Tag],
    ) -> Result<Vec<Manga>, ApiError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("count", LIST_COUNT.to_string()),
            ("field", "titles".to_string()),
            ("page", page.to_string()),
        ];
        params.extend(filter_params(filters));

        let items: Vec<ReMangaCatalogItem> = self.get("/api/search/", &params).await?;
        Ok(self.map_list(items))
    }

    async fn fetch_details(&self, id: &str) -> Result<Manga, ApiError> {
        let details: ReMangaDetails = self.get(&format!("/api/titles/{id}/"), &[]).await?;
        let bookmark = details.bookmark_type;
        let mut manga = details.into_manga(&self.endpoints.site_url);

        if let Some(bookmark) = bookmark {
            match self.fetch_bookmark_types().await {
                Ok(types) => {
                    let bookmark = bookmark.to_string();
                    manga.bookmark = types.into_iter().find(|t| t.id == bookmark);
                }
                Err(e) => tracing::warn!(id, error = %e, "could not resolve bookmark"),
            }
        }
        Ok(manga)
    }

    async fn fetch_title_chapters(
        &self,
        branch: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Chapter>, ApiError> {
        let query = [
            ("branch_id", branch.to_string()),
            ("ordering", "index".to_string()),
            ("user_data", "1".to_string()),
            ("count", count.to_string()),
            ("page", page.to_string()),
        ];
        let chapters: Vec<ReMangaChapter> = self.get("/api/titles/chapters/", &query).await?;
        Ok(chapters.into_iter().map(ReMangaChapter::into_chapter).collect())
    }

    async fn fetch_chapter(&self, id: &str) -> Result<Vec<Page>, ApiError> {
        let pages: ReMangaChapterPages =
            self.get(&format!("/api/titles/chapters/{id}/"), &[]).await?;
        Ok(pages.into_pages(id))
    }

    async fn fetch_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        self.get_comments(&[
            ("title_id", id.to_string()),
            ("page", page.to_string()),
            ("ordering", "-id".to_string()),
            ("count", count.to_string()),
        ])
        .await
    }

    async fn fetch_comments_count(&self, _id: &str) -> Result<u64, ApiError> {
        Err(ApiError::not_supported(
            "ReManga does not report title comment counts",
        ))
    }

    async fn fetch_chapter_comments(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        self.get_comments(&[
            ("chapter_id", id.to_string()),
            ("page", page.to_string()),
            ("ordering", "-id".to_string()),
            ("count", count.to_string()),
        ])
        .await
    }

    async fn fetch_chapter_comments_count(&self, _id: &str) -> Result<u64, ApiError> {
        Err(ApiError::not_supported(
            "ReManga does not report chapter comment counts",
        ))
    }

    async fn fetch_comments_replies(
        &self,
        id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<Comment>, ApiError> {
        self.get_comments(&[
            ("reply_to", id.to_string()),
            ("page", page.to_string()),
            ("ordering", "-id".to_string()),
            ("count", count.to_string()),
        ])
        .await
    }

    async fn mark_chapter_read(&self, id: &str) -> Result<(), ApiError> {
        let chapter = parse_id(id)?;
        self.post_json("/api/activity/views/", serde_json::json!({ "chapter": chapter }))
            .await?;
        Ok(())
    }

    async fn set_chapter_like(&self, id: &str, value: bool) -> Result<(), ApiError> {
        if !value {
            return Err(ApiError::not_supported(
                "Remove like is not supported by ReManga",
            ));
        }
        let chapter = parse_id(id)?;
        self.post_json(
            "/api/activity/votes/",
            serde_json::json!({ "type": 0, "chapter": chapter }),
        )
        .await?;
        Ok(())
    }

    async fn buy_chapter(&self, _id: &str) -> Result<bool, ApiError> {
        Err(ApiError::not_supported(
            "Buying chapters is not supported by ReManga",
        ))
    }

    async fn mark_comment(&self, _id: &str, _value: Option<bool>) -> Result<i64, ApiError> {
        Err(ApiError::not_supported(
            "Comment voting is not supported by ReManga",
        ))
    }

    async fn fetch_user_info(&self) -> Result<User, ApiError> {
        let user: ReMangaUser = self.get("/api/v2/users/current/", &[]).await?;
        Ok(user.into_user(&self.endpoints.site_url))
    }

    async fn fetch_bookmark_types(&self) -> Result<Vec<BookmarkType>, ApiError> {
        Ok(canonical_bookmark_types(bookmark_id))
    }

    async fn set_bookmark(
        &self,
        _title_id: &str,
        _bookmark: Option<&BookmarkType>,
    ) -> Result<(), ApiError> {
        Err(ApiError::not_supported(
            "Bookmarks are not supported by ReManga",
        ))
    }

    async fn fetch_bookmarks(&self) -> Result<Vec<Manga>, ApiError> {
        Err(ApiError::not_supported(
            "Bookmarks are not supported by ReManga",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;
    use crate::testing::StubServer;

    fn client(server: &StubServer) -> (ReMangaClient, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let options = ClientOptions {
            remanga: Endpoints {
                api_url: server.url(),
                site_url: "https://remanga.org/".into(),
            },
            ..Default::default()
        };
        (ReMangaClient::new(store.clone(), &options), store)
    }

    fn chapter_json(id: u32, index: u32) -> String {
        format!(r#"{{"id": {id}, "index": {index}, "tome": 1, "chapter": "{index}"}}"#)
    }

    #[test]
    fn test_filter_params_keep_kind_and_id() {
        let filters = vec![
            Tag::new(TagKind::Tag, "5", "Система"),
            Tag::new(TagKind::Type, "1", "Манхва"),
            Tag::new(TagKind::Genre, "2", "Боевик"),
            Tag::new(TagKind::Genre, "7", "Драма"),
        ];
        let params = filter_params(&filters);
        assert_eq!(
            params,
            vec![
                ("categories", "5".to_string()),
                ("types", "1".to_string()),
                ("genres", "2".to_string()),
                ("genres", "7".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_catalog_sends_filters_and_paging() {
        let server = StubServer::start().await;
        server.route(
            "GET",
            "/api/search/catalog/",
            200,
            r#"{"content": [{"id": 1, "dir": "a", "rus_name": "А"}]}"#,
        );
        let (client, _) = client(&server);

        let filters = [Tag::new(TagKind::Genre, "2", "Боевик")];
        let result = client.fetch_catalog(3, &filters).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");

        let req = server.last_request("/api/search/catalog/").unwrap();
        assert_eq!(req.query_value("page").as_deref(), Some("3"));
        assert_eq!(req.query_value("ordering").as_deref(), Some("-rating"));
        assert_eq!(req.query_value("genres").as_deref(), Some("2"));
        assert!(req.header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_search_uses_search_endpoint() {
        let server = StubServer::start().await;
        server.route("GET", "/api/search/", 200, r#"{"content": []}"#);
        let (client, _) = client(&server);

        let result = client.fetch_search("solo leveling", 1, &[]).await.unwrap();
        assert!(result.is_empty());

        let req = server.last_request("/api/search/").unwrap();
        assert_eq!(req.query_value("query").as_deref(), Some("solo leveling"));
        assert_eq!(req.query_value("field").as_deref(), Some("titles"));
    }

    #[tokio::test]
    async fn test_chapters_are_oldest_first() {
        let server = StubServer::start().await;
        let body = format!(
            r#"{{"content": [{}, {}, {}]}}"#,
            chapter_json(10, 1),
            chapter_json(11, 2),
            chapter_json(12, 3)
        );
        server.route("GET", "/api/titles/chapters/", 200, &body);
        let (client, _) = client(&server);

        let chapters = client.fetch_title_chapters("1285", 50, 1).await.unwrap();
        assert_eq!(chapters.len(), 3);
        assert!(chapters.windows(2).all(|w| w[0].index < w[1].index));

        let req = server.last_request("/api/titles/chapters/").unwrap();
        assert_eq!(req.query_value("ordering").as_deref(), Some("index"));
        assert_eq!(req.query_value("branch_id").as_deref(), Some("1285"));
        assert_eq!(req.query_value("count").as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn test_bearer_header_and_unauthorized_clears_token() {
        let server = StubServer::start().await;
        server.route("GET", "/api/v2/users/current/", 401, r#"{"msg": "expired"}"#);
        let (client, store) = client(&server);
        client.session().set_token(Some("stale".into()));

        let err = client.fetch_user_info().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(client.session().token().is_none());
        assert!(store.get("ReAuthToken").is_none());

        let err = client.fetch_user_info().await.unwrap_err();
        assert!(err.is_unauthorized());

        let requests = server.requests_to("/api/v2/users/current/");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("authorization"), Some("bearer stale"));
        assert!(requests[1].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_details_resolves_bookmark() {
        let server = StubServer::start().await;
        server.route(
            "GET",
            "/api/titles/solo/",
            200,
            r#"{"content": {"id": 1, "dir": "solo", "rus_name": "Соло", "bookmark_type": 2}}"#,
        );
        let (client, _) = client(&server);

        let manga = client.fetch_details("solo").await.unwrap();
        let bookmark = manga.bookmark.unwrap();
        assert_eq!(bookmark.id, "2");
        assert_eq!(bookmark.name, "Completed");
    }

    #[tokio::test]
    async fn test_mark_read_and_like() {
        let server = StubServer::start().await;
        server.route("POST", "/api/activity/views/", 201, "{}");
        server.route("POST", "/api/activity/votes/", 201, "{}");
        let (client, _) = client(&server);

        client.mark_chapter_read("42").await.unwrap();
        client.set_chapter_like("42", true).await.unwrap();
        let err = client.set_chapter_like("42", false).await.unwrap_err();
        assert!(err.is_not_supported());

        let view = server.last_request("/api/activity/views/").unwrap();
        assert_eq!(view.json(), serde_json::json!({ "chapter": 42 }));
        let vote = server.last_request("/api/activity/votes/").unwrap();
        assert_eq!(vote.json(), serde_json::json!({ "type": 0, "chapter": 42 }));
    }

    #[tokio::test]
    async fn test_replies_use_reply_to() {
        let server = StubServer::start().await;
        server.route(
            "GET",
            "/api/activity/comments/",
            200,
            r#"{"content": [{"id": 8, "text": "re", "user": {"id": 1, "username": "u"}, "reply_to": 3}]}"#,
        );
        let (client, _) = client(&server);

        let replies = client.fetch_comments_replies("3", 10, 1).await.unwrap();
        assert_eq!(replies[0].parent_id.as_deref(), Some("3"));

        let req = server.last_request("/api/activity/comments/").unwrap();
        assert_eq!(req.query_value("reply_to").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_bookmark_types_are_canonical() {
        let server = StubServer::start().await;
        let (client, _) = client(&server);

        let types = client.fetch_bookmark_types().await.unwrap();
        assert_eq!(types.len(), 6);
        assert_eq!(types[0], BookmarkType::new("0", "Reading"));
        assert!(client.fetch_bookmarks().await.unwrap_err().is_not_supported());
    }

    #[tokio::test]
    async fn test_image_headers() {
        let server = StubServer::start().await;
        let (client, _) = client(&server);

        let headers = client.image_headers();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(REFERER).unwrap(), "https://remanga.org/");

        client.session().set_token(Some("abc".into()));
        assert_eq!(client.image_headers().get(AUTHORIZATION).unwrap(), "bearer abc");
    }

    #[tokio::test]
    async fn test_title_and_chapter_comments() {
        let server = StubServer::start().await;
        server.route(
            "GET",
            "/api/activity/comments/",
            200,
            r#"{"content": [
                {"id": 5, "text": "hi", "score": 4, "count_replies": 2,
                 "user": {"id": 1, "username": "u"}},
                {"id": 6, "text": "orphan"}
            ]}"#,
        );
        let (client, _) = client(&server);

        let comments = client.fetch_comments("solo", 20, 2).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].score, 4);
        assert_eq!(comments[0].replies, Some(2));

        client.fetch_chapter_comments("42", 20, 1).await.unwrap();

        let requests = server.requests_to("/api/activity/comments/");
        assert_eq!(requests[0].query_value("title_id").as_deref(), Some("solo"));
        assert_eq!(requests[0].query_value("page").as_deref(), Some("2"));
        assert_eq!(requests[0].query_value("count").as_deref(), Some("20"));
        assert!(requests[0].query_value("chapter_id").is_none());
        assert_eq!(requests[1].query_value("chapter_id").as_deref(), Some("42"));
        assert!(requests[1].query_value("title_id").is_none());
    }

    #[tokio::test]
    async fn test_chapter_pages_are_flattened() {
        let server = StubServer::start().await;
        server.route(
            "GET",
            "/api/titles/chapters/77/",
            200,
            r#"{"content": {"pages": [
                [{"id": 1, "link": "https://img.remanga.org/77/1.jpg"}],
                [{"id": 2, "link": "https://img.remanga.org/77/2a.jpg", "height": 900},
                 {"id": 3, "link": "https://img.remanga.org/77/2b.jpg", "height": 900}]
            ]}}"#,
        );
        let (client, _) = client(&server);

        let pages = client.fetch_chapter("77").await.unwrap();
        let indices: Vec<_> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(pages[2].url, "https://img.remanga.org/77/2b.jpg");
        assert_eq!(pages[1].height, Some(900));
    }
}
