use serde::{Deserialize, Serialize};

use crate::models::{
    parse_timestamp, BookmarkKind, Branch, BookmarkType, Chapter, Comment, CommentAuthor, Manga, Page, Tag,
    TagKind, User,
};
use crate::transport::join_url;

// ── Catalogue search request ────────────────────────────────────

/// Body of `POST /catalogue`. Filters are matched by display name.
#[derive(Debug, Serialize)]
pub struct CatalogRequest {
    pub query: String,
    pub sort: CatalogSort,
    pub filter: CatalogFilter,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CatalogSort {
    pub kind: &'static str,
    pub dir: &'static str,
}

#[derive(Debug, Default, Serialize)]
pub struct Inclusion {
    pub excluded: Vec<String>,
    pub included: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct Allowance {
    pub allowed: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct YearRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CatalogFilter {
    pub hidden_projects: Vec<u64>,
    pub genres: Inclusion,
    pub tags: Inclusion,
    #[serde(rename = "type")]
    pub type_: Allowance,
    pub translation_status: Allowance,
    pub released_year: YearRange,
    pub require_chapters: bool,
    pub original_status: Allowance,
    pub adult: Allowance,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
}

impl CatalogRequest {
    pub const PAGE_SIZE: u32 = 30;

    pub fn new(query: &str, page: u32, filters: &[Tag]) -> Self {
        let mut filter = CatalogFilter {
            hidden_projects: Vec::new(),
            genres: Inclusion::default(),
            tags: Inclusion::default(),
            type_: Allowance::default(),
            translation_status: Allowance::default(),
            released_year: YearRange::default(),
            require_chapters: true,
            original_status: Allowance::default(),
            adult: Allowance::default(),
        };

        for f in filters {
            match f.kind {
                TagKind::Tag => filter.tags.included.push(f.name.clone()),
                TagKind::Type => filter.type_.allowed.push(f.name.clone()),
                TagKind::Genre => filter.genres.included.push(f.name.clone()),
            }
        }

        Self {
            query: query.to_string(),
            sort: CatalogSort {
                kind: "RATING",
                dir: "DESC",
            },
            filter,
            pagination: Pagination {
                page,
                size: Self::PAGE_SIZE,
            },
        }
    }
}

// ── Catalogue search response ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CatalogResponse {
    pub result: CatalogResult,
}

#[derive(Debug, Deserialize)]
pub struct CatalogResult {
    pub hits: Option<Vec<CatalogHit>>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogHit {
    pub document: Option<CatalogDocument>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogDocument {
    pub id: String,
    pub slug: Option<String>,
    pub title_ru: Option<String>,
    pub title_en: Option<String>,
    pub image: Option<NewMangaImage>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

// ── Projects ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewMangaImage {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewMangaTitle {
    pub ru: Option<String>,
    pub en: Option<String>,
    pub original: Option<String>,
}

impl NewMangaTitle {
    fn primary(&self) -> Option<String> {
        self.ru.clone().or_else(|| self.en.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct NewMangaLabel {
    pub id: u64,
    pub title: NewMangaTitle,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaBranch {
    pub id: u64,
    pub chapters_total: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaBookmarkRef {
    #[serde(rename = "type")]
    pub type_: String,
}

/// A project as returned by `/v2/projects/{id}` and inside bookmark lists.
#[derive(Debug, Deserialize)]
pub struct NewMangaProject {
    pub id: u64,
    pub slug: Option<String>,
    #[serde(default)]
    pub title: NewMangaTitle,
    pub image: Option<NewMangaImage>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub genres: Vec<NewMangaLabel>,
    #[serde(default)]
    pub tags: Vec<NewMangaLabel>,
    #[serde(default)]
    pub branches: Vec<NewMangaBranch>,
    pub bookmark: Option<NewMangaBookmarkRef>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaBookmarkEntry {
    #[serde(rename = "type")]
    pub type_: String,
    pub project: NewMangaProject,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaBookmarkTypeCount {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub count: u32,
}

// ── Chapters & pages ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewMangaChapter {
    pub id: u64,
    pub tom: Option<u32>,
    pub number: f64,
    pub name: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub is_bought: Option<bool>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub is_liked: Option<bool>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaChapterPages {
    /// Base URL the page paths are relative to.
    pub origin: String,
    #[serde(default)]
    pub pages: Vec<NewMangaPage>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaPage {
    pub path: String,
    pub size: Option<NewMangaPageSize>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaPageSize {
    pub width: u32,
    pub height: u32,
}

// ── Users, comments, votes ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewMangaUser {
    pub id: u64,
    pub name: String,
    pub image: Option<NewMangaImage>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaComment {
    pub id: u64,
    pub text: Option<String>,
    pub user: Option<NewMangaUser>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub dislikes: i64,
    pub parent_id: Option<u64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewMangaMarkResult {
    pub likes: i64,
    pub dislikes: i64,
}

impl NewMangaMarkResult {
    pub fn score(&self) -> i64 {
        self.likes - self.dislikes
    }
}

#[derive(Debug, Deserialize)]
pub struct NewMangaHeartResult {
    #[serde(default)]
    pub hearts: u64,
}

// ── Conversions ─────────────────────────────────────────────────

/// NewManga identifies bookmark categories by their Russian names.
pub fn bookmark_id(kind: BookmarkKind) -> &'static str {
    match kind {
        BookmarkKind::Reading => "Читаю",
        BookmarkKind::PlanToRead => "Буду читать",
        BookmarkKind::Completed => "Прочитано",
        BookmarkKind::OnHold => "Отложено",
        BookmarkKind::Dropped => "Брошено",
        BookmarkKind::NotInteresting => "Не интересно",
    }
}

/// Bookmark type for a NewManga category name. Canonical categories get
/// their canonical display name; user-defined ones keep the raw name.
pub fn bookmark_type(id: String) -> BookmarkType {
    match BookmarkKind::ALL.into_iter().find(|&k| bookmark_id(k) == id) {
        Some(kind) => BookmarkType::new(id, kind.display_name()),
        None => BookmarkType::new(id.clone(), id),
    }
}

/// Image hosts a project or user image name is resolved against.
pub struct ImageBase<'a> {
    pub cards: &'a str,
    pub avatars: &'a str,
}

fn label_tags(kind: TagKind, labels: Vec<NewMangaLabel>) -> impl Iterator<Item = Tag> {
    labels.into_iter().filter_map(move |l| {
        let name = l.title.primary()?;
        Some(Tag::new(kind, l.id.to_string(), name))
    })
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl CatalogDocument {
    pub fn into_manga(self, images: &ImageBase<'_>) -> Manga {
        let mut tags: Vec<Tag> = Vec::new();
        if let Some(t) = self.type_ {
            tags.push(Tag::new(TagKind::Type, t.clone(), t));
        }
        tags.extend(self.genres.into_iter().map(|g| Tag::new(TagKind::Genre, g.clone(), g)));
        tags.extend(self.tags.into_iter().map(|t| Tag::new(TagKind::Tag, t.clone(), t)));

        Manga {
            title: self
                .title_ru
                .or_else(|| self.title_en.clone())
                .or_else(|| self.slug.clone())
                .unwrap_or_else(|| self.id.clone()),
            alt_title: self.title_en,
            cover_url: self.image.and_then(|i| join_url(images.cards, &i.name)),
            description: self.description,
            tags,
            branches: Vec::new(),
            bookmark: None,
            id: self.id,
        }
    }
}

impl NewMangaProject {
    pub fn into_manga(self, images: &ImageBase<'_>) -> Manga {
        let mut tags: Vec<Tag> = Vec::new();
        if let Some(t) = self.type_ {
            tags.push(Tag::new(TagKind::Type, t.clone(), t));
        }
        tags.extend(label_tags(TagKind::Genre, self.genres));
        tags.extend(label_tags(TagKind::Tag, self.tags));

        Manga {
            id: self.id.to_string(),
            title: self
                .title
                .primary()
                .or_else(|| self.slug.clone())
                .unwrap_or_else(|| self.id.to_string()),
            alt_title: self.title.en.or(self.title.original),
            cover_url: self.image.and_then(|i| join_url(images.cards, &i.name)),
            description: self.description,
            tags,
            branches: self
                .branches
                .into_iter()
                .map(|b| Branch {
                    id: b.id.to_string(),
                    chapters: b.chapters_total,
                })
                .collect(),
            bookmark: None,
        }
    }
}

impl NewMangaChapter {
    /// `index` is assigned by the caller once the list is in reading order.
    pub fn into_chapter(self, index: u32) -> Chapter {
        let is_paid = self.price.unwrap_or(0) > 0;
        Chapter {
            id: self.id.to_string(),
            volume: self.tom.map(|t| t.to_string()),
            number: format_number(self.number),
            name: self.name.filter(|n| !n.is_empty()),
            index,
            is_read: self.is_read.unwrap_or(false),
            is_liked: self.is_liked.unwrap_or(false),
            is_paid,
            is_bought: self
                .is_bought
                .unwrap_or(is_paid && self.is_available.unwrap_or(false)),
            uploaded_at: parse_timestamp(self.created_at.as_deref()),
        }
    }
}

impl NewMangaChapterPages {
    pub fn into_pages(self, chapter_id: &str) -> Vec<Page> {
        let origin = if self.origin.ends_with('/') {
            self.origin
        } else {
            format!("{}/", self.origin)
        };
        self.pages
            .into_iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let url = join_url(&origin, &p.path)?;
                Some(Page {
                    chapter_id: chapter_id.to_string(),
                    index: i as u32,
                    url,
                    width: p.size.as_ref().map(|s| s.width),
                    height: p.size.as_ref().map(|s| s.height),
                })
            })
            .collect()
    }
}

impl NewMangaUser {
    pub fn into_user(self, images: &ImageBase<'_>) -> User {
        User {
            id: self.id.to_string(),
            name: self.name,
            avatar_url: self.image.and_then(|i| join_url(images.avatars, &i.name)),
        }
    }
}

impl NewMangaComment {
    /// Comments without an author (deleted accounts) are dropped.
    pub fn into_comment(self, images: &ImageBase<'_>) -> Option<Comment> {
        let user = self.user?.into_user(images);
        Some(Comment {
            id: self.id.to_string(),
            author: CommentAuthor {
                id: user.id,
                name: user.name,
                avatar_url: user.avatar_url,
            },
            body: self.text.unwrap_or_default(),
            parent_id: self.parent_id.map(|id| id.to_string()),
            score: self.likes - self.dislikes,
            replies: None,
            created_at: parse_timestamp(self.created_at.as_deref()),
        })
    }
}

impl NewMangaBookmarkEntry {
    pub fn into_manga(self, images: &ImageBase<'_>) -> Manga {
        let mut manga = self.project.into_manga(images);
        manga.bookmark = Some(bookmark_type(self.type_));
        manga
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGES: ImageBase<'static> = ImageBase {
        cards: "https://img.newmanga.org/ProjectCard/webp/",
        avatars: "https://img.newmanga.org/Avatar/webp/",
    };

    #[test]
    fn test_catalog_request_translates_filters() {
        let filters = vec![
            Tag::new(TagKind::Tag, "10", "Магия"),
            Tag::new(TagKind::Type, "2", "Манхва"),
            Tag::new(TagKind::Genre, "3", "Драма"),
            Tag::new(TagKind::Genre, "4", "Комедия"),
        ];
        let body = serde_json::to_value(CatalogRequest::new("", 2, &filters)).unwrap();

        assert_eq!(body["query"], "");
        assert_eq!(body["pagination"]["page"], 2);
        assert_eq!(body["pagination"]["size"], 30);
        assert_eq!(body["filter"]["tags"]["included"], serde_json::json!(["Магия"]));
        assert_eq!(body["filter"]["type"]["allowed"], serde_json::json!(["Манхва"]));
        assert_eq!(
            body["filter"]["genres"]["included"],
            serde_json::json!(["Драма", "Комедия"])
        );
        assert_eq!(body["filter"]["genres"]["excluded"], serde_json::json!([]));
        assert_eq!(body["sort"]["kind"], "RATING");
    }

    #[test]
    fn test_deserialize_catalog_skips_empty_hits() {
        let json = r#"{
            "result": {
                "hits": [
                    {"document": {"id": "42", "slug": "tower", "title_ru": "Башня",
                                  "title_en": "Tower", "image": {"name": "tower.webp"},
                                  "genres": ["Драма"], "type": "Манхва"}},
                    {"document": null}
                ]
            }
        }"#;

        let resp: CatalogResponse = serde_json::from_str(json).unwrap();
        let mangas: Vec<Manga> = resp
            .result
            .hits
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| h.document)
            .map(|d| d.into_manga(&IMAGES))
            .collect();

        assert_eq!(mangas.len(), 1);
        assert_eq!(mangas[0].id, "42");
        assert_eq!(mangas[0].title, "Башня");
        assert_eq!(
            mangas[0].cover_url.as_deref(),
            Some("https://img.newmanga.org/ProjectCard/webp/tower.webp")
        );
        assert_eq!(mangas[0].tags[0].kind, TagKind::Type);
        assert_eq!(mangas[0].tags[1].name, "Драма");
    }

    #[test]
    fn test_catalog_without_hits() {
        let resp: CatalogResponse = serde_json::from_str(r#"{"result": {}}"#).unwrap();
        assert!(resp.result.hits.is_none());
    }

    #[test]
    fn test_deserialize_project() {
        let json = r#"{
            "id": 42,
            "slug": "tower",
            "title": {"ru": "Башня", "en": "Tower", "original": "탑"},
            "image": {"name": "tower.webp"},
            "description": "Climb",
            "type": "Манхва",
            "genres": [{"id": 3, "title": {"ru": "Драма", "en": "Drama"}}],
            "tags": [{"id": 10, "title": {"en": "Magic"}}],
            "branches": [{"id": 900, "chapters_total": 55}],
            "bookmark": {"type": "Читаю"}
        }"#;

        let project: NewMangaProject = serde_json::from_str(json).unwrap();
        assert_eq!(project.bookmark.as_ref().unwrap().type_, "Читаю");

        let manga = project.into_manga(&IMAGES);
        assert_eq!(manga.id, "42");
        assert_eq!(manga.alt_title.as_deref(), Some("Tower"));
        assert_eq!(manga.tags.len(), 3);
        assert_eq!(manga.tags[2].name, "Magic");
        assert_eq!(manga.branches[0].id, "900");
        assert!(manga.bookmark.is_none());
    }

    #[test]
    fn test_chapter_number_formatting() {
        let json = r#"[
            {"id": 1, "tom": 1, "number": 12.0, "name": "", "price": 0},
            {"id": 2, "tom": 1, "number": 12.5, "name": "Extra", "price": 10, "is_available": true}
        ]"#;

        let chapters: Vec<NewMangaChapter> = serde_json::from_str(json).unwrap();
        let mut it = chapters.into_iter();
        let first = it.next().unwrap().into_chapter(1);
        let second = it.next().unwrap().into_chapter(2);

        assert_eq!(first.number, "12");
        assert!(first.name.is_none());
        assert!(!first.is_paid);
        assert_eq!(second.number, "12.5");
        assert!(second.is_paid);
        assert!(second.is_bought);
    }

    #[test]
    fn test_pages_resolve_against_origin() {
        let json = r#"{
            "origin": "https://storage.newmanga.org/chapters/77",
            "pages": [
                {"path": "001.jpg", "size": {"width": 720, "height": 1000}},
                {"path": "002.jpg"}
            ]
        }"#;

        let pages: NewMangaChapterPages = serde_json::from_str(json).unwrap();
        let pages = pages.into_pages("77");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].url, "https://storage.newmanga.org/chapters/77/001.jpg");
        assert_eq!(pages[0].height, Some(1000));
        assert_eq!(pages[1].index, 1);
        assert!(pages[1].width.is_none());
    }

    #[test]
    fn test_bookmark_entry_uses_canonical_name() {
        let json = r#"[
            {"type": "Читаю", "project": {"id": 1, "title": {"ru": "Башня"}}},
            {"type": "Любимое", "project": {"id": 2, "title": {"ru": "Сад"}}}
        ]"#;
        let entries: Vec<NewMangaBookmarkEntry> = serde_json::from_str(json).unwrap();
        let mangas: Vec<Manga> = entries.into_iter().map(|e| e.into_manga(&IMAGES)).collect();

        assert_eq!(mangas[0].bookmark, Some(BookmarkType::new("Читаю", "Reading")));
        assert_eq!(mangas[1].bookmark, Some(BookmarkType::new("Любимое", "Любимое")));
    }

    #[test]
    fn test_comment_score_is_likes_minus_dislikes() {
        let json = r#"{"id": 5, "text": "nice", "likes": 7, "dislikes": 2,
                       "user": {"id": 3, "name": "reader", "image": {"name": "a.webp"}}}"#;
        let comment: NewMangaComment = serde_json::from_str(json).unwrap();
        let comment = comment.into_comment(&IMAGES).unwrap();

        assert_eq!(comment.score, 5);
        assert!(comment.replies.is_none());
        assert_eq!(
            comment.author.avatar_url.as_deref(),
            Some("https://img.newmanga.org/Avatar/webp/a.webp")
        );
    }
}
