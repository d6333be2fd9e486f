use serde::Deserialize;

use crate::models::{
    parse_timestamp, Branch, Chapter, Comment, CommentAuthor, Manga, Page, Tag, TagKind, User,
};
use crate::transport::join_url;

// ── Response envelopes ──────────────────────────────────────────

/// Every ReManga response wraps its payload in `content`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub content: T,
}

// ── Shared pieces ───────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ReMangaImage {
    pub high: Option<String>,
    pub mid: Option<String>,
    pub low: Option<String>,
}

impl ReMangaImage {
    fn best(&self) -> Option<&str> {
        self.high
            .as_deref()
            .or(self.mid.as_deref())
            .or(self.low.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReMangaNamed {
    pub id: u64,
    pub name: String,
}

// ── Titles ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReMangaCatalogItem {
    pub id: u64,
    pub dir: String,
    pub rus_name: Option<String>,
    pub en_name: Option<String>,
    pub img: Option<ReMangaImage>,
    #[serde(default)]
    pub genres: Vec<ReMangaNamed>,
    #[serde(default)]
    pub categories: Vec<ReMangaNamed>,
}

#[derive(Debug, Deserialize)]
pub struct ReMangaBranch {
    pub id: u64,
    pub count_chapters: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReMangaDetails {
    pub id: u64,
    pub dir: String,
    pub rus_name: Option<String>,
    pub en_name: Option<String>,
    pub another_name: Option<String>,
    pub img: Option<ReMangaImage>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<ReMangaNamed>,
    #[serde(default)]
    pub genres: Vec<ReMangaNamed>,
    #[serde(default)]
    pub categories: Vec<ReMangaNamed>,
    #[serde(default)]
    pub branches: Vec<ReMangaBranch>,
    /// Numeric bookmark category of the viewer, if any.
    pub bookmark_type: Option<u32>,
}

// ── Chapters & pages ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReMangaChapter {
    pub id: u64,
    pub index: u32,
    pub tome: Option<u32>,
    pub chapter: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_bought: Option<bool>,
    #[serde(default)]
    pub viewed: Option<bool>,
    #[serde(default)]
    pub rated: Option<bool>,
    pub upload_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReMangaChapterPages {
    /// Pages may be split into several slices, hence the nesting.
    #[serde(default)]
    pub pages: Vec<Vec<ReMangaPage>>,
}

#[derive(Debug, Deserialize)]
pub struct ReMangaPage {
    pub id: u64,
    pub link: String,
    pub page: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

// ── Comments & users ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReMangaUser {
    pub id: u64,
    pub username: String,
    pub avatar: Option<ReMangaImage>,
}

#[derive(Debug, Deserialize)]
pub struct ReMangaComment {
    pub id: u64,
    pub text: Option<String>,
    pub user: Option<ReMangaUser>,
    #[serde(default)]
    pub score: i64,
    pub count_replies: Option<u32>,
    pub reply_to: Option<u64>,
    pub date: Option<String>,
}

// ── Conversions ─────────────────────────────────────────────────

fn tags(genres: Vec<ReMangaNamed>, categories: Vec<ReMangaNamed>) -> Vec<Tag> {
    genres
        .into_iter()
        .map(|g| Tag::new(TagKind::Genre, g.id.to_string(), g.name))
        .chain(
            categories
                .into_iter()
                .map(|c| Tag::new(TagKind::Tag, c.id.to_string(), c.name)),
        )
        .collect()
}

fn image_url(site: &str, img: Option<&ReMangaImage>) -> Option<String> {
    img.and_then(ReMangaImage::best)
        .and_then(|path| join_url(site, path))
}

impl ReMangaCatalogItem {
    pub fn into_manga(self, site: &str) -> Manga {
        Manga {
            cover_url: image_url(site, self.img.as_ref()),
            title: self
                .rus_name
                .or_else(|| self.en_name.clone())
                .unwrap_or_else(|| self.dir.clone()),
            alt_title: self.en_name,
            id: self.dir,
            description: None,
            tags: tags(self.genres, self.categories),
            branches: Vec::new(),
            bookmark: None,
        }
    }
}

impl ReMangaDetails {
    pub fn into_manga(self, site: &str) -> Manga {
        let mut tags = tags(self.genres, self.categories);
        if let Some(t) = self.type_ {
            tags.insert(0, Tag::new(TagKind::Type, t.id.to_string(), t.name));
        }
        Manga {
            cover_url: image_url(site, self.img.as_ref()),
            title: self
                .rus_name
                .or_else(|| self.en_name.clone())
                .unwrap_or_else(|| self.dir.clone()),
            alt_title: self.en_name.or(self.another_name),
            id: self.dir,
            description: self.description,
            tags,
            branches: self
                .branches
                .into_iter()
                .map(|b| Branch {
                    id: b.id.to_string(),
                    chapters: b.count_chapters,
                })
                .collect(),
            bookmark: None,
        }
    }
}

impl ReMangaChapter {
    pub fn into_chapter(self) -> Chapter {
        Chapter {
            id: self.id.to_string(),
            volume: self.tome.map(|t| t.to_string()),
            number: self.chapter,
            name: self.name.filter(|n| !n.is_empty()),
            index: self.index,
            is_read: self.viewed.unwrap_or(false),
            is_liked: self.rated.unwrap_or(false),
            is_paid: self.is_paid,
            is_bought: self.is_bought.unwrap_or(false),
            uploaded_at: parse_timestamp(self.upload_date.as_deref()),
        }
    }
}

impl ReMangaChapterPages {
    pub fn into_pages(self, chapter_id: &str) -> Vec<Page> {
        self.pages
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, p)| Page {
                chapter_id: chapter_id.to_string(),
                index: i as u32,
                url: p.link,
                width: p.width,
                height: p.height,
            })
            .collect()
    }
}

impl ReMangaUser {
    pub fn into_user(self, site: &str) -> User {
        User {
            id: self.id.to_string(),
            avatar_url: image_url(site, self.avatar.as_ref()),
            name: self.username,
        }
    }
}

impl ReMangaComment {
    /// Comments without an author (deleted accounts) are dropped.
    pub fn into_comment(self, site: &str) -> Option<Comment> {
        let user = self.user?;
        Some(Comment {
            id: self.id.to_string(),
            author: CommentAuthor {
                id: user.id.to_string(),
                avatar_url: image_url(site, user.avatar.as_ref()),
                name: user.username,
            },
            body: self.text.unwrap_or_default(),
            parent_id: self.reply_to.map(|id| id.to_string()),
            score: self.score,
            replies: self.count_replies,
            created_at: parse_timestamp(self.date.as_deref()),
        })
    }
}
