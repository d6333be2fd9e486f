use clap::{Parser, Subcommand};
use shiori_api::models::{Tag, TagKind};
use shiori_api::Backend;

/// Command-line client for ReManga and NewManga.
#[derive(Debug, Parser)]
#[command(name = "shiori", version, about)]
pub struct Cli {
    /// Backend to talk to (defaults to the configured one).
    #[arg(short, long, global = true)]
    pub backend: Option<Backend>,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse the catalog.
    Catalog {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Filter as `kind:id:name`, kind one of tag, type, genre.
        #[arg(short, long = "filter", value_parser = parse_tag)]
        filters: Vec<Tag>,
    },
    /// Search titles by name.
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long = "filter", value_parser = parse_tag)]
        filters: Vec<Tag>,
    },
    /// Show a title.
    Details { id: String },
    /// List chapters of a branch.
    Chapters {
        branch: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 100)]
        count: u32,
    },
    /// List page images of a chapter.
    Pages { chapter: String },
    /// Comments on a title.
    Comments {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 30)]
        count: u32,
    },
    CommentsCount { id: String },
    /// Comments on a chapter.
    ChapterComments {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 30)]
        count: u32,
    },
    ChapterCommentsCount { id: String },
    /// Replies to a comment.
    Replies {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 30)]
        count: u32,
    },
    /// Mark a chapter as read.
    Read { chapter: String },
    /// Like a chapter, or remove the like with `--remove`.
    Like {
        chapter: String,
        #[arg(long)]
        remove: bool,
    },
    /// Buy a paid chapter.
    Buy { chapter: String },
    /// Vote on a comment.
    MarkComment {
        id: String,
        #[arg(value_parser = parse_vote)]
        vote: Option<bool>,
    },
    /// Show the signed-in user.
    Whoami,
    BookmarkTypes,
    /// Bookmark a title; without `--kind` the bookmark is removed.
    Bookmark {
        title: String,
        /// Bookmark type id or name.
        #[arg(short, long)]
        kind: Option<String>,
    },
    Bookmarks,
    /// Store an auth token for the backend.
    Login { token: String },
    /// Forget the stored token.
    Logout,
    /// Write the default config file.
    InitConfig {
        /// Replace an existing config file.
        #[arg(long)]
        force: bool,
    },
}

/// Parse `kind:id:name`; `name` may contain colons.
pub fn parse_tag(value: &str) -> Result<Tag, String> {
    let mut parts = value.splitn(3, ':');
    let (Some(kind), Some(id), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected kind:id:name, got {value:?}"));
    };
    let kind = match kind.to_ascii_lowercase().as_str() {
        "tag" | "category" => TagKind::Tag,
        "type" => TagKind::Type,
        "genre" => TagKind::Genre,
        other => return Err(format!("unknown filter kind: {other}")),
    };
    Ok(Tag::new(kind, id, name))
}

fn parse_vote(value: &str) -> Result<bool, String> {
    match value {
        "up" | "+" | "like" => Ok(true),
        "down" | "-" | "dislike" => Ok(false),
        other => Err(format!("expected up or down, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        let tag = parse_tag("genre:12:Sci-Fi: Space").unwrap();
        assert_eq!(tag.kind, TagKind::Genre);
        assert_eq!(tag.id, "12");
        assert_eq!(tag.name, "Sci-Fi: Space");

        assert!(parse_tag("genre:12").is_err());
        assert!(parse_tag("colour:1:red").is_err());
    }

    #[test]
    fn test_global_backend_flag() {
        let cli = Cli::try_parse_from(["shiori", "details", "solo", "--backend", "NewManga"])
            .unwrap();
        assert_eq!(cli.backend, Some(Backend::NewManga));
        assert!(matches!(cli.command, Command::Details { ref id } if id == "solo"));
    }

    #[test]
    fn test_mark_comment_vote() {
        let cli = Cli::try_parse_from(["shiori", "mark-comment", "7", "down"]).unwrap();
        assert!(matches!(cli.command, Command::MarkComment { vote: Some(false), .. }));

        let cli = Cli::try_parse_from(["shiori", "mark-comment", "7"]).unwrap();
        assert!(matches!(cli.command, Command::MarkComment { vote: None, .. }));
    }

    #[test]
    fn test_init_config_flag() {
        let cli = Cli::try_parse_from(["shiori", "init-config", "--force"]).unwrap();
        assert!(matches!(cli.command, Command::InitConfig { force: true }));
    }

    #[test]
    fn test_catalog_filters() {
        let cli = Cli::try_parse_from([
            "shiori", "catalog", "-f", "type:1:Manhwa", "-f", "tag:5:Isekai",
        ])
        .unwrap();
        let Command::Catalog { page, filters } = cli.command else {
            panic!("expected catalog");
        };
        assert_eq!(page, 1);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].kind, TagKind::Type);
    }
}
