use std::path::Path;

use serde::Serialize;
use serde_json::json;
use shiori_api::models::BookmarkType;
use shiori_api::{ApiError, MangaClient, MangaService};
use shiori_core::config::AppConfig;
use shiori_core::error::ShioriError;

use crate::cli::Command;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ShioriError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("unknown bookmark type: {0}")]
    UnknownBookmark(String),
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute one subcommand against `client`, printing the result as JSON.
pub async fn run(client: &MangaClient, command: Command) -> Result<(), CliError> {
    match command {
        Command::Catalog { page, filters } => {
            print(&client.fetch_catalog(page, &filters).await?)
        }
        Command::Search {
            query,
            page,
            filters,
        } => print(&client.fetch_search(&query, page, &filters).await?),
        Command::Details { id } => print(&client.fetch_details(&id).await?),
        Command::Chapters {
            branch,
            page,
            count,
        } => print(&client.fetch_title_chapters(&branch, count, page).await?),
        Command::Pages { chapter } => print(&client.fetch_chapter(&chapter).await?),
        Command::Comments { id, page, count } => {
            print(&client.fetch_comments(&id, count, page).await?)
        }
        Command::CommentsCount { id } => print(&client.fetch_comments_count(&id).await?),
        Command::ChapterComments { id, page, count } => {
            print(&client.fetch_chapter_comments(&id, count, page).await?)
        }
        Command::ChapterCommentsCount { id } => {
            print(&client.fetch_chapter_comments_count(&id).await?)
        }
        Command::Replies { id, page, count } => {
            print(&client.fetch_comments_replies(&id, count, page).await?)
        }
        Command::Read { chapter } => {
            client.mark_chapter_read(&chapter).await?;
            print(&json!({ "read": chapter }))
        }
        Command::Like { chapter, remove } => {
            client.set_chapter_like(&chapter, !remove).await?;
            print(&json!({ "chapter": chapter, "liked": !remove }))
        }
        Command::Buy { chapter } => {
            let bought = client.buy_chapter(&chapter).await?;
            print(&json!({ "chapter": chapter, "bought": bought }))
        }
        Command::MarkComment { id, vote } => {
            let score = client.mark_comment(&id, vote).await?;
            print(&json!({ "comment": id, "score": score }))
        }
        Command::Whoami => print(&client.fetch_user_info().await?),
        Command::BookmarkTypes => print(&client.fetch_bookmark_types().await?),
        Command::Bookmark { title, kind } => {
            let bookmark = match kind {
                Some(kind) => {
                    let types = client.fetch_bookmark_types().await?;
                    Some(resolve_bookmark(&types, &kind)?)
                }
                None => None,
            };
            client.set_bookmark(&title, bookmark.as_ref()).await?;
            print(&json!({ "title": title, "bookmark": bookmark }))
        }
        Command::Bookmarks => print(&client.fetch_bookmarks().await?),
        Command::Login { token } => {
            client.authorize(token);
            let user = client.fetch_user_info().await?;
            tracing::info!(backend = %client.backend(), user = %user.name, "Signed in");
            print(&user)
        }
        Command::Logout => {
            client.deauth();
            tracing::info!(backend = %client.backend(), "Signed out");
            Ok(())
        }
        Command::InitConfig { force } => init_config(&AppConfig::config_path(), force),
    }
}

/// Write the default config to `path` and report where it went.
pub fn init_config(path: &Path, force: bool) -> Result<(), CliError> {
    let written = AppConfig::write_default(path, force)?;
    if !written {
        tracing::info!(path = %path.display(), "Config exists, use --force to replace it");
    }
    print(&json!({ "path": path.display().to_string(), "written": written }))
}

/// Find a bookmark type by id, or by case-insensitive name.
fn resolve_bookmark(types: &[BookmarkType], key: &str) -> Result<BookmarkType, CliError> {
    types
        .iter()
        .find(|t| t.id == key)
        .or_else(|| types.iter().find(|t| t.name.eq_ignore_ascii_case(key)))
        .cloned()
        .ok_or_else(|| CliError::UnknownBookmark(key.to_string()))
}
