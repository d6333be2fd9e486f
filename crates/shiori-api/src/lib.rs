//! Unified client for manga reading services.
//!
//! Every backend (ReManga, NewManga) implements [`MangaService`] and maps its
//! own wire format into the shared types in [`models`]. Callers normally hold
//! a [`MangaClient`] selected by [`Backend`] and never touch a concrete
//! backend type.

pub mod client;
pub mod error;
pub mod models;
pub mod newmanga;
pub mod remanga;
pub mod session;
pub mod traits;
mod transport;

#[cfg(test)]
mod testing;

pub use client::MangaClient;
pub use error::ApiError;
pub use session::{MemoryTokenStore, Session, TokenStore};
pub use traits::{Backend, MangaService};
pub use transport::{ClientOptions, DEFAULT_TIMEOUT};
