//! # Parts Scout (library root)
//!
//! This crate provides the client side of the **Parts Scout** spare-parts
//! search assistant, shared by the `pscout` CLI and any other front-end:
//! - An HTTP client core with single-flight token refresh (`client`).
//! - Typed bindings for every backend endpoint (`api`, `models`).
//! - The conversation and product stores that hold view state and derive the
//!   suggested products shown next to the chat (`chat_store`, `product_store`).
//! - Token storage, configuration, validation and notifications (`tokens`,
//!   `config`, `validation`, `notify`).
//! - Terminal rendering and the CLI (`pretty`, `commands`, `app`).
//!
//! ## Config layout
//! The config file and token store live in the per-platform config directory:
//!
//! - macOS: `~/Library/Application Support/com.parts-scout.pscout`
//! - Linux (XDG): `~/.config/pscout`
//! - Windows: `C:\Users\<you>\AppData\Roaming\parts-scout\pscout`
//!
//! ## Quick start
//! ```no_run
//! use std::sync::Arc;
//! use parts_scout::{
//!     api::ApiService, chat_store::ChatStore, client::ApiClient, notify::TracingNotifier,
//!     tokens::MemoryTokenStore,
//! };
//!
//! # async fn demo() -> Result<(), parts_scout::error::ApiError> {
//! let client = ApiClient::builder("http://localhost:8000/api")
//!     .token_store(Arc::new(MemoryTokenStore::new()))
//!     .build()?;
//! let mut chat = ChatStore::new(ApiService::new(client), Arc::new(TracingNotifier));
//! let reply = chat.send_message("front brake pads for a 2015 Golf", false).await?;
//! println!("{}", reply.content);
//! println!("{} suggested products", chat.suggested_products().len());
//! # Ok(()) }
//! ```
//!
//! ## Modules
//! - [`api`], [`app`], [`chat_store`], [`client`], [`commands`], [`config`],
//!   [`error`], [`models`], [`notify`], [`pretty`], [`product_store`],
//!   [`tokens`], [`validation`]

use directories::ProjectDirs;
use std::error::Error;

pub mod api;
pub mod app;
pub mod chat_store;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pretty;
pub mod product_store;
pub mod tokens;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

/// Return the per-platform configuration directory used by Parts Scout.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "parts-scout", "pscout")`. The directory is **not** created by
/// this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = parts_scout::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "parts-scout", "pscout")
        .ok_or("Unable to determine config directory")?;
    let config_dir = proj_dirs.config_dir().to_path_buf();

    Ok(config_dir)
}
