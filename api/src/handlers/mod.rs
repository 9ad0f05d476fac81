//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod content;
pub mod episodes;
pub mod extract;
pub mod ownership;
pub mod purchase;
pub mod wallet;

pub use content::get_content;
pub use episodes::get_episode;
pub use ownership::get_series_ownership;
pub use purchase::{purchase_batch, purchase_episode};
pub use wallet::{get_wallet, update_settings};
