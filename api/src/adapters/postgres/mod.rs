//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod episode_repo;
pub mod ownership_repo;
pub mod purchase_repo;
pub mod user_repo;


pub use episode_repo::PostgresEpisodeRepository;
pub use ownership_repo::PostgresOwnershipRepository;
pub use purchase_repo::PostgresPurchaseRepository;
pub use user_repo::PostgresUserRepository;
