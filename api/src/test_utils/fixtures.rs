//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{
    Episode, EpisodeId, EpisodeImage, Series, SeriesId, SeriesKind, User, UserId,
};

static NEXT_USER_ID: AtomicI64 = AtomicI64::new(1);

/// Create a test user with the given balance and auto-purchase off
pub fn test_user(point_balance: i64) -> User {
    test_user_with_auto_purchase(point_balance, false)
}

/// Create a test user with the given balance and auto-purchase setting
pub fn test_user_with_auto_purchase(point_balance: i64, auto_purchase: bool) -> User {
    User {
        id: UserId(NEXT_USER_ID.fetch_add(1, Ordering::Relaxed)),
        point_balance,
        auto_purchase,
        created_at: Utc::now(),
    }
}

/// Create a test series with id 1
pub fn test_series() -> Series {
    Series {
        id: SeriesId(1),
        uuid: Uuid::new_v4(),
        title: "Test Series".to_string(),
        kind: SeriesKind::Manga,
    }
}

/// Create an episode of series 1
pub fn test_episode(id: i64, ep_no: i32, price: i64) -> Episode {
    Episode {
        id: EpisodeId(id),
        uuid: Uuid::new_v4(),
        series_id: SeriesId(1),
        ep_no,
        name: format!("Episode {}", ep_no),
        price,
    }
}

/// Create an episode of the given series
pub fn test_episode_in(series: &Series, id: i64, ep_no: i32, price: i64) -> Episode {
    Episode {
        series_id: series.id,
        ..test_episode(id, ep_no, price)
    }
}

/// `count` images with positions starting at 1
pub fn test_images(count: i32) -> Vec<EpisodeImage> {
    (1..=count)
        .map(|position| EpisodeImage {
            position,
            url: format!("https://cdn.example.com/images/{}.webp", position),
        })
        .collect()
}
