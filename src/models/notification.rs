use serde::{Deserialize, Serialize};

use crate::models::PrayerType;

/// An OS-level notification. Delivering a second notification with the same
/// `tag` replaces the first one instead of stacking next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

impl Notification {
    pub fn prayer_time(prayer: PrayerType) -> Self {
        Self {
            title: "🕌 Prayer Time".to_string(),
            body: format!("It's time for {}", prayer.display_name()),
            tag: prayer.display_name().to_string(),
        }
    }
}
