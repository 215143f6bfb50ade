pub mod notification;
pub mod prayer;

pub use notification::Notification;
pub use prayer::{Alarm, AlarmSet, PrayerType};
