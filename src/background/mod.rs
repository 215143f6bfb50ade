pub mod channel;
pub mod clock;
pub mod context;
pub mod dispatcher;
pub mod lease;
pub mod notifier;
pub mod rollover;
pub mod store;

pub use channel::{Envelope, ForegroundLink, ToBackground, ToForeground};
pub use clock::{Clock, SystemClock};
pub use context::{BackgroundContext, BackgroundHandle, BackgroundSettings};
pub use lease::InstanceLease;
pub use notifier::{DesktopNotifier, FallbackNotifier, LogNotifier, Notifier};
pub use store::{ScheduleStore, SqliteScheduleStore};
