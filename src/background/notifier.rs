use anyhow::{bail, Context, Result};
use std::process::Command;

use crate::models::Notification;

/// OS notification facility.
pub trait Notifier: Send {
    fn deliver(&mut self, notification: &Notification) -> Result<()>;
}

/// Shows notifications through the desktop's own tooling.
///
/// On Linux the tag is passed as a synchronous/stack hint, which makes
/// notification daemons replace an earlier bubble with the same tag.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    #[cfg(target_os = "macos")]
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        let script = format!(
            "display notification {:?} with title {:?}",
            notification.body, notification.title
        );
        let status = Command::new("osascript")
            .args(["-e", script.as_str()])
            .status()
            .context("failed to run osascript")?;
        if !status.success() {
            bail!("osascript exited with {status}");
        }
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        let status = Command::new("notify-send")
            .arg("--app-name=waqt")
            .arg(format!("--hint=string:x-canonical-private-synchronous:{}", notification.tag))
            .arg(format!("--hint=string:x-dunst-stack-tag:{}", notification.tag))
            .arg(&notification.title)
            .arg(&notification.body)
            .status()
            .context("failed to run notify-send")?;
        if !status.success() {
            bail!("notify-send exited with {status}");
        }
        Ok(())
    }
}

/// Writes notifications to the log only. Used when desktop notifications are
/// turned off or unavailable.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        log::info!("[{}] {}: {}", notification.tag, notification.title, notification.body);
        Ok(())
    }
}

/// Tries the desktop first and falls back to the log.
pub struct FallbackNotifier<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Notifier, F: Notifier> FallbackNotifier<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: Notifier, F: Notifier> Notifier for FallbackNotifier<P, F> {
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        if let Err(e) = self.primary.deliver(notification) {
            log::warn!("desktop notification failed: {e:#}");
            return self.fallback.deliver(notification);
        }
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerType;

    #[test]
    fn prayer_notification_is_tagged_by_name() {
        let n = Notification::prayer_time(PrayerType::Maghrib);
        assert_eq!(n.tag, "Maghrib");
        assert_eq!(n.body, "It's time for Maghrib");
    }

    #[test]
    fn fallback_takes_over_when_primary_fails() {
        let primary = RecordingNotifier::failing();
        let fallback = RecordingNotifier::new();
        let mut notifier = FallbackNotifier::new(primary.clone(), fallback.clone());

        notifier.deliver(&Notification::prayer_time(PrayerType::Asr)).unwrap();
        assert_eq!(primary.tags(), vec!["Asr"]);
        assert_eq!(fallback.tags(), vec!["Asr"]);
    }
}
