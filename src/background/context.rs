//! The background context: one thread that owns the alarm set and serializes
//! heartbeat scans, the midnight timer and incoming messages through a single
//! loop. Nothing in here is shared with foreground views except the channel.

use anyhow::Result;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::assets::AssetCache;
use crate::background::channel::{Broadcaster, Envelope, ForegroundLink, ToBackground, ToForeground};
use crate::background::clock::Clock;
use crate::background::dispatcher::Dispatcher;
use crate::background::notifier::Notifier;
use crate::background::rollover::RolloverTimer;
use crate::background::store::ScheduleStore;
use crate::models::PrayerType;

#[derive(Debug, Clone)]
pub struct BackgroundSettings {
    pub heartbeat: Duration,
    pub tolerance_ms: i64,
    pub rollover_grace: chrono::Duration,
}

impl From<&crate::config::settings::AlarmConfig> for BackgroundSettings {
    fn from(config: &crate::config::settings::AlarmConfig) -> Self {
        Self {
            heartbeat: config.heartbeat(),
            tolerance_ms: config.tolerance_ms,
            rollover_grace: config.rollover_grace(),
        }
    }
}

pub struct BackgroundContext {
    dispatcher: Dispatcher,
    views: Broadcaster,
    rollover: RolloverTimer,
    clock: Box<dyn Clock>,
    heartbeat: Duration,
}

impl BackgroundContext {
    /// Bring the context up: reclaim stale asset caches, restore the alarm
    /// set from the store and arm the midnight timer. Refuses to start when
    /// the current asset cache is incomplete.
    pub fn activate(
        store: Box<dyn ScheduleStore>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        assets: Option<&AssetCache>,
        settings: &BackgroundSettings,
    ) -> Result<Self> {
        if let Some(cache) = assets {
            let reclaimed = cache.activate()?;
            if reclaimed > 0 {
                log::info!("reclaimed {reclaimed} entries from old asset caches");
            }
        }

        let dispatcher = Dispatcher::hydrate(store, notifier, settings.tolerance_ms);
        let rollover = RolloverTimer::arm(clock.now(), settings.rollover_grace);
        Ok(Self {
            dispatcher,
            views: Broadcaster::new(),
            rollover,
            clock,
            heartbeat: settings.heartbeat,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one envelope. Returns `false` when the loop should stop.
    pub fn handle(&mut self, envelope: Envelope) -> bool {
        match envelope {
            Envelope::Message(ToBackground::SetAlarms { alarms }) => {
                self.dispatcher.merge(alarms);
                true
            }
            Envelope::Connect(view) => {
                self.views.add(view);
                log::debug!("{} foreground view(s) connected", self.views.len());
                true
            }
            Envelope::Shutdown => false,
        }
    }

    /// One heartbeat scan.
    pub fn heartbeat(&mut self) -> Vec<PrayerType> {
        let now = self.clock.now_millis();
        self.dispatcher.tick(now)
    }

    /// Tell every view to recompute if the day has turned over. Returns
    /// whether the rollover fired.
    pub fn check_rollover(&mut self) -> bool {
        if !self.rollover.poll(self.clock.now()) {
            return false;
        }
        let reached = self.views.broadcast(ToForeground::RefreshSchedule);
        log::info!("day rolled over, asked {reached} view(s) to refresh");
        true
    }

    fn until_rollover(&self) -> Duration {
        (self.rollover.deadline() - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Run the loop on the current thread until shutdown or until every
    /// sender is gone.
    pub fn run(mut self, rx: Receiver<Envelope>) {
        let mut next_heartbeat = Instant::now() + self.heartbeat;
        loop {
            // Re-read both deadlines each time round; a suspension may have
            // eaten part of either wait.
            let wait = next_heartbeat
                .saturating_duration_since(Instant::now())
                .min(self.until_rollover());

            match rx.recv_timeout(wait) {
                Ok(envelope) => {
                    if !self.handle(envelope) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if Instant::now() >= next_heartbeat {
                self.heartbeat();
                next_heartbeat = Instant::now() + self.heartbeat;
            }
            self.check_rollover();
        }
        log::info!("background context stopped");
    }

    pub fn spawn(self) -> Result<BackgroundHandle> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("waqt-background".to_string())
            .spawn(move || self.run(rx))?;
        Ok(BackgroundHandle { tx, join })
    }
}

pub struct BackgroundHandle {
    tx: Sender<Envelope>,
    join: JoinHandle<()>,
}

impl BackgroundHandle {
    pub fn connect(&self) -> Result<ForegroundLink> {
        ForegroundLink::connect(self.tx.clone())
    }

    /// Stop the loop and wait for it. Every save has finished by the time
    /// this returns.
    pub fn shutdown(self) -> Result<()> {
        let _ = self.tx.send(Envelope::Shutdown);
        self.join
            .join()
            .map_err(|_| anyhow::anyhow!("background thread panicked"))
    }
}
