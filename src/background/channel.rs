//! Messages between foreground views and the background context.
//!
//! The two wire messages serialize as
//! `{"kind":"SET_ALARMS","alarms":[{"name":"Fajr","time":1700000000000}]}` and
//! `{"kind":"REFRESH_SCHEDULE"}`. In process they travel over `mpsc` channels
//! wrapped in an [`Envelope`], which also carries the connect/shutdown
//! control messages that have no wire form.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::models::Alarm;

/// Foreground → background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToBackground {
    SetAlarms { alarms: Vec<Alarm> },
}

/// Background → every connected foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToForeground {
    RefreshSchedule,
}

#[derive(Debug)]
pub enum Envelope {
    Message(ToBackground),
    Connect(Sender<ToForeground>),
    Shutdown,
}

/// Fan-out to all connected foreground views. Views that went away are
/// pruned on the next broadcast.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: Vec<Sender<ToForeground>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscriber: Sender<ToForeground>) {
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns how many views received the message.
    pub fn broadcast(&mut self, message: ToForeground) -> usize {
        self.subscribers.retain(|tx| tx.send(message).is_ok());
        self.subscribers.len()
    }
}

/// A foreground view's end of the channel.
pub struct ForegroundLink {
    to_background: Sender<Envelope>,
    from_background: Receiver<ToForeground>,
}

impl ForegroundLink {
    /// Register a new view with the background context behind `to_background`.
    pub fn connect(to_background: Sender<Envelope>) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        to_background
            .send(Envelope::Connect(tx))
            .map_err(|_| anyhow::anyhow!("background context is not running"))?;
        Ok(Self {
            to_background,
            from_background: rx,
        })
    }

    pub fn post(&self, message: ToBackground) -> anyhow::Result<()> {
        self.to_background
            .send(Envelope::Message(message))
            .map_err(|_| anyhow::anyhow!("background context is not running"))
    }

    /// Drain pending notices without blocking. Returns `true` if at least one
    /// refresh was requested.
    pub fn refresh_requested(&self) -> bool {
        let mut requested = false;
        loop {
            match self.from_background.try_recv() {
                Ok(ToForeground::RefreshSchedule) => requested = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        requested
    }
}
