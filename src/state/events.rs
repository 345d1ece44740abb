//! Side-channel events from the state layer to whatever front end is
//! attached: toast-style notices and navigation requests.
//!
//! The session controller and the view-models never render anything
//! themselves. They push [`UiEvent`]s into an [`Outbox`]; the front end drains
//! the matching [`Inbox`]. A closed inbox is not an error; events are dropped.

use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// A navigation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// In-app route change. `from` carries the location being left so a
    /// login page can send the user back after signing in.
    Soft { to: String, from: Option<String>, replace: bool },
    /// Full reload at `to`, discarding in-memory view state.
    Hard { to: String },
}

impl Navigation {
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Soft { to, .. } | Self::Hard { to } => to,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Notice(Notice),
    Navigate(Navigation),
}

/// Create a connected outbox/inbox pair.
#[must_use]
pub fn channel() -> (Outbox, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, Inbox { rx })
}

/// Sending half. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl Outbox {
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.send(UiEvent::Notice(Notice { level, message: message.into() }));
    }

    pub fn navigate(&self, navigation: Navigation) {
        self.send(UiEvent::Navigate(navigation));
    }

    fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("ui inbox closed; dropping event");
        }
    }
}

/// Receiving half, owned by the front end.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl Inbox {
    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
