//! Navigation hub decoupling business logic from the presentation layer
//!
//! Controllers emit [`NavigationIntent`]s here; the presentation layer is the
//! single subscriber that consumes each intent exactly once. A replay buffer
//! of size 1 means a subscriber that attaches late still receives the most
//! recent intent (and only that one), so a screen coming up mid-transition
//! lands in the right place.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use parking_lot::Mutex;
use std::fmt;

/// Finite route identifiers. No screen carries sub-state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Login,
    Settings,
    Kiosk,
}

impl Screen {
    /// Stable route string, used by the remote command channel and logs.
    pub fn route(&self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::Login => "login",
            Screen::Settings => "settings",
            Screen::Kiosk => "kiosk",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

/// A single screen-transition instruction, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    Navigate {
        target: Screen,
        pop_up_to: Option<Screen>,
        inclusive: bool,
    },
    PopBackStack,
}

/// Single-subscriber broadcast hub with a replay buffer of 1.
pub struct NavRouter {
    last: Mutex<Option<NavigationIntent>>,
    subscriber: Mutex<Option<Sender<NavigationIntent>>>,
}

impl NavRouter {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
            subscriber: Mutex::new(None),
        }
    }

    /// Emit a Navigate intent.
    pub fn navigate(&self, target: Screen, pop_up_to: Option<Screen>, inclusive: bool) {
        self.emit(NavigationIntent::Navigate {
            target,
            pop_up_to,
            inclusive,
        });
    }

    /// Emit a PopBackStack intent.
    pub fn pop_back_stack(&self) {
        self.emit(NavigationIntent::PopBackStack);
    }

    /// Attach the presentation layer.
    ///
    /// Replaces any previous subscriber (single-subscriber contract). The most
    /// recent intent, if any, is replayed to the new subscriber; older intents
    /// are gone.
    pub fn subscribe(&self) -> Receiver<NavigationIntent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if let Some(last) = self.last.lock().clone() {
            let _ = tx.send(last);
        }
        *self.subscriber.lock() = Some(tx);
        rx
    }

    fn emit(&self, intent: NavigationIntent) {
        debug!("Navigation intent: {:?}", intent);
        *self.last.lock() = Some(intent.clone());
        let mut subscriber = self.subscriber.lock();
        if let Some(tx) = subscriber.as_ref() {
            if tx.send(intent).is_err() {
                // Receiver dropped; keep buffering for the next subscriber.
                *subscriber = None;
            }
        }
    }
}

impl Default for NavRouter {
    fn default() -> Self {
        Self::new()
    }
}
