//! Single-slot toast channel: newest message wins, each expires on its own timer

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::state::spawn::{notify_all, sleep, ListenerId, Listeners, Spawner};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    pub fn color_class(&self) -> &str {
        match self {
            ToastKind::Success => "bg-green-500",
            ToastKind::Error => "bg-red-500",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            ToastKind::Success => "\u{2705}",
            ToastKind::Error => "\u{274C}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct ChannelState {
    current: Option<Toast>,
    generation: u64,
    listeners: Listeners,
}

#[derive(Clone)]
pub struct NotificationChannel {
    state: Rc<RefCell<ChannelState>>,
    spawner: Rc<dyn Spawner>,
    duration: Duration,
}

impl NotificationChannel {
    pub fn new(duration: Duration, spawner: Rc<dyn Spawner>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ChannelState::default())),
            spawner,
            duration,
        }
    }

    /// Replace whatever is showing and schedule this message's expiry. Timers
    /// of replaced messages become no-ops.
    pub fn push(&self, kind: ToastKind, text: impl Into<String>) {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.current = Some(Toast {
                kind,
                text: text.into(),
                created_at: Utc::now(),
            });
            state.generation
        };

        let state = Rc::downgrade(&self.state);
        let duration = self.duration;
        self.spawner.spawn(Box::pin(async move {
            sleep(duration).await;
            if let Some(state) = state.upgrade() {
                expire(&state, generation);
            }
        }));

        self.notify();
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(ToastKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(ToastKind::Error, text);
    }

    pub fn current(&self) -> Option<Toast> {
        self.state.borrow().current.clone()
    }

    pub fn dismiss(&self) {
        let had_toast = self.state.borrow_mut().current.take().is_some();
        if had_toast {
            self.notify();
        }
    }

    pub fn subscribe(&self, callback: Rc<dyn Fn()>) -> ListenerId {
        self.state.borrow_mut().listeners.add(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }

    fn notify(&self) {
        let callbacks = self.state.borrow().listeners.snapshot();
        notify_all(callbacks);
    }
}

fn expire(state: &RefCell<ChannelState>, generation: u64) {
    let callbacks = {
        let mut state = state.borrow_mut();
        if state.generation != generation || state.current.is_none() {
            return;
        }
        state.current = None;
        state.listeners.snapshot()
    };
    notify_all(callbacks);
}
