//! Local task scheduling for the single-threaded view session

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Runs detached `'static` futures on the current thread's executor.
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Spawns onto the Dioxus runtime of the calling component.
#[derive(Clone, Copy, Default)]
pub struct DioxusSpawner;

impl Spawner for DioxusSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        dioxus::prelude::spawn(task);
    }
}

impl Spawner for futures::executor::LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        use futures::task::LocalSpawnExt;

        if let Err(e) = self.spawn_local(task) {
            tracing::error!("Failed to spawn local task: {}", e);
        }
    }
}

/// Spawns onto the enclosing `tokio::task::LocalSet`.
#[cfg(all(test, not(target_arch = "wasm32")))]
#[derive(Clone, Copy, Default)]
pub struct TokioLocalSpawner;

#[cfg(all(test, not(target_arch = "wasm32")))]
impl Spawner for TokioLocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

pub async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    {
        gloo_timers::future::sleep(duration).await;
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::time::sleep(duration).await;
    }
}

pub type ListenerId = u64;

/// Change callbacks registered by views.
#[derive(Default)]
pub struct Listeners {
    next_id: ListenerId,
    callbacks: Vec<(ListenerId, Rc<dyn Fn()>)>,
}

impl Listeners {
    pub fn add(&mut self, callback: Rc<dyn Fn()>) -> ListenerId {
        self.next_id += 1;
        self.callbacks.push((self.next_id, callback));
        self.next_id
    }

    pub fn remove(&mut self, id: ListenerId) {
        self.callbacks.retain(|(existing, _)| *existing != id);
    }

    /// Callbacks to invoke once the owner's borrow is released.
    pub fn snapshot(&self) -> Vec<Rc<dyn Fn()>> {
        self.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
    }
}

pub fn notify_all(callbacks: Vec<Rc<dyn Fn()>>) {
    for callback in callbacks {
        callback();
    }
}
