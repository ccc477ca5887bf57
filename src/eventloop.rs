//! Event loop support

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use crate::errors::{ErrorCode, NetError};

struct Registry<E> {
    next_id: u32,
    subscribers: Vec<(u32, Arc<dyn Fn(&E) + Send + Sync>)>,
}

/// A typed event loop connecting the network stack driver to the program.
///
/// Handlers registered through [`EventLoop::subscribe`] are invoked from the
/// execution context of whoever calls [`EventLoop::post`]; for a real stack
/// that is its internal processing context, never the program's main thread.
/// Handlers must therefore not block; updating state, notifying a waiter and
/// logging is the intended extent of their work.
pub struct EventLoop<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for EventLoop<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<E> Default for EventLoop<E>
where
    E: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventLoop<E>
where
    E: 'static,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Registers `callback` for every event posted on this loop.
    ///
    /// The registration lives until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription<E>, NetError>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap();

        let id = registry.next_id;
        registry.next_id = registry.next_id.wrapping_add(1);
        registry.subscribers.push((id, Arc::new(callback)));

        Ok(Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        })
    }

    /// Posts `event` to every live subscriber, from the caller's context.
    ///
    /// The subscriber snapshot is taken before the first invocation, so
    /// handlers may subscribe or drop subscriptions themselves.
    pub fn post(&self, event: &E) {
        let callbacks = {
            let registry = self.registry.lock().unwrap();
            registry
                .subscribers
                .iter()
                .map(|(_, callback)| callback.clone())
                .collect::<Vec<_>>()
        };

        for callback in callbacks {
            callback(event);
        }
    }
}

/// An owned event registration; dropping it deregisters the handler.
pub struct Subscription<E> {
    registry: Weak<Mutex<Registry<E>>>,
    id: u32,
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap();
            registry.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

struct Waitable {
    generation: Mutex<u64>,
    cvar: Condvar,
}

/// Blocks the calling thread until a state condition is met.
///
/// Holds an internal subscription that bumps a generation counter and
/// notifies a condvar on every posted event; the wakeup itself is
/// unconditional and carries no verdict about the event. The condition is
/// what the `matcher` closure says it is, most often a view of some status
/// a different subscription maintains.
pub struct Wait<E> {
    waitable: Arc<Waitable>,
    _subscription: Subscription<E>,
}

impl<E> Wait<E>
where
    E: 'static,
{
    pub fn new(event_loop: &EventLoop<E>) -> Result<Self, NetError> {
        let waitable = Arc::new(Waitable {
            generation: Mutex::new(0),
            cvar: Condvar::new(),
        });

        let notifier = waitable.clone();
        let subscription = event_loop.subscribe(move |_| {
            let mut generation = notifier.generation.lock().unwrap();
            *generation += 1;
            notifier.cvar.notify_all();
        })?;

        Ok(Self {
            waitable,
            _subscription: subscription,
        })
    }

    /// Performs a blocking wait until `matcher` returns `false`.
    ///
    /// The condition is evaluated once upfront and then re-evaluated each
    /// time an event is posted on the loop; there is no busy-looping in
    /// between. With a `timeout`, `ETIMEDOUT` is returned if the deadline
    /// passes with the condition still holding; with `None` the wait is
    /// unbounded.
    pub fn wait_while<F>(&self, matcher: F, timeout: Option<Duration>) -> Result<(), NetError>
    where
        F: Fn() -> Result<bool, NetError>,
    {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        let mut generation = self.waitable.generation.lock().unwrap();

        loop {
            if !matcher()? {
                return Ok(());
            }

            generation = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ErrorCode::TimedOut.into());
                    }

                    self.waitable
                        .cvar
                        .wait_timeout(generation, deadline - now)
                        .unwrap()
                        .0
                }
                None => self.waitable.cvar.wait(generation).unwrap(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn post_reaches_every_subscriber() {
        let event_loop: EventLoop<u32> = EventLoop::new();

        let seen = Arc::new(AtomicUsize::new(0));
        let (first, second) = (seen.clone(), seen.clone());

        let _a = event_loop
            .subscribe(move |event| {
                first.fetch_add(*event as usize, Ordering::SeqCst);
            })
            .unwrap();
        let _b = event_loop
            .subscribe(move |event| {
                second.fetch_add(*event as usize, Ordering::SeqCst);
            })
            .unwrap();

        event_loop.post(&3);

        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let event_loop: EventLoop<u32> = EventLoop::new();

        let seen = Arc::new(AtomicUsize::new(0));
        let sink = seen.clone();

        let subscription = event_loop
            .subscribe(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        event_loop.post(&0);
        drop(subscription);
        event_loop.post(&0);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wait_is_released_by_an_event() {
        let event_loop: EventLoop<u32> = EventLoop::new();
        let wait = Wait::new(&event_loop).unwrap();

        let done = Arc::new(Mutex::new(false));
        let flag = done.clone();
        let poster = event_loop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            *flag.lock().unwrap() = true;
            poster.post(&0);
        });

        wait.wait_while(|| Ok(!*done.lock().unwrap()), Some(Duration::from_secs(5)))
            .unwrap();
    }

    #[test]
    fn wait_times_out_when_nothing_is_posted() {
        let event_loop: EventLoop<u32> = EventLoop::new();
        let wait = Wait::new(&event_loop).unwrap();

        let err = wait
            .wait_while(|| Ok(true), Some(Duration::from_millis(30)))
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorCode::TimedOut));
    }
}
