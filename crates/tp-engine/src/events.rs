//! Playback notifications and observer registration.
//!
//! Observers subscribe to a [`Subscription`] key. Instrument and effect
//! notifications are keyed by their instrument number or effect code, so
//! dispatch only visits the matching bucket plus the catch-all bucket.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use arrayvec::ArrayString;
use tp_ir::Effect;

/// Something that happened during playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A module passed validation and is ready to play
    ModuleReady { name: ArrayString<32>, song_length: usize },
    PlayStarted,
    PlayStopped,
    /// The song reached its end (it keeps playing from the restart position)
    SongEnded,
    /// A new row started
    RowChanged { row: u16, rows: u16 },
    /// A new order started
    OrderChanged { order: usize, song_length: usize, pattern: u8 },
    /// An instrument was triggered on a channel
    InstrumentTriggered { instrument: u8, channel: usize, note: u8, effect: Effect, param: u8 },
    /// A row carried an effect on a channel
    EffectTriggered { effect: Effect, param: u8, channel: usize, instrument: u8, note: u8 },
}

impl Notification {
    /// The bucket this notification is dispatched to.
    pub fn subscription(&self) -> Subscription {
        match *self {
            Notification::ModuleReady { .. } => Subscription::ModuleReady,
            Notification::PlayStarted => Subscription::PlayStarted,
            Notification::PlayStopped => Subscription::PlayStopped,
            Notification::SongEnded => Subscription::SongEnded,
            Notification::RowChanged { .. } => Subscription::RowChanged,
            Notification::OrderChanged { .. } => Subscription::OrderChanged,
            Notification::InstrumentTriggered { instrument, .. } => Subscription::Instrument(instrument),
            Notification::EffectTriggered { effect, .. } => Subscription::Effect(effect),
        }
    }
}

/// Subscription key: notification kind plus instrument or effect filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subscription {
    ModuleReady,
    PlayStarted,
    PlayStopped,
    SongEnded,
    RowChanged,
    OrderChanged,
    /// Instrument-triggered for one instrument number
    Instrument(u8),
    /// Effect-triggered for one effect code
    Effect(Effect),
    /// Every notification
    All,
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Observer callback.
pub type Observer = Box<dyn FnMut(&Notification) + Send>;

/// Registry of observers, keyed by subscription.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    buckets: BTreeMap<Subscription, Vec<(ObserverId, Observer)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` for `key`. Observers in a bucket run in
    /// registration order.
    pub fn subscribe<F>(&mut self, key: Subscription, observer: F) -> ObserverId
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.buckets.entry(key).or_default().push((id, Box::new(observer)));
        id
    }

    /// Remove one observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let mut emptied = None;
        let mut found = false;
        for (key, observers) in self.buckets.iter_mut() {
            if let Some(pos) = observers.iter().position(|(oid, _)| *oid == id) {
                observers.remove(pos);
                if observers.is_empty() {
                    emptied = Some(*key);
                }
                found = true;
                break;
            }
        }
        if let Some(key) = emptied {
            self.buckets.remove(&key);
        }
        found
    }

    /// Remove every observer registered for `key`.
    pub fn unsubscribe_all(&mut self, key: Subscription) {
        self.buckets.remove(&key);
    }

    /// Number of observers registered for `key`.
    pub fn observer_count(&self, key: Subscription) -> usize {
        self.buckets.get(&key).map_or(0, Vec::len)
    }

    /// Deliver a notification to its bucket, then to catch-all observers.
    pub fn dispatch(&mut self, notification: &Notification) {
        if let Some(observers) = self.buckets.get_mut(&notification.subscription()) {
            for (_, observer) in observers.iter_mut() {
                observer(notification);
            }
        }
        if let Some(observers) = self.buckets.get_mut(&Subscription::All) {
            for (_, observer) in observers.iter_mut() {
                observer(notification);
            }
        }
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<Notification>>>, impl FnMut(&Notification) + Send + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |n: &Notification| sink.lock().unwrap().push(*n))
    }

    fn instrument_hit(instrument: u8) -> Notification {
        Notification::InstrumentTriggered {
            instrument,
            channel: 0,
            note: 49,
            effect: Effect::None,
            param: 0,
        }
    }

    #[test]
    fn dispatch_reaches_only_matching_bucket() {
        let mut bus = EventBus::new();
        let (two, observer_two) = recorder();
        let (three, observer_three) = recorder();
        bus.subscribe(Subscription::Instrument(2), observer_two);
        bus.subscribe(Subscription::Instrument(3), observer_three);

        bus.dispatch(&instrument_hit(2));

        assert_eq!(two.lock().unwrap().len(), 1);
        assert!(three.lock().unwrap().is_empty());
    }

    #[test]
    fn effect_filter() {
        let mut bus = EventBus::new();
        let (log, observer) = recorder();
        bus.subscribe(Subscription::Effect(Effect::PatternBreak), observer);

        let hit = Notification::EffectTriggered {
            effect: Effect::PatternBreak,
            param: 0,
            channel: 1,
            instrument: 0,
            note: 0,
        };
        let miss = Notification::EffectTriggered {
            effect: Effect::VolumeSlide,
            param: 0,
            channel: 1,
            instrument: 0,
            note: 0,
        };
        bus.dispatch(&miss);
        bus.dispatch(&hit);

        assert_eq!(*log.lock().unwrap(), vec![hit]);
    }

    #[test]
    fn catch_all_sees_everything() {
        let mut bus = EventBus::new();
        let (log, observer) = recorder();
        bus.subscribe(Subscription::All, observer);

        bus.dispatch(&Notification::PlayStarted);
        bus.dispatch(&Notification::RowChanged { row: 1, rows: 64 });
        bus.dispatch(&instrument_hit(9));

        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn unsubscribe_removes_one_observer() {
        let mut bus = EventBus::new();
        let (first, observer_first) = recorder();
        let (second, observer_second) = recorder();
        let id = bus.subscribe(Subscription::SongEnded, observer_first);
        bus.subscribe(Subscription::SongEnded, observer_second);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.dispatch(&Notification::SongEnded);

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
        assert_eq!(bus.observer_count(Subscription::SongEnded), 1);
    }

    #[test]
    fn unsubscribe_all_clears_bucket() {
        let mut bus = EventBus::new();
        let (log, observer) = recorder();
        bus.subscribe(Subscription::RowChanged, observer);
        bus.subscribe(Subscription::RowChanged, |_| {});

        bus.unsubscribe_all(Subscription::RowChanged);
        bus.dispatch(&Notification::RowChanged { row: 0, rows: 64 });

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(bus.observer_count(Subscription::RowChanged), 0);
    }
}
