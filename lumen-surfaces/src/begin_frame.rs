//! Begin-frame pacing: the signal that tells frame sinks when to produce
//! their next frame.
//!
//! A [`BeginFrameSource`] fans its ticks out to registered
//! [`BeginFrameObserver`]s. The registry routes one source down each
//! frame-sink subtree; routing identity is `Rc` pointer identity, so two
//! handles to the same source always compare equal for that purpose.
//!
//! Nothing in this module owns a timer. [`ManualBeginFrameSource`] is
//! driven by explicit `tick` calls from whatever schedules the display; the
//! subsystem itself never blocks or waits.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// The default frame interval, a 60 Hz vsync.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// One begin-frame tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeginFrameArgs {
    /// When the frame nominally begins.
    pub frame_time: Instant,
    /// Expected interval until the next tick.
    pub interval: Duration,
    /// Strictly increasing per source.
    pub sequence_number: u64,
}

/// Receives begin-frame ticks from a source.
pub trait BeginFrameObserver {
    /// Called once per tick of the source the observer is attached to.
    fn on_begin_frame(&mut self, args: BeginFrameArgs);
}

/// A pacing signal generator.
///
/// Sources are registered with the surface manager, which propagates them
/// down the frame-sink hierarchy; clients attach themselves as observers to
/// whatever source they are handed.
pub trait BeginFrameSource {
    /// Attaches an observer. Attaching the same observer twice is a no-op.
    fn add_observer(&mut self, observer: Rc<RefCell<dyn BeginFrameObserver>>);
    /// Detaches an observer previously attached. Unknown observers are
    /// ignored.
    fn remove_observer(&mut self, observer: &Rc<RefCell<dyn BeginFrameObserver>>);
}

/// Shared handle to a begin-frame source. Pointer identity of the handle is
/// the source's identity for hierarchy routing.
pub type BeginFrameSourceHandle = Rc<RefCell<dyn BeginFrameSource>>;

/// A source ticked explicitly by its owner.
///
/// The display drives one of these from its scheduling loop; tests drive it
/// directly.
pub struct ManualBeginFrameSource {
    observers: Vec<Rc<RefCell<dyn BeginFrameObserver>>>,
    interval: Duration,
    next_sequence_number: u64,
}

impl ManualBeginFrameSource {
    /// Creates a source with the default frame interval.
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_FRAME_INTERVAL)
    }

    /// Creates a source announcing the given interval in its args.
    pub fn with_interval(interval: Duration) -> Self {
        ManualBeginFrameSource {
            observers: Vec::new(),
            interval,
            next_sequence_number: 1,
        }
    }

    /// Number of currently attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Issues one tick to every attached observer and returns the args that
    /// were delivered.
    pub fn tick(&mut self, frame_time: Instant) -> BeginFrameArgs {
        let args = BeginFrameArgs {
            frame_time,
            interval: self.interval,
            sequence_number: self.next_sequence_number,
        };
        self.next_sequence_number += 1;

        // Observers may detach during dispatch; iterate over a snapshot.
        let observers = self.observers.clone();
        for observer in observers {
            observer.borrow_mut().on_begin_frame(args);
        }
        args
    }
}

impl Default for ManualBeginFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BeginFrameSource for ManualBeginFrameSource {
    fn add_observer(&mut self, observer: Rc<RefCell<dyn BeginFrameObserver>>) {
        if !self.observers.iter().any(|o| Rc::ptr_eq(o, &observer)) {
            self.observers.push(observer);
        }
    }

    fn remove_observer(&mut self, observer: &Rc<RefCell<dyn BeginFrameObserver>>) {
        self.observers.retain(|o| !Rc::ptr_eq(o, observer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingObserver {
        ticks: Vec<u64>,
    }

    impl BeginFrameObserver for CountingObserver {
        fn on_begin_frame(&mut self, args: BeginFrameArgs) {
            self.ticks.push(args.sequence_number);
        }
    }

    #[test]
    fn test_tick_reaches_every_observer_with_increasing_sequence() {
        let mut source = ManualBeginFrameSource::new();
        let a = Rc::new(RefCell::new(CountingObserver { ticks: Vec::new() }));
        let b = Rc::new(RefCell::new(CountingObserver { ticks: Vec::new() }));
        source.add_observer(a.clone());
        source.add_observer(b.clone());

        source.tick(Instant::now());
        source.tick(Instant::now());

        assert_eq!(a.borrow().ticks, vec![1, 2]);
        assert_eq!(b.borrow().ticks, vec![1, 2]);
    }

    #[test]
    fn test_double_add_is_single_subscription() {
        let mut source = ManualBeginFrameSource::new();
        let observer = Rc::new(RefCell::new(CountingObserver { ticks: Vec::new() }));
        source.add_observer(observer.clone());
        source.add_observer(observer.clone());
        assert_eq!(source.observer_count(), 1);

        source.tick(Instant::now());
        assert_eq!(observer.borrow().ticks.len(), 1);
    }

    #[test]
    fn test_removed_observer_receives_nothing() {
        let mut source = ManualBeginFrameSource::new();
        let observer = Rc::new(RefCell::new(CountingObserver { ticks: Vec::new() }));
        source.add_observer(observer.clone());
        let handle: Rc<RefCell<dyn BeginFrameObserver>> = observer.clone();
        source.remove_observer(&handle);

        source.tick(Instant::now());
        assert!(observer.borrow().ticks.is_empty());
    }
}
