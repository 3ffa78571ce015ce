//! Typed simulation events with pre-allocated ring buffers.
//!
//! Phases emit events as they run; the bookkeeping phase delivers them in
//! batch to registered listeners. Each event kind gets its own
//! [`EventBuffer`] ring, allocated lazily on first emit.
//!
//! Listeners are read-only observers (UI, audio, tests). Kinds can be
//! suppressed via [`EventBus::suppress`], after which emits of that kind
//! cost nothing and allocate nothing.

use crate::building::BuildingKind;
use crate::fixed::Ticks;
use crate::id::{BuildingId, NodeId, SegmentId};
use crate::resource::ResourceKind;

/// Default ring capacity per event kind.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Where a dropped unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSource {
    /// A miner extracted into an output slot that would not take the unit.
    MinerOverflow { building: BuildingId },
    /// A conveyor finished its run with nothing ahead to hand off to.
    TransportEnd { segment: SegmentId },
    /// Hand mining completed into a full player inventory.
    HandMining,
}

/// A simulation event. Every event carries the tick it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- World layout --
    NodeSpawned {
        node: NodeId,
        kind: ResourceKind,
        tick: Ticks,
    },
    BuildingPlaced {
        building: BuildingId,
        kind: BuildingKind,
        tick: Ticks,
    },
    BuildingBuilt {
        building: BuildingId,
        tick: Ticks,
    },
    SegmentPlaced {
        segment: SegmentId,
        tick: Ticks,
    },
    SegmentBuilt {
        segment: SegmentId,
        tick: Ticks,
    },

    // -- Production --
    ItemMined {
        building: BuildingId,
        kind: ResourceKind,
        tick: Ticks,
    },
    CycleCompleted {
        building: BuildingId,
        product: ResourceKind,
        tick: Ticks,
    },
    CycleInterrupted {
        building: BuildingId,
        tick: Ticks,
    },

    // -- Transport --
    ItemDelivered {
        segment: SegmentId,
        building: BuildingId,
        kind: ResourceKind,
        tick: Ticks,
    },
    SegmentStalled {
        segment: SegmentId,
        kind: ResourceKind,
        tick: Ticks,
    },

    // -- Player --
    PlayerMined {
        kind: ResourceKind,
        tick: Ticks,
    },
    PlayerDamaged {
        amount: u32,
        total: u32,
        tick: Ticks,
    },

    // -- Loss accounting --
    ItemDropped {
        kind: ResourceKind,
        source: DropSource,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeSpawned,
    BuildingPlaced,
    BuildingBuilt,
    SegmentPlaced,
    SegmentBuilt,
    ItemMined,
    CycleCompleted,
    CycleInterrupted,
    ItemDelivered,
    SegmentStalled,
    PlayerMined,
    PlayerDamaged,
    ItemDropped,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 13;

impl Event {
    /// The discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::NodeSpawned { .. } => EventKind::NodeSpawned,
            Event::BuildingPlaced { .. } => EventKind::BuildingPlaced,
            Event::BuildingBuilt { .. } => EventKind::BuildingBuilt,
            Event::SegmentPlaced { .. } => EventKind::SegmentPlaced,
            Event::SegmentBuilt { .. } => EventKind::SegmentBuilt,
            Event::ItemMined { .. } => EventKind::ItemMined,
            Event::CycleCompleted { .. } => EventKind::CycleCompleted,
            Event::CycleInterrupted { .. } => EventKind::CycleInterrupted,
            Event::ItemDelivered { .. } => EventKind::ItemDelivered,
            Event::SegmentStalled { .. } => EventKind::SegmentStalled,
            Event::PlayerMined { .. } => EventKind::PlayerMined,
            Event::PlayerDamaged { .. } => EventKind::PlayerDamaged,
            Event::ItemDropped { .. } => EventKind::ItemDropped,
        }
    }

    /// The tick this event occurred on.
    pub fn tick(&self) -> Ticks {
        match self {
            Event::NodeSpawned { tick, .. }
            | Event::BuildingPlaced { tick, .. }
            | Event::BuildingBuilt { tick, .. }
            | Event::SegmentPlaced { tick, .. }
            | Event::SegmentBuilt { tick, .. }
            | Event::ItemMined { tick, .. }
            | Event::CycleCompleted { tick, .. }
            | Event::CycleInterrupted { tick, .. }
            | Event::ItemDelivered { tick, .. }
            | Event::SegmentStalled { tick, .. }
            | Event::PlayerMined { tick, .. }
            | Event::PlayerDamaged { tick, .. }
            | Event::ItemDropped { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring of events. When full, the oldest entry is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position (wraps).
    head: usize,
    /// Events currently stored.
    len: usize,
    /// Lifetime count of pushes, surviving clears.
    total_written: u64,
    /// Lifetime count of entries overwritten while full.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Push an event, overwriting the oldest when full.
    pub fn push(&mut self, event: Event) {
        if self.len == self.capacity() {
            self.dropped += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Events pushed since creation, including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten before anyone saw them.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate stored events oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head is the next write slot, i.e. the oldest entry when full
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Drop stored events. Lifetime counters are kept.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over an [`EventBuffer`], oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A read-only event observer.
pub type Listener = Box<dyn FnMut(&Event)>;

/// One ring buffer per event kind, plus listeners and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<Listener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
        }
    }

    /// Suppress a kind: future emits are dropped and its buffer is freed.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for delivery. No-ops when the kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let buffer = self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(self.default_capacity));
        buffer.push(event);
    }

    /// Register a listener for one kind. Listeners run in registration order.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Deliver all buffered events to their listeners and clear the buffers.
    /// Called once per tick during bookkeeping.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            // Detach the events so listeners can't alias the buffer.
            let events: Vec<Event> = buffer.iter().cloned().collect();
            for listener in &mut self.listeners[idx] {
                for event in &events {
                    listener(event);
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    /// The buffer currently backing a kind, if any events were emitted.
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events currently awaiting delivery for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Lifetime emit count for a kind, surviving delivery.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear every buffer; listeners and suppression flags are kept.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
