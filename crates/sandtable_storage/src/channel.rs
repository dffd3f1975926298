//! Event/message channels: FIFO broadcast with per-reader cursors.
//!
//! Each channel token owns one queue of `(payload, id, creation tick)`
//! items with monotonically increasing ids. Readers carry an independent
//! cursor, so every item reaches every reader exactly once. Items expire at
//! tick finalization once two ticks old — an item is visible for its
//! creation tick plus exactly one following tick, whether or not anyone read
//! it. A consumer polling less than once every two ticks will silently miss
//! items.

use std::any::Any;
use std::collections::{HashMap, VecDeque};

use sandtable_foundation::{Channel, TokenId};

use crate::world::World;

/// Number of ticks an item is retained, counting its creation tick.
pub const RETENTION_TICKS: u64 = 2;

struct ChannelItem<T> {
    payload: T,
    id: u64,
    tick: u64,
}

/// FIFO queue for one channel token.
pub struct ChannelQueue<T> {
    items: VecDeque<ChannelItem<T>>,
    next_id: u64,
}

impl<T> ChannelQueue<T> {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Appends a payload stamped with the current tick.
    pub fn send(&mut self, payload: T, tick: u64) {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(ChannelItem { payload, id, tick });
    }

    /// Returns the number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The id a fresh reader starts at: the oldest retained item's id, or
    /// the next id to be issued when the queue is empty.
    #[must_use]
    pub fn oldest_retained_id(&self) -> u64 {
        self.items.front().map_or(self.next_id, |item| item.id)
    }

    /// The id one past the newest retained item.
    #[must_use]
    pub fn frontier_id(&self) -> u64 {
        self.next_id
    }

    fn read_from(&self, cursor: u64) -> (Vec<&T>, Option<u64>) {
        let mut out = Vec::new();
        let mut max_id = None;
        for item in &self.items {
            if item.id >= cursor {
                out.push(&item.payload);
                max_id = Some(item.id);
            }
        }
        (out, max_id)
    }

    fn expire(&mut self, now: u64) {
        while let Some(front) = self.items.front() {
            if now - front.tick >= RETENTION_TICKS {
                self.items.pop_front();
            } else {
                break;
            }
        }
    }
}

trait AnyQueue {
    fn expire(&mut self, now: u64);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AnyQueue for ChannelQueue<T> {
    fn expire(&mut self, now: u64) {
        ChannelQueue::expire(self, now);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every channel queue in a world, keyed by channel token.
#[derive(Default)]
pub struct ChannelStore {
    queues: HashMap<TokenId, Box<dyn AnyQueue>>,
}

impl ChannelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the queue for a freshly minted channel token.
    pub fn open<T: 'static>(&mut self, token: TokenId) {
        self.queues
            .entry(token)
            .or_insert_with(|| Box::new(ChannelQueue::<T>::new()));
    }

    /// Returns the typed queue for a channel token.
    #[must_use]
    pub fn queue<T: 'static>(&self, token: TokenId) -> Option<&ChannelQueue<T>> {
        self.queues.get(&token)?.as_any().downcast_ref()
    }

    /// Returns the typed queue for a channel token, mutably.
    pub fn queue_mut<T: 'static>(&mut self, token: TokenId) -> Option<&mut ChannelQueue<T>> {
        self.queues.get_mut(&token)?.as_any_mut().downcast_mut()
    }

    /// Drops expired items from every queue. Called at tick finalization,
    /// after the tick counter has advanced.
    pub fn expire_all(&mut self, now: u64) {
        for queue in self.queues.values_mut() {
            queue.expire(now);
        }
    }
}

// =============================================================================
// Reader / Writer handles
// =============================================================================

/// Reading end of a channel with an independent cursor.
///
/// Construction captures the oldest currently retained id, so a reader
/// created after items were sent still observes everything retained.
pub struct Reader<T: 'static> {
    channel: Channel<T>,
    cursor: u64,
}

impl<T: 'static> Reader<T> {
    pub(crate) fn new(channel: Channel<T>, cursor: u64) -> Self {
        Self { channel, cursor }
    }

    /// Returns every unread retained item in send order and advances the
    /// cursor past the newest returned item. An empty read leaves the cursor
    /// unchanged.
    pub fn read<'w>(&mut self, world: &'w World) -> Vec<&'w T> {
        let Some(queue) = world.channels().queue::<T>(self.channel.id()) else {
            return Vec::new();
        };
        let (items, max_id) = queue.read_from(self.cursor);
        if let Some(max_id) = max_id {
            self.cursor = max_id + 1;
        }
        items
    }

    /// Returns true if a `read` would return at least one item.
    #[must_use]
    pub fn has_unread(&self, world: &World) -> bool {
        world
            .channels()
            .queue::<T>(self.channel.id())
            .is_some_and(|queue| queue.frontier_id() > self.cursor && !queue.is_empty())
    }

    /// Returns the number of retained items in the channel, read or not.
    #[must_use]
    pub fn len(&self, world: &World) -> usize {
        world
            .channels()
            .queue::<T>(self.channel.id())
            .map_or(0, ChannelQueue::len)
    }

    /// Returns true if the channel retains no items.
    #[must_use]
    pub fn is_empty(&self, world: &World) -> bool {
        self.len(world) == 0
    }

    /// Rewinds the cursor to the oldest retained id, re-exposing every
    /// currently retained item.
    pub fn reset(&mut self, world: &World) {
        if let Some(queue) = world.channels().queue::<T>(self.channel.id()) {
            self.cursor = queue.oldest_retained_id();
        }
    }
}

/// Writing end of a channel.
pub struct Writer<T: 'static> {
    channel: Channel<T>,
}

impl<T: 'static> Writer<T> {
    pub(crate) fn new(channel: Channel<T>) -> Self {
        Self { channel }
    }

    /// Appends a payload to the channel.
    pub fn send(&self, world: &mut World, payload: T) {
        world.send(self.channel, payload);
    }

    /// Alias for [`Writer::send`], for message-flavored call sites.
    pub fn write(&self, world: &mut World, payload: T) {
        self.send(world, payload);
    }
}
