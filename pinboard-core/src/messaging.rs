//! Inter-task message queues
//!
//! Fixed-capacity FIFO queues that can live in a `static` and be fed from
//! interrupt handlers. Every operation runs inside a critical section, so
//! a handler can `send` while a task is in the middle of `receive`.
//!
//! ```ignore
//! static EVENTS: TaskQueue<PinEvent, 8> = TaskQueue::new(1);
//!
//! fn on_edge(ctx: IsrContext) {
//!     let _ = EVENTS.send(PinEvent::from(ctx));
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

/// Queue operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// No free slot for the item
    Full,
    /// No item waiting
    Empty,
}

/// Bounded message queue shared between tasks and interrupt handlers
pub struct TaskQueue<T, const N: usize> {
    /// Identifier for diagnostics
    id: u8,
    items: Mutex<CriticalSectionRawMutex, RefCell<Deque<T, N>>>,
}

impl<T, const N: usize> TaskQueue<T, N> {
    /// Create an empty queue
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            items: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Queue identifier
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Total number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append an item at the back
    ///
    /// Returns `QueueError::Full` if no slot is free; the item is dropped.
    pub fn send(&self, item: T) -> Result<(), QueueError> {
        self.items
            .lock(|q| q.borrow_mut().push_back(item).map_err(|_| QueueError::Full))
    }

    /// Insert an item at the front, ahead of everything waiting
    pub fn send_to_front(&self, item: T) -> Result<(), QueueError> {
        self.items
            .lock(|q| q.borrow_mut().push_front(item).map_err(|_| QueueError::Full))
    }

    /// Take the oldest item
    pub fn receive(&self) -> Result<T, QueueError> {
        self.items
            .lock(|q| q.borrow_mut().pop_front().ok_or(QueueError::Empty))
    }

    /// Number of items waiting
    pub fn len(&self) -> usize {
        self.items.lock(|q| q.borrow().len())
    }

    /// Number of free slots
    pub fn free(&self) -> usize {
        N - self.len()
    }

    /// Check if no item is waiting
    pub fn is_empty(&self) -> bool {
        self.items.lock(|q| q.borrow().is_empty())
    }

    /// Check if every slot is taken
    pub fn is_full(&self) -> bool {
        self.items.lock(|q| q.borrow().is_full())
    }

    /// Drop every waiting item
    pub fn clear(&self) {
        self.items.lock(|q| q.borrow_mut().clear())
    }
}

impl<T: Clone, const N: usize> TaskQueue<T, N> {
    /// Copy the oldest item without removing it
    pub fn peek(&self) -> Result<T, QueueError> {
        self.items
            .lock(|q| q.borrow().front().cloned().ok_or(QueueError::Empty))
    }
}
