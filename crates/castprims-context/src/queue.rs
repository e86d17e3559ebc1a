//! Queue contexts for producer/consumer hand-off between fields.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use crate::context::{Context, ContextKind};

/// FIFO that blocks producers while full and consumers while empty.
#[derive(Debug, Default)]
pub struct QueueContext {
    items: Mutex<VecDeque<Value>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl QueueContext {
    /// `capacity == 0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    fn full(&self, items: &VecDeque<Value>) -> bool {
        self.capacity > 0 && items.len() >= self.capacity
    }

    /// Append `value`, waiting for room if the queue is full.
    pub fn put(&self, value: Value) {
        let mut items = self.items.lock();
        while self.full(&items) {
            self.not_full.wait(&mut items);
        }
        items.push_back(value);
        self.not_empty.notify_one();
    }

    /// Append `value` only if there is room; hands it back otherwise.
    pub fn try_put(&self, value: Value) -> std::result::Result<(), Value> {
        let mut items = self.items.lock();
        if self.full(&items) {
            return Err(value);
        }
        items.push_back(value);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest value, waiting for one if the queue is empty.
    pub fn get(&self) -> Value {
        let mut items = self.items.lock();
        loop {
            if let Some(value) = items.pop_front() {
                self.not_full.notify_one();
                return value;
            }
            self.not_empty.wait(&mut items);
        }
    }

    pub fn try_get(&self) -> Option<Value> {
        let value = self.items.lock().pop_front()?;
        self.not_full.notify_one();
        Some(value)
    }
}

impl Context for QueueContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Queue
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn clear(&self) {
        self.items.lock().clear();
        self.not_full.notify_all();
    }

    fn snapshot(&self) -> Value {
        Value::Array(self.items.lock().iter().cloned().collect())
    }
}

#[cfg(feature = "async")]
mod asynchronous {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use serde_json::Value;
    use tokio::sync::Semaphore;

    use crate::context::{Context, ContextKind};
    use crate::error::{Result, ScopeError};

    /// FIFO whose `put` suspends while full and `get` while empty.
    ///
    /// Waiters resume in the order they suspended. Dropping a pending
    /// `put` or `get` future leaves the queue untouched.
    #[derive(Debug)]
    pub struct AsyncQueueContext {
        items: Mutex<VecDeque<Value>>,
        capacity: usize,
        // One permit per free slot; `None` when unbounded.
        slots: Option<Semaphore>,
        // One permit per stored item.
        filled: Semaphore,
    }

    impl AsyncQueueContext {
        /// `capacity == 0` means unbounded.
        pub fn new(capacity: usize) -> Self {
            Self {
                items: Mutex::new(VecDeque::new()),
                capacity,
                slots: (capacity > 0).then(|| Semaphore::new(capacity)),
                filled: Semaphore::new(0),
            }
        }

        pub fn capacity(&self) -> Option<usize> {
            (self.capacity > 0).then_some(self.capacity)
        }

        pub async fn put(&self, value: Value) -> Result<()> {
            if let Some(slots) = &self.slots {
                slots
                    .acquire()
                    .await
                    .map_err(|_| ScopeError::QueueClosed)?
                    .forget();
            }
            self.push(value);
            Ok(())
        }

        pub fn try_put(&self, value: Value) -> std::result::Result<(), Value> {
            if let Some(slots) = &self.slots {
                match slots.try_acquire() {
                    Ok(permit) => permit.forget(),
                    Err(_) => return Err(value),
                }
            }
            self.push(value);
            Ok(())
        }

        pub async fn get(&self) -> Result<Value> {
            self.filled
                .acquire()
                .await
                .map_err(|_| ScopeError::QueueClosed)?
                .forget();
            self.pop().ok_or(ScopeError::QueueClosed)
        }

        pub fn try_get(&self) -> Option<Value> {
            self.filled.try_acquire().ok()?.forget();
            self.pop()
        }

        /// Fail every pending and future `put`/`get` with
        /// [`ScopeError::QueueClosed`].
        pub fn close(&self) {
            if let Some(slots) = &self.slots {
                slots.close();
            }
            self.filled.close();
        }

        fn push(&self, value: Value) {
            self.items.lock().push_back(value);
            self.filled.add_permits(1);
        }

        fn pop(&self) -> Option<Value> {
            let value = self.items.lock().pop_front()?;
            if let Some(slots) = &self.slots {
                slots.add_permits(1);
            }
            Some(value)
        }
    }

    impl Context for AsyncQueueContext {
        fn kind(&self) -> ContextKind {
            ContextKind::AsyncQueue
        }

        fn len(&self) -> usize {
            self.items.lock().len()
        }

        fn clear(&self) {
            while self.try_get().is_some() {}
            if self.filled.is_closed() {
                self.items.lock().clear();
            }
        }

        fn snapshot(&self) -> Value {
            Value::Array(self.items.lock().iter().cloned().collect())
        }
    }
}

#[cfg(feature = "async")]
pub use asynchronous::AsyncQueueContext;
