//! Plain (non-queue) context containers.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::context::{downcast, Context, ContextKind, ContextRef};
use crate::error::{Result, ScopeError};

/// Key under which [`NestedContext`] exposes its enclosing context.
pub const PARENT_KEY: &str = "_";

/// Ordered list of values.
#[derive(Debug, Default)]
pub struct ListContext {
    items: Mutex<Vec<Value>>,
}

impl ListContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn push(&self, value: Value) {
        self.items.lock().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.items.lock().pop()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.lock().get(index).cloned()
    }

    /// Run `f` with exclusive access to the items.
    pub fn with_items<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.items.lock())
    }
}

impl Context for ListContext {
    fn kind(&self) -> ContextKind {
        ContextKind::List
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn clear(&self) {
        self.items.lock().clear();
    }

    fn snapshot(&self) -> Value {
        Value::Array(self.items.lock().clone())
    }
}

/// String-keyed mapping.
#[derive(Debug, Default)]
pub struct MapContext {
    entries: Mutex<Map<String, Value>>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.lock().insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Run `f` with exclusive access to the entries.
    pub fn with_entries<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.entries.lock())
    }
}

impl Context for MapContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Mapping
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn snapshot(&self) -> Value {
        Value::Object(self.entries.lock().clone())
    }
}

/// A value read out of a [`NestedContext`].
#[derive(Debug, Clone)]
pub enum Slot {
    Value(Value),
    /// The enclosing context, stored under [`PARENT_KEY`].
    Context(ContextRef),
}

/// Mapping linked to the context it was forked from.
///
/// This is the default container. The parent is bound once, when the
/// context is created beneath a supercontext, and is readable under `"_"`.
#[derive(Debug, Default)]
pub struct NestedContext {
    entries: Mutex<Map<String, Value>>,
    parent: OnceLock<ContextRef>,
}

impl NestedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(mut entries: Map<String, Value>) -> Self {
        entries.remove(PARENT_KEY);
        Self {
            entries: Mutex::new(entries),
            parent: OnceLock::new(),
        }
    }

    pub fn parent(&self) -> Option<ContextRef> {
        self.parent.get().cloned()
    }

    pub fn get(&self, key: &str) -> Option<Slot> {
        if key == PARENT_KEY {
            return self.parent().map(Slot::Context);
        }
        self.entries.lock().get(key).cloned().map(Slot::Value)
    }

    /// Store a value. `"_"` cannot be overwritten.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let key = key.into();
        if key == PARENT_KEY {
            return Err(ScopeError::ReservedKey(key));
        }
        Ok(self.entries.lock().insert(key, value))
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().remove(key)
    }

    /// Look `key` up here, then in each enclosing nested context.
    pub fn resolve(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.entries.lock().get(key) {
            return Some(value.clone());
        }
        let parent = self.parent()?;
        downcast::<NestedContext>(&parent)?.resolve(key)
    }
}

impl Context for NestedContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Nested
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn snapshot(&self) -> Value {
        let mut map = self.entries.lock().clone();
        if let Some(parent) = self.parent.get() {
            map.insert(PARENT_KEY.to_string(), parent.snapshot());
        }
        Value::Object(map)
    }

    fn bind_supercontext(&self, supercontext: &ContextRef) {
        let _ = self.parent.set(Arc::clone(supercontext));
    }
}

#[derive(Debug, Default)]
struct TextState {
    chars: Vec<char>,
    pos: usize,
}

/// In-memory text stream with a cursor.
///
/// Writing past the end extends the text; writing inside it overwrites.
#[derive(Debug, Default)]
pub struct StringBufferContext {
    state: Mutex<TextState>,
}

impl StringBufferContext {
    pub fn new(initial: &str) -> Self {
        Self {
            state: Mutex::new(TextState {
                chars: initial.chars().collect(),
                pos: 0,
            }),
        }
    }

    /// Write `text` at the cursor and advance past it.
    pub fn write(&self, text: &str) -> usize {
        let mut state = self.state.lock();
        let pos = state.pos;
        if state.chars.len() < pos {
            state.chars.resize(pos, '\0');
        }
        let mut written = 0;
        for ch in text.chars() {
            let pos = state.pos;
            if pos < state.chars.len() {
                state.chars[pos] = ch;
            } else {
                state.chars.push(ch);
            }
            state.pos += 1;
            written += 1;
        }
        written
    }

    /// Read up to `count` characters, or everything left when `None`.
    pub fn read(&self, count: Option<usize>) -> String {
        let mut state = self.state.lock();
        let start = state.pos.min(state.chars.len());
        let end = match count {
            Some(count) => (start + count).min(state.chars.len()),
            None => state.chars.len(),
        };
        if start == end {
            return String::new();
        }
        state.pos = end;
        state.chars[start..end].iter().collect()
    }

    /// Move the cursor. Positions past the end are allowed; the gap is
    /// filled with NULs on the next write.
    pub fn seek(&self, pos: usize) {
        self.state.lock().pos = pos;
    }

    pub fn tell(&self) -> usize {
        self.state.lock().pos
    }

    /// The whole text regardless of cursor position.
    pub fn value(&self) -> String {
        self.state.lock().chars.iter().collect()
    }
}

impl Context for StringBufferContext {
    fn kind(&self) -> ContextKind {
        ContextKind::StringBuffer
    }

    fn len(&self) -> usize {
        self.state.lock().chars.len()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.chars.clear();
        state.pos = 0;
    }

    fn snapshot(&self) -> Value {
        Value::String(self.value())
    }
}
