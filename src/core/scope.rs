//! Structured fields and the per-request scope overlay
//!
//! This module provides:
//! - `Fields`: insertion-ordered key/value fields of one event
//! - `CurrentScope`: thread-local fields merged into every event of a request
//! - `ScopeGuard`: RAII guard that clears the current scope when dropped

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;

/// Ordered mapping of field names to JSON values
///
/// Keys keep the position of their first insertion; writing an existing key
/// replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields {
    fields: Map<String, Value>,
}

impl Fields {
    /// Create a new empty field set
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field (builder version)
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add or replace a field
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Merge `other` on top of these fields; its values win on conflicts.
    pub fn merge(&mut self, other: Fields) {
        for (key, value) in other.fields {
            self.fields.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Object(fields.fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{}", formatted)
    }
}

thread_local! {
    static CURRENT_SCOPE: RefCell<Fields> = RefCell::new(Fields::new());
}

/// Per-thread field overlay for the request currently being processed
///
/// Every thread owns its own overlay, so concurrent requests on different
/// workers never see each other's fields. One thread must process one
/// request at a time.
///
/// # Example
///
/// ```
/// use stasher::core::CurrentScope;
///
/// CurrentScope::set("user_id", 42);
/// assert_eq!(CurrentScope::get("user_id"), Some(serde_json::json!(42)));
///
/// CurrentScope::clear();
/// assert!(CurrentScope::fields().is_empty());
/// ```
pub struct CurrentScope;

impl CurrentScope {
    /// Snapshot of the current overlay
    pub fn fields() -> Fields {
        CURRENT_SCOPE.with(|scope| scope.borrow().clone())
    }

    /// Replace the whole overlay
    pub fn set_fields(fields: Fields) {
        CURRENT_SCOPE.with(|scope| *scope.borrow_mut() = fields);
    }

    pub fn set<K, V>(key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        CURRENT_SCOPE.with(|scope| scope.borrow_mut().insert(key, value));
    }

    pub fn get(key: &str) -> Option<Value> {
        CURRENT_SCOPE.with(|scope| scope.borrow().get(key).cloned())
    }

    pub fn remove(key: &str) -> Option<Value> {
        CURRENT_SCOPE.with(|scope| scope.borrow_mut().remove(key))
    }

    /// Reset the overlay to empty
    pub fn clear() {
        CURRENT_SCOPE.with(|scope| scope.borrow_mut().clear());
    }

    /// Run `f` with mutable access to the overlay
    ///
    /// The overlay is moved out while `f` runs, so `f` may log or touch
    /// `CurrentScope` itself. Nested reads see an empty overlay; nested
    /// writes are merged over the edited fields afterwards.
    pub fn with_mut<R>(f: impl FnOnce(&mut Fields) -> R) -> R {
        let mut fields = CURRENT_SCOPE.with(|scope| std::mem::take(&mut *scope.borrow_mut()));
        let result = f(&mut fields);
        CURRENT_SCOPE.with(|scope| {
            let mut scope = scope.borrow_mut();
            let nested = std::mem::replace(&mut *scope, fields);
            scope.merge(nested);
        });
        result
    }

    /// Start a new unit of work: clears the overlay now and again when the
    /// returned guard is dropped.
    #[must_use = "the scope is cleared as soon as the guard is dropped"]
    pub fn enter() -> ScopeGuard {
        Self::clear();
        ScopeGuard::new()
    }
}

/// RAII guard for one unit of work
///
/// When dropped (including during unwinding) the current thread's scope is
/// cleared so nothing leaks into the next request handled by this thread.
///
/// # Example
///
/// ```
/// use stasher::core::CurrentScope;
///
/// {
///     let _guard = CurrentScope::enter();
///     CurrentScope::set("request_id", "abc-123");
/// }
/// assert!(CurrentScope::fields().is_empty());
/// ```
pub struct ScopeGuard {
    // !Send: the guard must be dropped on the thread whose scope it owns.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ScopeGuard {
    pub(crate) fn new() -> Self {
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        CurrentScope::clear();
    }
}
