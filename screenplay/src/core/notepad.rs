//! Per-actor memory for values noted down during a scenario.

use std::any::Any;
use std::collections::HashMap;

/// Typed key/value memory owned by a single actor.
#[derive(Default)]
pub struct Notepad {
    notes: HashMap<String, Box<dyn Any>>,
}

impl Notepad {
    /// Store `value` under `key`, replacing any earlier note.
    pub fn remember<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.notes.insert(key.into(), Box::new(value));
    }

    /// The note stored under `key`, if there is one of type `T`.
    pub fn recall<T: Any>(&self, key: &str) -> Option<&T> {
        self.notes.get(key)?.downcast_ref::<T>()
    }

    /// Remove and return the note under `key`.
    ///
    /// A note of a different type is left in place.
    pub fn forget<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.notes.get(key)?.is::<T>() {
            return None;
        }
        let note = self.notes.remove(key)?;
        note.downcast::<T>().ok().map(|boxed| *boxed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.notes.contains_key(key)
    }

    /// Keys of every note, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.notes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl std::fmt::Debug for Notepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notepad")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_returns_remembered_value() {
        let mut notepad = Notepad::default();
        notepad.remember("total", 42_u32);
        assert_eq!(notepad.recall::<u32>("total"), Some(&42));
    }

    #[test]
    fn recall_with_wrong_type_is_none() {
        let mut notepad = Notepad::default();
        notepad.remember("total", 42_u32);
        assert_eq!(notepad.recall::<String>("total"), None);
    }

    #[test]
    fn remember_overwrites_previous_note() {
        let mut notepad = Notepad::default();
        notepad.remember("name", "Ada".to_string());
        notepad.remember("name", "Grace".to_string());
        assert_eq!(notepad.recall::<String>("name").map(String::as_str), Some("Grace"));
        assert_eq!(notepad.len(), 1);
    }

    #[test]
    fn forget_removes_note_of_matching_type_only() {
        let mut notepad = Notepad::default();
        notepad.remember("id", 7_i64);
        assert_eq!(notepad.forget::<String>("id"), None);
        assert!(notepad.contains("id"));
        assert_eq!(notepad.forget::<i64>("id"), Some(7));
        assert!(notepad.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let mut notepad = Notepad::default();
        notepad.remember("b", 1);
        notepad.remember("a", 2);
        assert_eq!(notepad.keys(), vec!["a", "b"]);
    }
}
