//! Per-object key sets for duplicate detection.

use std::collections::HashSet;

use super::errors::{StrictJsonError, MAX_KEYS_PER_OBJECT};

/// One frame per open object, innermost last.
#[derive(Default)]
pub(crate) struct KeyScopes {
    frames: Vec<(String, HashSet<String>)>,
}

impl KeyScopes {
    pub fn open(&mut self, pointer: String) {
        self.frames.push((pointer, HashSet::new()));
    }

    /// Record a decoded member name in the innermost object.
    pub fn insert(&mut self, key: &str) -> Result<(), StrictJsonError> {
        let Some((pointer, keys)) = self.frames.last_mut() else {
            return Ok(());
        };
        if keys.len() >= MAX_KEYS_PER_OBJECT {
            return Err(StrictJsonError::TooManyKeys {
                count: keys.len() + 1,
            });
        }
        if keys.contains(key) {
            return Err(StrictJsonError::DuplicateKey {
                key: key.to_string(),
                path: if pointer.is_empty() {
                    "/".to_string()
                } else {
                    pointer.clone()
                },
            });
        }
        keys.insert(key.to_string());
        Ok(())
    }

    pub fn close(&mut self) {
        self.frames.pop();
    }
}
