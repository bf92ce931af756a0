/*!
 * Per-file priorities controlling output order
 */

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::ensure;
use crate::error::{PackError, Result};

/// Highest assignable priority
pub const MAX_PRIORITY: u8 = 5;

/// Path to priority map; paths without an entry have priority 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityStore {
    priorities: BTreeMap<String, u8>,
}

impl PriorityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted map, dropping zero and out-of-range entries
    pub fn from_map(map: BTreeMap<String, u8>) -> Self {
        let priorities = map
            .into_iter()
            .filter(|(path, priority)| {
                let valid = (1..=MAX_PRIORITY).contains(priority);
                if !valid {
                    log::warn!("Dropping stored priority {} for {}", priority, path);
                }
                valid
            })
            .collect();
        Self { priorities }
    }

    pub fn as_map(&self) -> &BTreeMap<String, u8> {
        &self.priorities
    }

    pub fn get(&self, path: &str) -> u8 {
        self.priorities.get(path).copied().unwrap_or(0)
    }

    /// Set a priority in `0..=5`; 0 removes the entry
    pub fn set(&mut self, path: &str, priority: u8) -> Result<()> {
        ensure!(
            priority <= MAX_PRIORITY,
            InvalidArgument,
            "priority for {} must be between 0 and {}, got {}",
            path,
            MAX_PRIORITY,
            priority
        );
        if priority == 0 {
            self.priorities.remove(path);
        } else {
            self.priorities.insert(path.to_string(), priority);
        }
        Ok(())
    }

    /// Advance a path's priority 0 -> 1 -> ... -> 5 -> 0 and return it
    pub fn cycle(&mut self, path: &str) -> u8 {
        let next = (self.get(path) + 1) % (MAX_PRIORITY + 1);
        if next == 0 {
            self.priorities.remove(path);
        } else {
            self.priorities.insert(path.to_string(), next);
        }
        next
    }

    pub fn clear(&mut self) {
        self.priorities.clear();
    }

    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    /// Sort descending by priority; equal priorities keep their input order
    pub fn sort_by_priority<'p, T, F>(&self, items: &mut [T], path_of: F)
    where
        F: Fn(&T) -> &'p str,
    {
        items.sort_by_key(|item| Reverse(self.get(path_of(item))));
    }
}

/// Marker appended to paths in generated output; empty for priority 0
pub fn priority_marker(priority: u8) -> String {
    match priority {
        0 => String::new(),
        p => format!(" ⭐{}", p),
    }
}

/// Parse a `path=N` assignment
pub fn parse_assignment(input: &str) -> Result<(String, u8)> {
    let (path, value) = input.rsplit_once('=').ok_or_else(|| {
        PackError::InvalidArgument(format!("expected path=N, got '{}'", input))
    })?;
    let path = path.trim();
    ensure!(!path.is_empty(), InvalidArgument, "missing path in '{}'", input);
    let priority: u8 = value.trim().parse().map_err(|_| {
        PackError::InvalidArgument(format!("invalid priority '{}' in '{}'", value, input))
    })?;
    ensure!(
        priority <= MAX_PRIORITY,
        InvalidArgument,
        "priority must be between 0 and {}, got {}",
        MAX_PRIORITY,
        priority
    );
    Ok((path.to_string(), priority))
}
