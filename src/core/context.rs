/// Generation context: anti-repetition tracking across generations.

use std::collections::VecDeque;

use crate::schema::normalize_key;

/// Maintains a sliding window of recently generated encounter titles so the
/// generator can avoid serving the same encounter twice in a row.
#[derive(Debug, Clone)]
pub struct RecentWindow {
    capacity: usize,
    recent: VecDeque<String>,
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self::new(5)
    }
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a generated title, evicting the oldest once full.
    pub fn record(&mut self, title: &str) {
        if self.capacity == 0 {
            return;
        }
        let key = normalize_key(title);
        self.recent.retain(|t| *t != key);
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(key);
    }

    pub fn contains(&self, title: &str) -> bool {
        let key = normalize_key(title);
        self.recent.iter().any(|t| *t == key)
    }

    /// Drop recently used candidates. When that would leave nothing, only
    /// the newest entries are excluded, so with two or more candidates the
    /// last title is never served again immediately.
    pub fn prefer_fresh<'a, T, F>(&self, candidates: Vec<&'a T>, title: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> &str,
    {
        for excluded in (1..=self.recent.len()).rev() {
            let newest: Vec<&String> = self.recent.iter().rev().take(excluded).collect();
            let fresh: Vec<&'a T> = candidates
                .iter()
                .copied()
                .filter(|c| {
                    let key = normalize_key(title(c));
                    !newest.iter().any(|t| **t == key)
                })
                .collect();
            if !fresh.is_empty() {
                return fresh;
            }
        }
        candidates
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}
