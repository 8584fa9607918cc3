//! Neighbour prefetch bookkeeping
//!
//! A small map from URL to an in-flight or finished fetch. Retargeting
//! drops every slot that is no longer wanted, which drops its guard; the
//! caller picks a guard type that releases the request when dropped.
//! Results for URLs nobody wants any more are discarded.

use std::collections::HashMap;
use tracing::debug;

#[derive(Debug)]
struct Slot<T, G> {
    _guard: G,
    data: Option<T>,
}

#[derive(Debug)]
pub struct PrefetchSet<T, G> {
    slots: HashMap<String, Slot<T, G>>,
}

impl<T, G> Default for PrefetchSet<T, G> {
    fn default() -> Self {
        Self { slots: HashMap::new() }
    }
}

impl<T, G> PrefetchSet<T, G> {
    /// Keep exactly `urls`. Slots for other URLs are released; `start` is
    /// called once per URL that is not already in flight or loaded.
    pub fn retarget<I, F>(&mut self, urls: I, mut start: F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(&str) -> G,
    {
        let wanted: Vec<String> = urls.into_iter().collect();

        let before = self.slots.len();
        self.slots.retain(|url, _| wanted.contains(url));
        let released = before - self.slots.len();
        if released > 0 {
            debug!("Released {} prefetch slot(s)", released);
        }

        for url in wanted {
            if !self.slots.contains_key(&url) {
                let guard = start(&url);
                self.slots.insert(url, Slot { _guard: guard, data: None });
            }
        }
    }

    /// Store a finished fetch. Returns false (and drops `data`) when the
    /// URL was released in the meantime. A failed fetch simply never
    /// completes; its slot stays so it is not restarted until released.
    pub fn complete(&mut self, url: &str, data: T) -> bool {
        match self.slots.get_mut(url) {
            Some(slot) => {
                slot.data = Some(data);
                true
            }
            None => false,
        }
    }

    /// Finished data for `url`, if any
    pub fn get(&self, url: &str) -> Option<&T> {
        self.slots.get(url).and_then(|slot| slot.data.as_ref())
    }

    #[cfg(test)]
    pub fn is_tracked(&self, url: &str) -> bool {
        self.slots.contains_key(url)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
