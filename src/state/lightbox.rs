//! Lightbox: sequential full-size viewing over the feed's list
//!
//! closed → open → closed. Navigation wraps around; with one photo (or
//! none) it does nothing and the arrows are hidden.

use std::sync::Arc;

use super::data::PhotoRecord;
use super::prefetch::PrefetchSet;
use crate::media::source::{self, ResponsiveSource};

/// Minimum horizontal travel for a swipe
pub const SWIPE_MIN_DX: f32 = 40.0;
/// Maximum vertical travel still counted as a horizontal swipe
pub const SWIPE_MAX_DY: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    Escape,
    ArrowLeft,
    ArrowRight,
}

/// Classify a finished drag. Leftward is next, rightward is previous.
pub fn classify_swipe(dx: f32, dy: f32) -> Option<Direction> {
    if dx.abs() > SWIPE_MIN_DX && dy.abs() < SWIPE_MAX_DY {
        if dx < 0.0 {
            Some(Direction::Next)
        } else {
            Some(Direction::Previous)
        }
    } else {
        None
    }
}

/// Tracks one pointer or finger from press to release
#[derive(Debug, Clone, Default)]
pub struct Swipe {
    start: Option<(f32, f32)>,
}

impl Swipe {
    pub fn begin(&mut self, x: f32, y: f32) {
        self.start = Some((x, y));
    }

    /// Finish the gesture at (x, y). A release without a press is ignored.
    pub fn end(&mut self, x: f32, y: f32) -> Option<Direction> {
        let (sx, sy) = self.start.take()?;
        classify_swipe(x - sx, y - sy)
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    #[cfg(test)]
    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Lightbox {
    open: bool,
    index: usize,
    photos: Arc<[PhotoRecord]>,
}

impl Default for Lightbox {
    fn default() -> Self {
        Self { open: false, index: 0, photos: Arc::from(Vec::new()) }
    }
}

impl Lightbox {
    /// Open on `index` (clamped). Refuses an empty list.
    pub fn open(&mut self, photos: Arc<[PhotoRecord]>, index: usize) -> bool {
        if photos.is_empty() {
            return false;
        }
        self.index = index.min(photos.len() - 1);
        self.photos = photos;
        self.open = true;
        true
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Follow a new snapshot: keep the index in range, close when empty
    pub fn sync(&mut self, photos: Arc<[PhotoRecord]>) {
        if photos.is_empty() {
            self.open = false;
            self.index = 0;
        } else {
            self.index = self.index.min(photos.len() - 1);
        }
        self.photos = photos;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// Whether the prev/next controls are shown
    pub fn has_navigation(&self) -> bool {
        self.photos.len() > 1
    }

    pub fn current(&self) -> Option<&PhotoRecord> {
        if self.open {
            self.photos.get(self.index)
        } else {
            None
        }
    }

    pub fn next(&mut self) {
        if self.open && self.has_navigation() {
            self.index = (self.index + 1) % self.photos.len();
        }
    }

    pub fn previous(&mut self) {
        if self.open && self.has_navigation() {
            let len = self.photos.len();
            self.index = (self.index + len - 1) % len;
        }
    }

    pub fn navigate(&mut self, direction: Direction) {
        match direction {
            Direction::Next => self.next(),
            Direction::Previous => self.previous(),
        }
    }

    pub fn handle_key(&mut self, key: ViewerKey) {
        if !self.open {
            return;
        }
        match key {
            ViewerKey::Escape => self.close(),
            ViewerKey::ArrowRight => self.next(),
            ViewerKey::ArrowLeft => self.previous(),
        }
    }

    /// Responsive source of the current photo
    pub fn source(&self, pixel_ratio: f32) -> Option<ResponsiveSource> {
        self.current()
            .map(|record| source::lightbox_source(record, pixel_ratio))
    }

    /// The prefetched image of the current photo, once its load finished.
    /// Neighbours are warmed at their widest tier, which is never narrower
    /// than what the layout would pick.
    pub fn prefetched<'a, T, G>(&self, set: &'a PrefetchSet<T, G>) -> Option<&'a T> {
        self.current()
            .map(source::prefetch_source)
            .and_then(|url| set.get(url))
    }

    /// Records either side of the current one, without repeats
    pub fn neighbours(&self) -> Vec<&PhotoRecord> {
        if !self.open || !self.has_navigation() {
            return Vec::new();
        }
        let len = self.photos.len();
        let next = (self.index + 1) % len;
        let previous = (self.index + len - 1) % len;

        let mut out = vec![&self.photos[next]];
        if previous != next {
            out.push(&self.photos[previous]);
        }
        out
    }

    /// URLs worth keeping warm: both neighbours, plus the current photo so
    /// an image that was prefetched is not thrown away the moment it is
    /// shown. Empty when closed or when there is nothing to page to.
    pub fn prefetch_urls(&self) -> Vec<String> {
        let neighbours = self.neighbours();
        if neighbours.is_empty() {
            return Vec::new();
        }
        let mut urls: Vec<String> = Vec::with_capacity(3);
        let current = self.current().map(source::prefetch_source);
        for url in neighbours
            .into_iter()
            .map(source::prefetch_source)
            .chain(current)
        {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }
}
