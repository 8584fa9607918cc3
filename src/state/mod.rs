/// State management module
///
/// This module handles all client-side state, including:
/// - The local document store and its live queries (library.rs)
/// - Shared data structures (data.rs)
/// - The synchronized photo feed and deletion (feed.rs)
/// - The lightbox viewer and swipe recognition (lightbox.rs)
/// - Neighbour prefetch bookkeeping (prefetch.rs)

pub mod library;
pub mod data;
pub mod feed;
pub mod lightbox;
pub mod prefetch;
