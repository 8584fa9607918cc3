/// Media module
///
/// This module handles:
/// - Storing uploaded blobs on disk and addressing them by URL
/// - Content-addressed uploads and folder import
/// - Choosing which resolution tier to display or prefetch

pub mod blobs;
pub mod source;
pub mod upload;
