/// User interface module
///
/// Views are plain functions from state to `Element`:
/// - Shared password screen (login.rs)
/// - Upload card and folder import (upload.rs)
/// - The photo grid (grid.rs)
/// - The lightbox overlay (lightbox.rs)

pub mod grid;
pub mod lightbox;
pub mod login;
pub mod upload;

use iced::widget::image;
use iced::Color;

use crate::media::blobs::file_url_path;

/// Accent used by the primary buttons and the title
pub const ACCENT: Color = Color::from_rgb(0.969, 0.259, 0.067);

pub const MUTED: Color = Color::from_rgb(0.45, 0.45, 0.45);

pub const DANGER: Color = Color::from_rgb(0.86, 0.15, 0.15);

/// Image handle for an address the renderer can load directly.
/// Handles built from paths are keyed by path, so repeated calls hit the
/// renderer's cache.
pub fn image_handle(url: &str) -> Option<image::Handle> {
    file_url_path(url).map(image::Handle::from_path)
}
