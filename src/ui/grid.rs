use chrono::Local;
use iced::widget::{button, column, container, image, mouse_area, row, text, Space};
use iced::{Alignment, ContentFit, Element, Length};
use iced_aw::Wrap;

use super::{image_handle, DANGER, MUTED};
use crate::media::source;
use crate::state::data::PhotoRecord;
use crate::state::feed::Feed;
use crate::Message;

/// Tile footprint in logical pixels
pub const TILE_WIDTH: f32 = 220.0;
pub const TILE_HEIGHT: f32 = 176.0;

/// Status lines above the grid. An error does not hide the last good list.
pub fn view(feed: &Feed, pixel_ratio: f32) -> Element<'_, Message> {
    let mut content = column![].spacing(12);

    if feed.is_loading() {
        content = content.push(status("Loading photos…"));
    }
    if let Some(error) = feed.error() {
        content = content.push(text(format!("Error: {error}")).size(14).color(DANGER));
    }
    if !feed.is_loading() && feed.error().is_none() && feed.photos().is_empty() {
        content = content.push(status("No photos yet."));
    }

    if !feed.photos().is_empty() {
        let tiles: Vec<Element<'_, Message>> = feed
            .photos()
            .iter()
            .enumerate()
            .map(|(index, record)| tile(feed, index, record, pixel_ratio))
            .collect();
        content = content.push(Wrap::with_elements(tiles).spacing(12.0).line_spacing(12.0));
    }

    content.into()
}

fn status(message: &'static str) -> Element<'static, Message> {
    text(message).size(14).color(MUTED).into()
}

fn tile<'a>(
    feed: &Feed,
    index: usize,
    record: &'a PhotoRecord,
    pixel_ratio: f32,
) -> Element<'a, Message> {
    let url = source::grid_source(record).for_layout(TILE_WIDTH, pixel_ratio).to_string();

    let picture: Element<'a, Message> = match image_handle(&url) {
        Some(handle) => image(handle)
            .content_fit(ContentFit::Cover)
            .width(Length::Fixed(TILE_WIDTH))
            .height(Length::Fixed(TILE_HEIGHT))
            .into(),
        None => container(text("Unavailable").size(12).color(MUTED))
            .width(Length::Fixed(TILE_WIDTH))
            .height(Length::Fixed(TILE_HEIGHT))
            .center_x(Length::Fixed(TILE_WIDTH))
            .center_y(Length::Fixed(TILE_HEIGHT))
            .into(),
    };

    let deleting = feed.is_deleting(&record.id);
    let delete = button(text(if deleting { "Deleting…" } else { "Delete" }).size(12))
        .style(button::danger)
        .padding([4, 8])
        .on_press_maybe(
            (!deleting && record.delete_target().is_some())
                .then(|| Message::DeleteRequested(record.id.clone())),
        );

    let caption = record
        .created_at
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    column![
        mouse_area(picture).on_press(Message::OpenViewer(index)),
        row![text(caption).size(12).color(MUTED), Space::with_width(Length::Fill), delete]
            .align_y(Alignment::Center)
            .width(Length::Fixed(TILE_WIDTH)),
    ]
    .spacing(6)
    .into()
}
