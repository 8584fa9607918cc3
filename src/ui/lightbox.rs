use iced::widget::{button, column, container, image, mouse_area, opaque, row, stack, text, Space};
use iced::{Alignment, Background, Color, ContentFit, Element, Length, Size};

use super::{image_handle, MUTED};
use crate::state::lightbox::Lightbox;
use crate::state::prefetch::PrefetchSet;
use crate::Message;

/// Share of the window the photo may take up
const VIEWPORT_SHARE: f32 = 0.92;

/// Prefetched images by URL; the guard aborts the load when dropped
pub type Prefetched = PrefetchSet<image::Handle, iced::task::Handle>;

/// Full-window overlay over `base`. Clicking the backdrop closes it.
pub fn view<'a>(
    base: Element<'a, Message>,
    lightbox: &'a Lightbox,
    prefetched: &'a Prefetched,
    window: Size,
    pixel_ratio: f32,
) -> Element<'a, Message> {
    let (Some(current), Some(source)) = (lightbox.current(), lightbox.source(pixel_ratio)) else {
        return base;
    };

    let max_width = window.width * VIEWPORT_SHARE;
    let max_height = (window.height - 96.0).max(64.0) * VIEWPORT_SHARE;

    let url = source.for_layout(max_width, pixel_ratio);
    let handle = lightbox
        .prefetched(prefetched)
        .cloned()
        .or_else(|| image_handle(url));

    let picture: Element<'a, Message> = match handle {
        Some(handle) => image(handle)
            .content_fit(ContentFit::Contain)
            .width(Length::Fixed(max_width))
            .height(Length::Fixed(max_height))
            .into(),
        None => text(format!("Cannot display {}", current.url)).color(MUTED).into(),
    };

    let counter = text(format!("{} / {}", lightbox.index() + 1, lightbox.len())).size(14);
    let close = button(text("✕")).on_press(Message::CloseViewer).padding([4, 10]);

    let controls = (if lightbox.has_navigation() {
        row![
            button(text("‹").size(24)).on_press(Message::Previous).padding([2, 14]),
            counter,
            button(text("›").size(24)).on_press(Message::Next).padding([2, 14]),
            Space::with_width(Length::Fixed(24.0)),
            close,
        ]
    } else {
        row![counter, Space::with_width(Length::Fixed(24.0)), close]
    })
    .spacing(12)
    .align_y(Alignment::Center);

    let backdrop = mouse_area(
        container(Space::new(Length::Fill, Length::Fill))
            .width(Length::Fill)
            .height(Length::Fill)
            .style(|_| container::Style {
                background: Some(Background::Color(Color::from_rgba(0.0, 0.0, 0.0, 0.88))),
                ..container::Style::default()
            }),
    )
    .on_press(Message::CloseViewer);

    let content = opaque(column![picture, controls].spacing(12).align_x(Alignment::Center));

    stack![
        base,
        backdrop,
        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill),
    ]
    .into()
}
