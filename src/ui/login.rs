use iced::widget::{button, column, container, text, text_input};
use iced::{Alignment, Element, Length};

use super::{ACCENT, DANGER};
use crate::Message;

/// Shared password form shown while signed out
#[derive(Debug, Default)]
pub struct LoginForm {
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn reset(&mut self) {
        self.password.clear();
        self.error = None;
    }
}

pub fn view(form: &LoginForm) -> Element<'_, Message> {
    let input = text_input("PIN", &form.password)
        .secure(true)
        .on_input(Message::PasswordChanged)
        .on_submit(Message::SignIn)
        .padding(10)
        .width(Length::Fixed(240.0));

    let enter = button(text("ENTER"))
        .on_press_maybe((!form.password.is_empty()).then_some(Message::SignIn))
        .padding(10);

    let mut content = column![
        text("Photo Wall").size(40).color(ACCENT),
        text("Enter the shared PIN to continue").size(14),
        input,
        enter,
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    if let Some(error) = &form.error {
        content = content.push(text(error).size(14).color(DANGER));
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}
