use iced::widget::{button, column, container, row, text};
use iced::{Alignment, Element, Length};
use std::path::PathBuf;

use super::{DANGER, MUTED};
use crate::Message;

/// Single-file upload card plus folder import status
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<PathBuf>,
    pub submitting: bool,
    pub error: Option<String>,
    pub uploaded_url: Option<String>,
    pub importing: bool,
    pub import_status: Option<String>,
}

impl UploadForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A new file clears whatever the last attempt left behind
    pub fn choose(&mut self, file: PathBuf) {
        self.file = Some(file);
        self.error = None;
        self.uploaded_url = None;
    }

    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.submitting
    }
}

pub fn view(form: &UploadForm) -> Element<'_, Message> {
    let chosen = form
        .file
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "No file chosen".to_string());

    let busy = form.submitting || form.importing;

    let controls = row![
        button(text("Choose file"))
            .on_press_maybe((!busy).then_some(Message::PickFile))
            .padding(8),
        text(chosen).size(14).color(MUTED),
        button(text("Clear"))
            .on_press_maybe((form.file.is_some() && !busy).then_some(Message::ClearFile))
            .padding(8),
        button(text(if form.submitting { "Uploading…" } else { "Upload" }))
            .on_press_maybe((form.can_submit() && !form.importing).then_some(Message::Upload))
            .padding(8),
        button(text(if form.importing { "Importing…" } else { "Import folder" }))
            .on_press_maybe((!busy).then_some(Message::ImportFolder))
            .padding(8),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let mut content = column![controls].spacing(8);

    if let Some(error) = &form.error {
        content = content.push(text(error).size(14).color(DANGER));
    }
    if let Some(url) = &form.uploaded_url {
        content = content.push(text(format!("Uploaded: {url}")).size(14));
    }
    if let Some(status) = &form.import_status {
        content = content.push(text(status).size(14).color(MUTED));
    }

    container(content)
        .width(Length::Fill)
        .padding(16)
        .style(container::rounded_box)
        .into()
}
