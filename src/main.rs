use futures::channel::mpsc;
use iced::widget::{button, column, image, row, scrollable, text, Space};
use iced::{event, keyboard, mouse, touch, window};
use iced::{Alignment, Element, Event, Length, Point, Size, Subscription, Task, Theme};
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod backend;
mod config;
mod error;
mod media;
mod session;
mod state;
mod ui;

use backend::{DocumentStore, ObjectStore};
use config::Config;
use error::UploadError;
use media::blobs::BlobStore;
use media::upload::{self, ImportResult, UploadFile, Uploaded, IMAGE_EXTENSIONS};
use session::Session;
use state::feed::{self, DeleteOutcome, Feed, FeedUpdate};
use state::library::Library;
use state::lightbox::{Swipe, ViewerKey};
use ui::lightbox::Prefetched;
use ui::login::LoginForm;
use ui::upload::UploadForm;

/// Main application state
struct PhotoWall {
    config: Config,
    /// Photo records with live queries
    documents: Arc<dyn DocumentStore>,
    /// Image bytes
    objects: Arc<dyn ObjectStore>,
    session: Session,
    login: LoginForm,
    upload: UploadForm,
    feed: Feed,
    /// Keeps the stream of feed updates flowing; aborted on sign-out
    feed_task: Option<iced::task::Handle>,
    prefetch: Prefetched,
    swipe: Swipe,
    cursor: Point,
    window_size: Size,
    pixel_ratio: f32,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    PasswordChanged(String),
    SignIn,
    SignOut,

    PickFile,
    FilePicked(Option<PathBuf>),
    ClearFile,
    Upload,
    UploadFinished(Result<Uploaded, String>),

    /// User clicked the "Import folder" button
    ImportFolder,
    FolderPicked(Option<PathBuf>),
    /// Background import completed with results
    ImportComplete(ImportResult),

    /// Something arrived from the live query
    Feed(FeedUpdate),

    DeleteRequested(String),
    DeleteConfirmed(String, bool),
    DeleteFinished(String, Result<DeleteOutcome, String>),
    AlertDismissed,

    OpenViewer(usize),
    CloseViewer,
    Next,
    Previous,
    ViewerKey(ViewerKey),

    PointerMoved(Point),
    PointerPressed,
    PointerReleased,
    FingerPressed(Point),
    FingerLifted(Point),
    GestureCancelled,

    Prefetched(String, Result<image::Handle, String>),
    WindowResized(Size),
    ScaleFactor(f32),
}

impl PhotoWall {
    /// Create a new instance of the application
    fn new(config: Config) -> (Self, Task<Message>) {
        // The app cannot function without its catalog and blob directory
        let data_dir = config
            .data_dir()
            .expect("No data directory available. Set PHOTO_WALL_DATA_DIR.");
        let library = Library::open(&data_dir)
            .expect("Failed to initialize database. Check permissions and disk space.");
        let blobs = BlobStore::open(&data_dir)
            .expect("Failed to initialize photo storage. Check permissions and disk space.");

        let photo_count = library.photo_count().unwrap_or(0);
        info!("🖼️  Photo Wall initialized with {} photos in {}", photo_count, data_dir.display());

        let session = Session::new(config.account_uid.clone(), config.shared_password_sha256.clone());
        if config.shared_password_sha256.is_none() {
            warn!("⚠️  No shared password configured; sign-in is disabled");
        }

        let pixel_ratio = config.device_pixel_ratio.unwrap_or(1.0);

        let app = PhotoWall {
            config,
            documents: Arc::new(library),
            objects: Arc::new(blobs),
            session,
            login: LoginForm::default(),
            upload: UploadForm::default(),
            feed: Feed::new(),
            feed_task: None,
            prefetch: Prefetched::default(),
            swipe: Swipe::default(),
            cursor: Point::ORIGIN,
            window_size: Size::new(1024.0, 768.0),
            pixel_ratio,
        };

        let window_info = Task::batch([
            window::get_latest()
                .and_then(window::get_scale_factor)
                .map(Message::ScaleFactor),
            window::get_latest()
                .and_then(window::get_size)
                .map(Message::WindowResized),
        ]);

        (app, window_info)
    }

    /// Handle application messages, then point the prefetcher at whatever
    /// the viewer now needs
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        Task::batch([task, self.refresh_prefetch()])
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PasswordChanged(password) => {
                self.login.password = password;
                Task::none()
            }
            Message::SignIn => {
                match self.session.sign_in(&self.login.password).map(|_| ()) {
                    Ok(()) => {
                        self.login.reset();
                        self.mount_feed()
                    }
                    Err(err) => {
                        self.login.password.clear();
                        self.login.error = Some(err.user_message().to_string());
                        Task::none()
                    }
                }
            }
            Message::SignOut => {
                self.unmount_feed();
                self.session.sign_out();
                self.upload.reset();
                Task::none()
            }

            Message::PickFile => Task::perform(
                AsyncFileDialog::new()
                    .set_title("Choose a photo")
                    .add_filter("Images", &IMAGE_EXTENSIONS)
                    .pick_file(),
                |file| Message::FilePicked(file.map(|f| f.path().to_path_buf())),
            ),
            Message::FilePicked(Some(path)) => {
                self.upload.choose(path);
                Task::none()
            }
            Message::FilePicked(None) => Task::none(),
            Message::ClearFile => {
                self.upload.file = None;
                Task::none()
            }
            Message::Upload => {
                let Some(path) = self.upload.file.clone().filter(|_| self.upload.can_submit())
                else {
                    return Task::none();
                };
                self.upload.submitting = true;
                self.upload.error = None;
                self.upload.uploaded_url = None;

                let objects = self.objects.clone();
                let documents = self.documents.clone();
                let uid = self.session.user().map(|user| user.uid.clone());
                let max_bytes = self.config.max_upload_bytes;

                Task::perform(
                    async move {
                        let file = UploadFile::read(&path).await?;
                        upload::upload_photo(
                            objects.as_ref(),
                            documents.as_ref(),
                            file,
                            uid.as_deref(),
                            max_bytes,
                        )
                        .await
                    },
                    |result: Result<Uploaded, UploadError>| {
                        Message::UploadFinished(result.map_err(|err| {
                            warn!("⚠️  Upload failed: {}", err);
                            err.user_message()
                        }))
                    },
                )
            }
            Message::UploadFinished(result) => {
                self.upload.submitting = false;
                self.upload.file = None;
                match result {
                    Ok(uploaded) => self.upload.uploaded_url = Some(uploaded.url),
                    Err(message) => self.upload.error = Some(message),
                }
                Task::none()
            }

            Message::ImportFolder => Task::perform(
                AsyncFileDialog::new()
                    .set_title("Select Folder with Photos")
                    .pick_folder(),
                |folder| Message::FolderPicked(folder.map(|f| f.path().to_path_buf())),
            ),
            Message::FolderPicked(Some(folder)) => {
                self.upload.importing = true;
                self.upload.import_status = Some(format!("Importing from {}...", folder.display()));

                let objects = self.objects.clone();
                let documents = self.documents.clone();
                let uid = self.session.user().map(|user| user.uid.clone());
                let max_bytes = self.config.max_upload_bytes;

                Task::perform(
                    async move {
                        upload::import_folder(
                            objects.as_ref(),
                            documents.as_ref(),
                            &folder,
                            uid.as_deref(),
                            max_bytes,
                        )
                        .await
                    },
                    Message::ImportComplete,
                )
            }
            Message::FolderPicked(None) => Task::none(),
            Message::ImportComplete(result) => {
                self.upload.importing = false;
                self.upload.import_status = Some(format!(
                    "✅ Import complete! Added {} photos, {} failed.",
                    result.imported_count, result.failed_count
                ));
                info!(
                    "📊 Import summary: {} new, {} failed",
                    result.imported_count, result.failed_count
                );
                Task::none()
            }

            Message::Feed(update) => {
                self.feed.apply(update);
                Task::none()
            }

            Message::DeleteRequested(id) => {
                if self.feed.is_deleting(&id) {
                    return Task::none();
                }
                let confirm = AsyncMessageDialog::new()
                    .set_level(MessageLevel::Warning)
                    .set_title("Photo Wall")
                    .set_description("Delete this photo?")
                    .set_buttons(MessageButtons::YesNo)
                    .show();
                Task::perform(confirm, delete_answer(id))
            }
            Message::DeleteConfirmed(_, false) => Task::none(),
            Message::DeleteConfirmed(id, true) => {
                let record = self.feed.photos().iter().find(|record| record.id == id).cloned();
                let Some(request) = record.and_then(|record| self.feed.begin_delete(&record)) else {
                    debug!("Nothing to delete for {}", id);
                    return Task::none();
                };

                // The stored record decides the blob path, not the snapshot copy
                let objects = self.objects.clone();
                let documents = self.documents.clone();
                Task::perform(
                    async move {
                        feed::delete_photo_by_id(objects.as_ref(), documents.as_ref(), &request.id)
                            .await
                            .map_err(|err| {
                                error!("❌ Delete of {} failed: {}", request.id, err);
                                err.user_message()
                            })
                    },
                    move |result| Message::DeleteFinished(id.clone(), result),
                )
            }
            Message::DeleteFinished(id, result) => match self.feed.finish_delete(&id, &result) {
                Some(alert) => Task::perform(
                    AsyncMessageDialog::new()
                        .set_level(MessageLevel::Error)
                        .set_title("Photo Wall")
                        .set_description(alert)
                        .set_buttons(MessageButtons::Ok)
                        .show(),
                    |_| Message::AlertDismissed,
                ),
                None => Task::none(),
            },
            Message::AlertDismissed => Task::none(),

            Message::OpenViewer(index) => {
                self.swipe.cancel();
                self.feed.open_viewer(index);
                Task::none()
            }
            Message::CloseViewer => {
                self.feed.lightbox.close();
                Task::none()
            }
            Message::Next => {
                self.feed.lightbox.next();
                Task::none()
            }
            Message::Previous => {
                self.feed.lightbox.previous();
                Task::none()
            }
            Message::ViewerKey(key) => {
                self.feed.lightbox.handle_key(key);
                Task::none()
            }

            Message::PointerMoved(position) => {
                self.cursor = position;
                Task::none()
            }
            Message::PointerPressed => {
                self.swipe.begin(self.cursor.x, self.cursor.y);
                Task::none()
            }
            Message::PointerReleased => {
                self.finish_swipe(self.cursor);
                Task::none()
            }
            Message::FingerPressed(position) => {
                self.swipe.begin(position.x, position.y);
                Task::none()
            }
            Message::FingerLifted(position) => {
                self.finish_swipe(position);
                Task::none()
            }
            Message::GestureCancelled => {
                self.swipe.cancel();
                Task::none()
            }

            Message::Prefetched(url, Ok(handle)) => {
                if !self.prefetch.complete(&url, handle) {
                    debug!("Discarding prefetch nobody wants: {}", url);
                }
                Task::none()
            }
            Message::Prefetched(url, Err(err)) => {
                debug!("Prefetch of {} failed: {}", url, err);
                Task::none()
            }
            Message::WindowResized(size) => {
                self.window_size = size;
                Task::none()
            }
            Message::ScaleFactor(factor) => {
                if self.config.device_pixel_ratio.is_none() {
                    self.pixel_ratio = factor;
                }
                Task::none()
            }
        }
    }

    /// Start the live query and feed its updates back in as messages
    fn mount_feed(&mut self) -> Task<Message> {
        let (sender, receiver) = mpsc::unbounded();
        self.feed.start(self.documents.as_ref(), move |update| {
            // The receiver is gone once the feed task has been aborted
            let _ = sender.unbounded_send(update);
        });

        let (task, handle) = Task::run(receiver, Message::Feed).abortable();
        self.feed_task = Some(handle.abort_on_drop());
        task
    }

    fn unmount_feed(&mut self) {
        self.feed.stop();
        self.feed_task = None;
        self.prefetch.clear();
        self.swipe.cancel();
    }

    fn finish_swipe(&mut self, at: Point) {
        if !self.feed.lightbox.is_open() {
            self.swipe.cancel();
            return;
        }
        if let Some(direction) = self.swipe.end(at.x, at.y) {
            self.feed.lightbox.navigate(direction);
        }
    }

    /// Keep the neighbours of the open photo loading. Loads for photos
    /// that are no longer neighbours are aborted as their handles drop.
    fn refresh_prefetch(&mut self) -> Task<Message> {
        let objects = &self.objects;
        let mut loads = Vec::new();

        self.prefetch.retarget(self.feed.lightbox.prefetch_urls(), |url| {
            let (task, handle) = Task::perform(
                load_image(objects.clone(), url.to_string()),
                |(url, result)| Message::Prefetched(url, result),
            )
            .abortable();
            loads.push(task);
            handle.abort_on_drop()
        });

        Task::batch(loads)
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        if !self.session.is_signed_in() {
            return ui::login::view(&self.login);
        }

        let signed_in_as = self
            .session
            .user()
            .map(|user| format!("Signed in as {}", user.uid))
            .unwrap_or_default();

        let header = row![
            text("Photo Wall").size(32).color(ui::ACCENT),
            Space::with_width(Length::Fill),
            text(signed_in_as).size(14).color(ui::MUTED),
            button(text("Logout")).on_press(Message::SignOut).padding(8),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let page = column![
            header,
            ui::upload::view(&self.upload),
            scrollable(ui::grid::view(&self.feed, self.pixel_ratio))
                .width(Length::Fill)
                .height(Length::Fill),
        ]
        .spacing(20)
        .padding(24);

        ui::lightbox::view(
            page.into(),
            &self.feed.lightbox,
            &self.prefetch,
            self.window_size,
            self.pixel_ratio,
        )
    }

    /// Window size always; keys and gestures only while the viewer is open
    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions =
            vec![window::resize_events().map(|(_id, size)| Message::WindowResized(size))];

        if self.feed.lightbox.is_open() {
            subscriptions.push(keyboard::on_key_press(viewer_key));
            subscriptions.push(event::listen_with(gesture_event));
        }

        Subscription::batch(subscriptions)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Maps the confirmation dialog's answer for `id`
fn delete_answer(id: String) -> impl Fn(MessageDialogResult) -> Message {
    move |answer| Message::DeleteConfirmed(id.clone(), answer == MessageDialogResult::Yes)
}

fn viewer_key(key: keyboard::Key, _modifiers: keyboard::Modifiers) -> Option<Message> {
    use keyboard::key::Named;

    match key.as_ref() {
        keyboard::Key::Named(Named::Escape) => Some(Message::ViewerKey(ViewerKey::Escape)),
        keyboard::Key::Named(Named::ArrowLeft) => Some(Message::ViewerKey(ViewerKey::ArrowLeft)),
        keyboard::Key::Named(Named::ArrowRight) => Some(Message::ViewerKey(ViewerKey::ArrowRight)),
        _ => None,
    }
}

fn gesture_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Mouse(mouse::Event::CursorMoved { position }) => Some(Message::PointerMoved(position)),
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => Some(Message::PointerPressed),
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
            Some(Message::PointerReleased)
        }
        Event::Touch(touch::Event::FingerPressed { position, .. }) => {
            Some(Message::FingerPressed(position))
        }
        Event::Touch(touch::Event::FingerLifted { position, .. }) => {
            Some(Message::FingerLifted(position))
        }
        Event::Touch(touch::Event::FingerLost { .. }) => Some(Message::GestureCancelled),
        _ => None,
    }
}

/// Fetch an image into memory so showing it later is instant
async fn load_image(
    objects: Arc<dyn ObjectStore>,
    url: String,
) -> (String, Result<image::Handle, String>) {
    let result = objects
        .read(&url)
        .await
        .map(image::Handle::from_bytes)
        .map_err(|err| err.to_string());
    (url, result)
}

fn main() -> iced::Result {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("⚠️  {err}; using default settings");
            Config::default()
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    fmt().with_env_filter(filter).init();

    iced::application("Photo Wall", PhotoWall::update, PhotoWall::view)
        .subscription(PhotoWall::subscription)
        .theme(PhotoWall::theme)
        .centered()
        .run_with(move || PhotoWall::new(config))
}
