use std::path::{Path, PathBuf};
use std::time::Duration;

use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facecap_core::detection::domain::detection_config::{
    DetectionConfig, MIN_NEIGHBORS_RANGE, SCALE_FACTOR_RANGE,
};
use facecap_core::session::session_driver::SessionCommand;
use facecap_core::shared::box_color::BoxColor;
use facecap_core::shared::constants::ARCHIVE_FILE_NAME;
use facecap_core::shared::settings::SessionSettings;

use crate::settings::{Appearance, Settings};
use crate::tabs;
use crate::theme;
use crate::workers::capture_worker::{CaptureWorker, Notice, NoticeLevel, WorkerEvent};

const FRAME_POLL: Duration = Duration::from_millis(33);
const MAX_NOTICES: usize = 4;

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Capture,
    Appearance,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Capture, Tab::Appearance];

    fn label(self) -> &'static str {
        match self {
            Tab::Capture => "Capture",
            Tab::Appearance => "Appearance",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    ColorInputChanged(String),
    SwatchPicked(BoxColor),
    ScaleFactorChanged(f64),
    MinNeighborsChanged(u32),
    RestoreDefaults,
    Start,
    Save,
    Stop,
    DownloadArchive,
    ArchiveDestination(Option<PathBuf>),
    OpenFolder,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    ResetAppearance,
    PollWorker,
    PollSystemTheme,
}

/// Borrowed session state handed to the capture tab.
pub struct CaptureView<'a> {
    pub hex_input: &'a str,
    pub ready: bool,
    pub detecting: bool,
    pub download: Option<(u64, u64)>,
    pub faces: usize,
    pub preview: Option<&'a image::Handle>,
    pub notices: &'a [Notice],
    pub saved: usize,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    pub session: SessionSettings,
    /// Where this window's session saves; not persisted.
    output_dir: PathBuf,
    worker: Option<CaptureWorker>,
    ready: bool,
    detecting: bool,
    download: Option<(u64, u64)>,
    hex_input: String,
    preview: Option<image::Handle>,
    faces: usize,
    /// Newest first.
    notices: Vec<Notice>,
    saved: Vec<PathBuf>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let session = SessionSettings::init();
        let output_dir = effective_output_dir(&session.output_dir, dirs::picture_dir());
        let hex_input = session.detection.box_color().to_hex();
        let worker = CaptureWorker::spawn(SessionSettings {
            output_dir: output_dir.clone(),
            ..session.clone()
        });

        (
            Self {
                active_tab: Tab::Capture,
                settings: Settings::load(),
                session,
                output_dir,
                worker: Some(worker),
                ready: false,
                detecting: false,
                download: None,
                hex_input,
                preview: None,
                faces: 0,
                notices: Vec::new(),
                saved: Vec::new(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::ColorInputChanged(value) => {
                if self.session.detection.set_box_color_hex(&value).is_ok() {
                    self.config_changed();
                }
                self.hex_input = value;
            }
            Message::SwatchPicked(color) => {
                self.session.detection.set_box_color(color);
                self.hex_input = color.to_hex();
                self.config_changed();
            }
            Message::ScaleFactorChanged(value) => {
                // Slider steps accumulate float error; snap to one decimal.
                let snapped = ((value * 10.0).round() / 10.0)
                    .clamp(*SCALE_FACTOR_RANGE.start(), *SCALE_FACTOR_RANGE.end());
                if self.session.detection.set_scale_factor(snapped).is_ok() {
                    self.config_changed();
                }
            }
            Message::MinNeighborsChanged(value) => {
                let value = value.clamp(*MIN_NEIGHBORS_RANGE.start(), *MIN_NEIGHBORS_RANGE.end());
                if self.session.detection.set_min_neighbors(value).is_ok() {
                    self.config_changed();
                }
            }
            Message::RestoreDefaults => {
                self.session.detection = DetectionConfig::default();
                self.hex_input = self.session.detection.box_color().to_hex();
                self.config_changed();
            }
            Message::Start => self.send(SessionCommand::Start),
            Message::Save => self.send(SessionCommand::SaveCurrent),
            Message::Stop => self.send(SessionCommand::Stop),
            Message::DownloadArchive => {
                let start_dir = self.output_dir.clone();
                return Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .set_title("Save images as")
                            .set_directory(start_dir)
                            .set_file_name(ARCHIVE_FILE_NAME)
                            .add_filter("ZIP archive", &["zip"])
                            .save_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::ArchiveDestination,
                );
            }
            Message::ArchiveDestination(Some(path)) => {
                self.send(SessionCommand::ExportArchive(path));
            }
            Message::ArchiveDestination(None) => {}
            Message::OpenFolder => {
                if let Err(e) = open::that(&self.output_dir) {
                    log::warn!("Unable to open {}: {e}", self.output_dir.display());
                }
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::ResetAppearance => {
                self.settings = Settings::default();
                self.settings.save();
            }
            Message::PollWorker => self.poll_worker(),
            Message::PollSystemTheme => {
                // Theme is resolved fresh in theme() on every render,
                // so just requesting a redraw is enough.
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;

        // Tab bar
        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        // Tab content
        let content: Element<'_, Message> = match self.active_tab {
            Tab::Capture => tabs::capture_tab::view(
                fs,
                &self.session.detection,
                CaptureView {
                    hex_input: &self.hex_input,
                    ready: self.ready,
                    detecting: self.detecting,
                    download: self.download,
                    faces: self.faces,
                    preview: self.preview.as_ref(),
                    notices: &self.notices,
                    saved: self.saved.len(),
                },
            ),
            Tab::Appearance => tabs::appearance_tab::view(&self.settings),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        column![tab_bar, tab_content]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let worker = if self.worker.is_some() {
            iced::time::every(FRAME_POLL).map(|_| Message::PollWorker)
        } else {
            Subscription::none()
        };
        let system_theme = if self.settings.appearance == Appearance::System {
            iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme)
        } else {
            Subscription::none()
        };
        Subscription::batch([worker, system_theme])
    }

    fn send(&mut self, command: SessionCommand) {
        let alive = self
            .worker
            .as_ref()
            .map(|w| w.send(command))
            .unwrap_or(false);
        if !alive {
            self.worker = None;
            self.ready = false;
            self.push_notice(NoticeLevel::Error, "Capture worker is not running");
        }
    }

    /// Persist the edited parameters and hand them to the running session.
    fn config_changed(&mut self) {
        self.session.save();
        self.send(SessionCommand::UpdateConfig(self.session.detection.clone()));
    }

    fn poll_worker(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let events = worker.drain();

        // Only the newest frame matters.
        let latest_frame = events
            .iter()
            .rposition(|e| matches!(e, WorkerEvent::Frame(_)));

        for (i, event) in events.into_iter().enumerate() {
            match event {
                WorkerEvent::DownloadProgress(downloaded, total) => {
                    self.download = Some((downloaded, total));
                }
                WorkerEvent::Ready => {
                    self.download = None;
                    self.ready = true;
                }
                WorkerEvent::Frame(preview) if Some(i) == latest_frame => {
                    self.faces = preview.faces;
                    self.preview = Some(image::Handle::from_rgba(
                        preview.width,
                        preview.height,
                        preview.rgba,
                    ));
                }
                WorkerEvent::Frame(_) => {}
                WorkerEvent::Detecting(detecting) => {
                    self.detecting = detecting;
                    if !detecting {
                        self.faces = 0;
                    }
                }
                WorkerEvent::Notice(notice) => self.push_notice(notice.level, &notice.text),
                WorkerEvent::ImageSaved(path) => self.saved.push(path),
                WorkerEvent::ArchiveExported(_) => {}
                WorkerEvent::Fatal(message) => {
                    self.worker = None;
                    self.ready = false;
                    self.detecting = false;
                    self.download = None;
                    self.push_notice(NoticeLevel::Error, &message);
                }
            }
        }
    }

    fn push_notice(&mut self, level: NoticeLevel, text: &str) {
        self.notices.insert(
            0,
            Notice {
                level,
                text: text.to_string(),
            },
        );
        self.notices.truncate(MAX_NOTICES);
    }
}

/// The desktop saves under `<Pictures>/facecap` while the shared setting
/// still holds the working-directory default.
fn effective_output_dir(configured: &Path, pictures: Option<PathBuf>) -> PathBuf {
    match pictures {
        Some(pictures) if configured == Path::new(".") => pictures.join("facecap"),
        _ => configured.to_path_buf(),
    }
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
