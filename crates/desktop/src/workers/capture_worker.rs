use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use facecap_core::annotation::frame_annotator::FrameAnnotator;
use facecap_core::annotation::infrastructure::rectangle_painter::RectanglePainter;
use facecap_core::archive::infrastructure::jpeg_file_writer::JpegFileWriter;
use facecap_core::archive::saved_image_archive::SavedImageArchive;
use facecap_core::capture::domain::frame_source::FrameSource;
use facecap_core::detection::domain::face_detector::FaceDetector;
use facecap_core::session::capture_session::CaptureSession;
use facecap_core::session::session_driver::{SessionCommand, SessionDriver};
use facecap_core::session::session_reporter::SessionReporter;
use facecap_core::shared::detection::Detection;
use facecap_core::shared::frame::Frame;
use facecap_core::shared::settings::SessionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-facing status line.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// An annotated frame converted for display.
#[derive(Debug, Clone)]
pub struct FramePreview {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub faces: usize,
}

/// Messages sent from the worker thread to the UI.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    DownloadProgress(u64, u64),
    Ready,
    Frame(FramePreview),
    Detecting(bool),
    Notice(Notice),
    ImageSaved(PathBuf),
    ArchiveExported(PathBuf),
    /// The worker could not be set up; no session is running.
    Fatal(String),
}

/// Handle to the thread that owns the capture session.
///
/// Dropping the handle asks the session to shut down.
pub struct CaptureWorker {
    commands: Sender<SessionCommand>,
    events: Receiver<WorkerEvent>,
}

impl CaptureWorker {
    pub fn spawn(settings: SessionSettings) -> Self {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<SessionCommand>();
        // Bounded so a stalled UI drops frames instead of piling them up.
        let (tx, rx) = crossbeam_channel::bounded::<WorkerEvent>(64);

        let spawned = thread::Builder::new()
            .name("capture-session".into())
            .spawn({
                let tx = tx.clone();
                move || {
                    if let Err(e) = run_session(&tx, &cmd_rx, settings) {
                        log::error!("Capture worker failed: {e}");
                        let _ = tx.send(WorkerEvent::Fatal(e.to_string()));
                    }
                }
            });
        if let Err(e) = spawned {
            let _ = tx.try_send(WorkerEvent::Fatal(format!("Unable to start worker: {e}")));
        }

        Self {
            commands: cmd_tx,
            events: rx,
        }
    }

    /// Returns `false` once the worker thread has exited.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn drain(&self) -> Vec<WorkerEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

fn run_session(
    tx: &Sender<WorkerEvent>,
    commands: &Receiver<SessionCommand>,
    settings: SessionSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(tx, &settings)?;
    let source = build_source(&settings)?;
    let annotator = FrameAnnotator::new(detector, Box::new(RectanglePainter::default()));
    let archive = SavedImageArchive::new(
        settings.output_dir.clone(),
        Box::new(JpegFileWriter::default()),
    );
    let session = CaptureSession::new(source, annotator, archive);

    let reporter = ChannelReporter { tx: tx.clone() };
    let mut driver = SessionDriver::new(session, settings.detection.clone(), Box::new(reporter));
    let _ = tx.send(WorkerEvent::Ready);
    driver.run(commands);
    Ok(())
}

#[cfg(feature = "opencv")]
fn build_detector(
    tx: &Sender<WorkerEvent>,
    settings: &SessionSettings,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    use facecap_core::detection::infrastructure::cascade_face_detector::CascadeFaceDetector;
    use facecap_core::detection::infrastructure::cascade_resolver;
    use facecap_core::shared::constants::{CASCADE_MODEL_NAME, CASCADE_MODEL_URL};

    let path = match &settings.cascade_path {
        Some(path) => path.clone(),
        None => {
            let tx_dl = tx.clone();
            cascade_resolver::resolve(
                CASCADE_MODEL_NAME,
                CASCADE_MODEL_URL,
                None,
                Some(Box::new(move |dl, total| {
                    let _ = tx_dl.try_send(WorkerEvent::DownloadProgress(dl, total));
                })),
            )?
        }
    };
    Ok(Box::new(CascadeFaceDetector::new(&path)?))
}

#[cfg(not(feature = "opencv"))]
fn build_detector(
    _tx: &Sender<WorkerEvent>,
    _settings: &SessionSettings,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    Err("Built without the `opencv` feature; no face detector is available".into())
}

#[cfg(feature = "opencv")]
fn build_source(
    settings: &SessionSettings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use facecap_core::capture::infrastructure::camera_frame_source::CameraFrameSource;

    Ok(Box::new(
        CameraFrameSource::new(settings.camera_index)
            .with_resolution(settings.capture_width, settings.capture_height),
    ))
}

#[cfg(not(feature = "opencv"))]
fn build_source(
    _settings: &SessionSettings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("Camera capture needs the `opencv` feature".into())
}

/// Forwards session output to the UI thread.
struct ChannelReporter {
    tx: Sender<WorkerEvent>,
}

impl ChannelReporter {
    fn notice(&self, level: NoticeLevel, message: &str) {
        let _ = self.tx.send(WorkerEvent::Notice(Notice {
            level,
            text: message.to_string(),
        }));
    }
}

impl SessionReporter for ChannelReporter {
    fn frame(&mut self, frame: &Frame, detections: &[Detection]) {
        let preview = FramePreview {
            width: frame.width(),
            height: frame.height(),
            rgba: frame.to_rgba_bytes(),
            faces: detections.len(),
        };
        // Frames are superseded every tick; never block the session on them.
        let _ = self.tx.try_send(WorkerEvent::Frame(preview));
    }

    fn success(&mut self, message: &str) {
        self.notice(NoticeLevel::Success, message);
    }

    fn info(&mut self, message: &str) {
        self.notice(NoticeLevel::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.notice(NoticeLevel::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.notice(NoticeLevel::Error, message);
    }

    fn image_saved(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.notice(NoticeLevel::Success, &format!("Image saved as {name}"));
        let _ = self.tx.send(WorkerEvent::ImageSaved(path.to_path_buf()));
    }

    fn archive_exported(&mut self, path: &Path) {
        self.notice(
            NoticeLevel::Success,
            &format!("Archive written to {}", path.display()),
        );
        let _ = self.tx.send(WorkerEvent::ArchiveExported(path.to_path_buf()));
    }

    fn detecting_changed(&mut self, detecting: bool) {
        let _ = self.tx.send(WorkerEvent::Detecting(detecting));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> (ChannelReporter, Receiver<WorkerEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(8);
        (ChannelReporter { tx }, rx)
    }

    #[test]
    fn test_frame_is_converted_to_rgba() {
        let (mut reporter, rx) = reporter();
        // One BGR pixel: blue=10, green=20, red=30.
        let frame = Frame::new(vec![10, 20, 30], 1, 1, 3, 0);

        reporter.frame(&frame, &[Detection::new(0, 0, 1, 1)]);

        let Ok(WorkerEvent::Frame(preview)) = rx.try_recv() else {
            panic!("expected a frame preview");
        };
        assert_eq!((preview.width, preview.height), (1, 1));
        assert_eq!(preview.rgba, vec![30, 20, 10, 255]);
        assert_eq!(preview.faces, 1);
    }

    #[test]
    fn test_frames_are_dropped_when_ui_lags() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut reporter = ChannelReporter { tx };
        let frame = Frame::new(vec![0; 3], 1, 1, 3, 0);

        reporter.frame(&frame, &[]);
        reporter.frame(&frame, &[]);

        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_messages_keep_their_level() {
        let (mut reporter, rx) = reporter();
        reporter.warning("No frame to save yet");
        reporter.error("Unable to capture image");

        let levels: Vec<NoticeLevel> = rx
            .try_iter()
            .filter_map(|e| match e {
                WorkerEvent::Notice(n) => Some(n.level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![NoticeLevel::Warning, NoticeLevel::Error]);
    }

    #[test]
    fn test_image_saved_names_the_file() {
        let (mut reporter, rx) = reporter();
        let path = PathBuf::from("/tmp/shots/detected_faces_1700000000.jpg");

        reporter.image_saved(&path);

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert!(matches!(
            &events[0],
            WorkerEvent::Notice(n) if n.text == "Image saved as detected_faces_1700000000.jpg"
        ));
        assert!(matches!(&events[1], WorkerEvent::ImageSaved(p) if p == &path));
    }

    #[test]
    fn test_detecting_changed_is_forwarded() {
        let (mut reporter, rx) = reporter();
        reporter.detecting_changed(true);
        assert!(matches!(rx.try_recv(), Ok(WorkerEvent::Detecting(true))));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_worker_without_detector_reports_fatal() {
        let worker = CaptureWorker::spawn(SessionSettings::default());
        let event = worker
            .events
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert!(matches!(event, WorkerEvent::Fatal(_)));
    }
}
