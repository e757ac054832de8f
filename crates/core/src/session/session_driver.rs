use std::ops::ControlFlow;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::archive::saved_image_archive::ArchiveError;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::session::capture_session::{CaptureSession, SessionError, TickOutcome};
use crate::session::session_reporter::SessionReporter;

/// Requests a front-end can send to a running [`SessionDriver`].
#[derive(Clone, Debug)]
pub enum SessionCommand {
    Start,
    Stop,
    SaveCurrent,
    UpdateConfig(DetectionConfig),
    ExportArchive(PathBuf),
    Shutdown,
}

/// Polling loop shared by every front-end.
///
/// Owns the session and the detection parameters. While Idle it blocks on
/// the next command; while Running it drains pending commands and then
/// ticks once, so a stop takes effect at the next iteration.
pub struct SessionDriver {
    session: CaptureSession,
    config: DetectionConfig,
    reporter: Box<dyn SessionReporter>,
}

impl SessionDriver {
    pub fn new(
        session: CaptureSession,
        config: DetectionConfig,
        reporter: Box<dyn SessionReporter>,
    ) -> Self {
        Self {
            session,
            config,
            reporter,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Serves commands until `Shutdown` arrives or every sender is gone.
    /// Errors are reported, never returned.
    pub fn run(&mut self, commands: &Receiver<SessionCommand>) {
        loop {
            if self.session.is_detecting() {
                loop {
                    match commands.try_recv() {
                        Ok(cmd) => {
                            if self.handle(cmd).is_break() {
                                return;
                            }
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.shutdown();
                            return;
                        }
                    }
                }
                if let Err(e) = self.tick() {
                    self.reporter.error(&e.to_string());
                }
            } else {
                match commands.recv() {
                    Ok(cmd) => {
                        if self.handle(cmd).is_break() {
                            return;
                        }
                    }
                    Err(_) => {
                        self.shutdown();
                        return;
                    }
                }
            }
        }
    }

    /// Starts the session and runs it until it goes Idle on its own, or a
    /// `Stop`/`Shutdown` arrives. Open and detector failures are returned.
    ///
    /// A disconnected command channel does not stop the session.
    pub fn run_until_idle(
        &mut self,
        commands: &Receiver<SessionCommand>,
    ) -> Result<(), SessionError> {
        self.try_start()?;

        while self.session.is_detecting() {
            while let Ok(cmd) = commands.try_recv() {
                if self.handle(cmd).is_break() {
                    return Ok(());
                }
            }
            self.tick()?;
        }
        Ok(())
    }

    pub fn handle(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::Start => self.start(),
            SessionCommand::Stop => self.stop(),
            SessionCommand::SaveCurrent => self.save_current(),
            SessionCommand::UpdateConfig(config) => {
                log::debug!(
                    "Detection parameters: scale {:.1}, neighbors {}, colour {}",
                    config.scale_factor(),
                    config.min_neighbors(),
                    config.box_color()
                );
                self.config = config.clamped();
            }
            SessionCommand::ExportArchive(dest) => self.export_archive(dest),
            SessionCommand::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn start(&mut self) {
        // Already reported.
        let _ = self.try_start();
    }

    fn try_start(&mut self) -> Result<(), SessionError> {
        match self.session.start() {
            Ok(info) => {
                self.reporter.success(&format!(
                    "Detection started on {} ({}x{})",
                    info.description, info.width, info.height
                ));
                self.reporter.detecting_changed(true);
                Ok(())
            }
            Err(e @ SessionError::AlreadyRunning) => {
                self.reporter.warning(&e.to_string());
                Err(e)
            }
            Err(e) => {
                self.reporter.error(&e.to_string());
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        if self.session.stop() {
            self.reporter.detecting_changed(false);
            self.reporter.info("Detection stopped");
            self.reporter.summary();
        }
    }

    fn shutdown(&mut self) {
        if self.session.stop() {
            self.reporter.detecting_changed(false);
            self.reporter.summary();
        }
    }

    fn tick(&mut self) -> Result<(), SessionError> {
        match self.session.tick(&self.config) {
            Ok(TickOutcome::Idle) => {}
            Ok(TickOutcome::Frame {
                detections,
                annotate_ms,
            }) => {
                self.reporter.timing("annotate", annotate_ms);
                if let Some(frame) = self.session.current_frame() {
                    self.reporter.frame(frame, &detections);
                }
            }
            Ok(TickOutcome::Ended) => {
                self.reporter.detecting_changed(false);
                self.reporter.info("Frame source ended, detection stopped");
                self.reporter.summary();
            }
            Ok(TickOutcome::Failed(msg)) => {
                self.reporter.detecting_changed(false);
                self.reporter.error(&format!("Unable to capture image: {msg}"));
                self.reporter.summary();
            }
            Err(e) => {
                self.reporter.detecting_changed(false);
                self.reporter.summary();
                return Err(e);
            }
        }
        Ok(())
    }

    fn save_current(&mut self) {
        match self.session.save_current() {
            Ok(path) => self.reporter.image_saved(&path),
            Err(SessionError::NoFrame) => self.reporter.warning("No frame to save yet"),
            Err(SessionError::Archive(e @ ArchiveError::Unconfirmed(_))) => {
                self.reporter.warning(&e.to_string())
            }
            Err(e) => self.reporter.error(&e.to_string()),
        }
    }

    fn export_archive(&mut self, dest: PathBuf) {
        match self.session.export_archive(&dest) {
            Ok(Some(path)) => self.reporter.archive_exported(&path),
            Ok(None) => self.reporter.warning("No saved images to download"),
            Err(e) => self.reporter.error(&e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::frame_annotator::tests::FailingDetector;
    use crate::annotation::frame_annotator::FrameAnnotator;
    use crate::annotation::infrastructure::rectangle_painter::RectanglePainter;
    use crate::archive::infrastructure::jpeg_file_writer::JpegFileWriter;
    use crate::archive::domain::image_writer::ImageWriter;
    use crate::archive::saved_image_archive::tests::PhantomWriter;
    use crate::archive::saved_image_archive::SavedImageArchive;
    use crate::session::capture_session::tests::{annotator, ScriptedSource, SourceCounters};
    use crate::session::session_reporter::tests::{Event, RecordingReporter};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn driver(
        source: ScriptedSource,
        annotator: FrameAnnotator,
        out: &Path,
    ) -> (SessionDriver, RecordingReporter, Arc<Mutex<SourceCounters>>) {
        driver_with_writer(source, annotator, out, Box::new(JpegFileWriter::default()))
    }

    fn driver_with_writer(
        source: ScriptedSource,
        annotator: FrameAnnotator,
        out: &Path,
        writer: Box<dyn ImageWriter>,
    ) -> (SessionDriver, RecordingReporter, Arc<Mutex<SourceCounters>>) {
        let counters = source.counters.clone();
        let archive = SavedImageArchive::new(out, writer);
        let session = CaptureSession::new(Box::new(source), annotator, archive);
        let reporter = RecordingReporter::default();
        let driver = SessionDriver::new(
            session,
            DetectionConfig::default(),
            Box::new(reporter.clone()),
        );
        (driver, reporter, counters)
    }

    fn frames_seen(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::Frame(..)))
            .count()
    }

    #[test]
    fn test_run_until_idle_plays_finite_source() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, counters) =
            driver(ScriptedSource::frames(3), annotator(1), dir.path());
        let (_tx, rx) = crossbeam_channel::unbounded();

        driver.run_until_idle(&rx).unwrap();

        let events = reporter.events();
        assert_eq!(frames_seen(&events), 3);
        assert!(events.contains(&Event::Frame(2, 1)));
        assert!(events.contains(&Event::Info(
            "Frame source ended, detection stopped".into()
        )));
        assert_eq!(counters.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_commands_are_handled_between_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::frames(2), annotator(0), dir.path());
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(SessionCommand::SaveCurrent).unwrap();

        driver.run_until_idle(&rx).unwrap();

        // Queued before the first tick, so there was nothing to save yet.
        let events = reporter.events();
        assert_eq!(events[1], Event::Detecting(true));
        assert_eq!(events[2], Event::Warning("No frame to save yet".into()));
        assert!(driver.session().state().saved_image_paths().is_empty());
    }

    #[test]
    fn test_stop_command_ends_run_until_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, counters) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(SessionCommand::Stop).unwrap();

        driver.run_until_idle(&rx).unwrap();

        assert!(!driver.session().is_detecting());
        assert!(reporter
            .events()
            .contains(&Event::Info("Detection stopped".into())));
        assert_eq!(counters.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_run_until_idle_returns_detector_failure() {
        let dir = tempfile::tempdir().unwrap();
        let failing =
            FrameAnnotator::new(Box::new(FailingDetector), Box::new(RectanglePainter::default()));
        let (mut driver, _, counters) = driver(ScriptedSource::endless(), failing, dir.path());
        let (_tx, rx) = crossbeam_channel::unbounded();

        let err = driver.run_until_idle(&rx).unwrap_err();

        assert!(matches!(err, SessionError::Detection(_)));
        assert_eq!(counters.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_run_until_idle_returns_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::failing_open(), annotator(0), dir.path());
        let (_tx, rx) = crossbeam_channel::unbounded();

        assert!(matches!(
            driver.run_until_idle(&rx),
            Err(SessionError::Open(_))
        ));
        assert!(matches!(reporter.events()[0], Event::Error(_)));
    }

    #[test]
    fn test_run_applies_config_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, counters) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut config = DetectionConfig::default();
        config.set_min_neighbors(8).unwrap();

        tx.send(SessionCommand::UpdateConfig(config)).unwrap();
        tx.send(SessionCommand::Start).unwrap();
        tx.send(SessionCommand::Shutdown).unwrap();

        driver.run(&rx);

        assert_eq!(driver.config().min_neighbors(), 8);
        assert!(!driver.session().is_detecting());
        let events = reporter.events();
        assert!(matches!(events[0], Event::Success(ref m) if m.starts_with("Detection started")));
        let c = counters.lock().unwrap();
        assert_eq!((c.opens, c.closes), (1, 1));
    }

    #[test]
    fn test_save_then_export_writes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::endless(), annotator(1), dir.path());
        let dest = dir.path().join("images.zip");

        driver.handle(SessionCommand::Start);
        driver.tick().unwrap();
        driver.handle(SessionCommand::SaveCurrent);
        driver.handle(SessionCommand::ExportArchive(dest.clone()));

        let events = reporter.events();
        assert_eq!(events[1], Event::Detecting(true));
        assert_eq!(events[2], Event::Frame(0, 1));
        assert!(matches!(events[3], Event::Saved(ref p) if p.is_file()));
        assert_eq!(events[4], Event::Exported(dest.clone()));
        assert!(dest.is_file());
    }

    #[test]
    fn test_export_without_saves_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());
        let dest = dir.path().join("images.zip");

        let flow = driver.handle(SessionCommand::ExportArchive(dest.clone()));

        assert!(flow.is_continue());
        assert_eq!(
            reporter.events(),
            vec![Event::Warning("No saved images to download".into())]
        );
        assert!(!dest.exists());
    }

    #[test]
    fn test_unconfirmed_save_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) = driver_with_writer(
            ScriptedSource::endless(),
            annotator(1),
            dir.path(),
            Box::new(PhantomWriter),
        );

        driver.handle(SessionCommand::Start);
        driver.tick().unwrap();
        driver.handle(SessionCommand::SaveCurrent);

        let events = reporter.events();
        let last = events.last().unwrap();
        assert!(
            matches!(last, Event::Warning(msg) if msg.contains("was not found after writing")),
            "got {last:?}"
        );
        assert!(!events.iter().any(|e| matches!(e, Event::Saved(_))));
        assert!(driver.session().state().saved_image_paths().is_empty());
    }

    #[test]
    fn test_export_with_missing_image_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::endless(), annotator(1), dir.path());
        let dest = dir.path().join("out").join("images.zip");

        driver.handle(SessionCommand::Start);
        driver.tick().unwrap();
        driver.handle(SessionCommand::SaveCurrent);
        let saved = driver.session().state().saved_image_paths()[0].clone();
        std::fs::remove_file(&saved).unwrap();

        let flow = driver.handle(SessionCommand::ExportArchive(dest.clone()));

        assert!(flow.is_continue());
        let last = reporter.events().last().cloned().unwrap();
        assert!(
            matches!(&last, Event::Error(msg) if msg.contains("Failed to read saved image")),
            "got {last:?}"
        );
        assert!(!dest.exists());
    }

    #[test]
    fn test_start_twice_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, _) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());

        driver.handle(SessionCommand::Start);
        driver.handle(SessionCommand::Start);

        assert_eq!(
            reporter.events()[2],
            Event::Warning("Detection is already running".into())
        );
    }

    #[test]
    fn test_disconnect_while_running_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, _, counters) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(SessionCommand::Start).unwrap();
        drop(tx);

        driver.run(&rx);

        assert!(!driver.session().is_detecting());
        assert_eq!(counters.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_stop_while_idle_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut driver, reporter, counters) =
            driver(ScriptedSource::endless(), annotator(0), dir.path());

        driver.handle(SessionCommand::Stop);

        assert!(reporter.events().is_empty());
        assert_eq!(counters.lock().unwrap().closes, 0);
    }
}
