use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Sender;

use facecap_core::annotation::annotate_image_use_case::AnnotateImageUseCase;
use facecap_core::annotation::frame_annotator::FrameAnnotator;
use facecap_core::annotation::infrastructure::rectangle_painter::RectanglePainter;
use facecap_core::archive::infrastructure::jpeg_file_writer::JpegFileWriter;
use facecap_core::archive::saved_image_archive::SavedImageArchive;
use facecap_core::capture::domain::frame_source::FrameSource;
use facecap_core::capture::infrastructure::raw_pipe_transport::raw_pipe_source;
use facecap_core::capture::infrastructure::still_image_frame_source::StillImageFrameSource;
use facecap_core::capture::infrastructure::video_file_frame_source::VideoFileFrameSource;
use facecap_core::detection::domain::detection_config::DetectionConfig;
use facecap_core::detection::domain::face_detector::FaceDetector;
use facecap_core::session::capture_session::CaptureSession;
use facecap_core::session::session_driver::{SessionCommand, SessionDriver};
use facecap_core::session::session_reporter::{LogSessionReporter, SessionReporter};
use facecap_core::shared::detection::Detection;
use facecap_core::shared::frame::Frame;
use facecap_core::shared::constants::IMAGE_EXTENSIONS;
use facecap_core::shared::settings::SessionSettings;

/// Live face detection with Viola-Jones cascades.
#[derive(Parser)]
#[command(name = "facecap", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect faces on a live source; type `s` to save a frame, `q` to stop.
    Live(LiveArgs),
    /// Draw detected faces onto a single image.
    Annotate(AnnotateArgs),
}

#[derive(Args)]
struct DetectionArgs {
    /// Scale step between detection window sizes (1.1-2.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Neighbouring hits needed to keep a detection (1-10).
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Rectangle colour as #RRGGBB.
    #[arg(long)]
    color: Option<String>,

    /// Cascade classifier XML (downloaded on first use if omitted).
    #[arg(long)]
    cascade: Option<PathBuf>,
}

#[derive(Args)]
struct LiveArgs {
    /// Camera device index.
    #[arg(long, conflicts_with_all = ["video", "pipe"])]
    camera: Option<i32>,

    /// Replay a video file instead of a camera.
    #[arg(long, conflicts_with = "pipe")]
    video: Option<PathBuf>,

    /// Read raw BGR24 frames of the given size from stdin.
    #[arg(long, value_name = "WxH")]
    pipe: Option<String>,

    /// Directory for saved images.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Where to write the archive on exit (default: <output-dir>/images.zip).
    #[arg(long)]
    archive: Option<PathBuf>,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Args)]
struct AnnotateArgs {
    /// Input image (or video; the first frame is used).
    input: PathBuf,

    /// Output JPEG file.
    output: PathBuf,

    #[command(flatten)]
    detection: DetectionArgs,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = SessionSettings::init();

    match cli.command {
        Command::Live(args) => {
            validate_live(&args)?;
            run_live(args, settings)
        }
        Command::Annotate(args) => {
            validate_annotate(&args)?;
            run_annotate(args, settings)
        }
    }
}

fn run_live(args: LiveArgs, settings: SessionSettings) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&settings.detection, &args.detection)?;
    let cascade = args
        .detection
        .cascade
        .as_deref()
        .or(settings.cascade_path.as_deref());
    let detector = build_detector(cascade)?;
    let annotator = FrameAnnotator::new(detector, Box::new(RectanglePainter::default()));

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.clone());
    let archive = SavedImageArchive::new(output_dir, Box::new(JpegFileWriter::default()));
    let archive_path = args
        .archive
        .clone()
        .unwrap_or_else(|| archive.default_archive_path());

    let source = build_source(&args, &settings)?;
    let session = CaptureSession::new(source, annotator, archive);

    let (tx, rx) = crossbeam_channel::unbounded();
    if args.pipe.is_some() {
        log::info!("stdin carries frames; interactive commands are disabled");
        drop(tx);
    } else {
        eprintln!("Type `s` + Enter to save the current frame, `q` + Enter to stop.");
        spawn_command_reader(tx)?;
    }

    let reporter = ConsoleReporter::new(std::io::stderr());
    let mut driver = SessionDriver::new(session, config, Box::new(reporter));
    let result = driver.run_until_idle(&rx);
    driver.handle(SessionCommand::ExportArchive(archive_path));
    result?;
    Ok(())
}

fn run_annotate(
    args: AnnotateArgs,
    settings: SessionSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&settings.detection, &args.detection)?;
    let cascade = args
        .detection
        .cascade
        .as_deref()
        .or(settings.cascade_path.as_deref());
    let detector = build_detector(cascade)?;
    let annotator = FrameAnnotator::new(detector, Box::new(RectanglePainter::default()));

    let source: Box<dyn FrameSource> = if is_image(&args.input) {
        Box::new(StillImageFrameSource::new(&args.input))
    } else {
        Box::new(VideoFileFrameSource::new(&args.input))
    };

    let mut use_case =
        AnnotateImageUseCase::new(source, Box::new(JpegFileWriter::default()), annotator);
    let detections = use_case.execute(&args.output, &config)?;
    println!("{} face(s) found", detections.len());
    Ok(())
}

/// Command-line flags override the persisted detection settings.
fn resolve_config(
    base: &DetectionConfig,
    args: &DetectionArgs,
) -> Result<DetectionConfig, Box<dyn std::error::Error>> {
    let mut config = base.clone();
    if let Some(scale) = args.scale_factor {
        config.set_scale_factor(scale)?;
    }
    if let Some(neighbors) = args.min_neighbors {
        config.set_min_neighbors(neighbors)?;
    }
    if let Some(color) = &args.color {
        config.set_box_color_hex(color)?;
    }
    Ok(config)
}

fn build_source(
    args: &LiveArgs,
    settings: &SessionSettings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if let Some(dims) = &args.pipe {
        let (width, height) = parse_dimensions(dims)?;
        return Ok(Box::new(raw_pipe_source(width, height, std::io::stdin)));
    }
    if let Some(video) = &args.video {
        return Ok(Box::new(VideoFileFrameSource::new(video)));
    }
    camera_source(args.camera.unwrap_or(settings.camera_index), settings)
}

#[cfg(feature = "opencv")]
fn camera_source(
    index: i32,
    settings: &SessionSettings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use facecap_core::capture::infrastructure::camera_frame_source::CameraFrameSource;

    Ok(Box::new(
        CameraFrameSource::new(index)
            .with_resolution(settings.capture_width, settings.capture_height),
    ))
}

#[cfg(not(feature = "opencv"))]
fn camera_source(
    _index: i32,
    _settings: &SessionSettings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("Camera capture needs the `opencv` feature; use --video or --pipe".into())
}

#[cfg(feature = "opencv")]
fn build_detector(
    cascade: Option<&Path>,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    use facecap_core::detection::infrastructure::cascade_face_detector::CascadeFaceDetector;
    use facecap_core::detection::infrastructure::cascade_resolver;
    use facecap_core::shared::constants::{CASCADE_MODEL_NAME, CASCADE_MODEL_URL};

    let path = match cascade {
        Some(path) => path.to_path_buf(),
        None => {
            log::info!("Resolving classifier: {CASCADE_MODEL_NAME}");
            let path = cascade_resolver::resolve(
                CASCADE_MODEL_NAME,
                CASCADE_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(Box::new(CascadeFaceDetector::new(&path)?))
}

#[cfg(not(feature = "opencv"))]
fn build_detector(
    _cascade: Option<&Path>,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    Err("facecap was built without the `opencv` feature; no face detector is available".into())
}

fn spawn_command_reader(tx: Sender<SessionCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let command = match line.trim() {
                    "s" | "save" => SessionCommand::SaveCurrent,
                    "q" | "quit" | "stop" => SessionCommand::Stop,
                    "" => continue,
                    other => {
                        eprintln!("Unknown command '{other}' (s = save, q = stop)");
                        continue;
                    }
                };
                if tx.send(command).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

fn validate_live(args: &LiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(video) = &args.video {
        if !video.exists() {
            return Err(format!("Video file not found: {}", video.display()).into());
        }
    }
    if let Some(dims) = &args.pipe {
        parse_dimensions(dims)?;
    }
    if let Some(camera) = args.camera {
        if camera < 0 {
            return Err(format!("Camera index must be non-negative, got {camera}").into());
        }
    }
    validate_detection(&args.detection)
}

fn validate_annotate(args: &AnnotateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input.exists() {
        return Err(format!("Input file not found: {}", args.input.display()).into());
    }
    let is_jpeg = args
        .output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if !is_jpeg {
        return Err(format!(
            "Output must be a .jpg or .jpeg file, got {}",
            args.output.display()
        )
        .into());
    }
    validate_detection(&args.detection)
}

fn validate_detection(args: &DetectionArgs) -> Result<(), Box<dyn std::error::Error>> {
    resolve_config(&DetectionConfig::default(), args)?;
    if let Some(cascade) = &args.cascade {
        if !cascade.exists() {
            return Err(format!("Cascade file not found: {}", cascade.display()).into());
        }
    }
    Ok(())
}

/// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
fn parse_dimensions(s: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse()?;
    let height: u32 = h.trim().parse()?;
    if width == 0 || height == 0 {
        return Err(format!("Frame size must be non-zero, got {width}x{height}").into());
    }
    Ok((width, height))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(feature = "opencv")]
fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face classifier... {pct}%");
    } else {
        eprint!("\rDownloading face classifier... {downloaded} bytes");
    }
}

/// Prints session messages to the terminal regardless of `RUST_LOG`.
/// Frame tallies and the end-of-session summary go to the log.
struct ConsoleReporter<W: Write + Send> {
    out: W,
    log: LogSessionReporter,
}

impl<W: Write + Send> ConsoleReporter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            log: LogSessionReporter::default(),
        }
    }

    fn line(&mut self, prefix: &str, message: &str) {
        let _ = writeln!(self.out, "{prefix}{message}");
    }
}

impl<W: Write + Send> SessionReporter for ConsoleReporter<W> {
    fn frame(&mut self, frame: &Frame, detections: &[Detection]) {
        self.log.frame(frame, detections);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.log.timing(stage, duration_ms);
    }

    fn success(&mut self, message: &str) {
        self.line("", message);
    }

    fn info(&mut self, message: &str) {
        self.line("", message);
    }

    fn warning(&mut self, message: &str) {
        self.line("Warning: ", message);
    }

    fn error(&mut self, message: &str) {
        self.line("Error: ", message);
    }

    fn image_saved(&mut self, path: &Path) {
        self.line("", &format!("Image saved as {}", path.display()));
    }

    fn archive_exported(&mut self, path: &Path) {
        self.line("", &format!("Archive written to {}", path.display()));
    }

    fn summary(&mut self) {
        self.log.summary();
    }
}
