use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::frame::Frame;

const CHANNEL_CAPACITY: usize = 4;

/// Attaches a transport to a freshly created feed. Called on every `open`.
pub type ConnectFn =
    Box<dyn FnMut(FrameFeed) -> Result<(), Box<dyn std::error::Error>> + Send>;

/// Sending half of a [`ChannelFrameSource`], handed to a push transport.
///
/// Clones share the same channel; the stream ends once every clone is
/// dropped.
#[derive(Clone)]
pub struct FrameFeed {
    tx: Sender<Frame>,
}

impl FrameFeed {
    /// Blocks while the source is full. Returns `false` once the source
    /// has been closed, which tells the transport to stop.
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Push-style source: frames arrive on the transport's schedule and the
/// session pulls one per tick.
pub struct ChannelFrameSource {
    description: String,
    dimensions: (u32, u32),
    connect: ConnectFn,
    rx: Option<Receiver<Frame>>,
}

impl ChannelFrameSource {
    pub fn new(description: impl Into<String>, connect: ConnectFn) -> Self {
        Self {
            description: description.into(),
            dimensions: (0, 0),
            connect,
            rx: None,
        }
    }

    /// Dimensions reported by `open`, when the transport knows them up front.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }
}

impl FrameSource for ChannelFrameSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        self.close();

        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        (self.connect)(FrameFeed { tx })?;
        self.rx = Some(rx);

        Ok(SourceInfo {
            width: self.dimensions.0,
            height: self.dimensions.1,
            fps: 0.0,
            description: self.description.clone(),
        })
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let rx = self
            .rx
            .as_ref()
            .ok_or("ChannelFrameSource: not opened")?;
        Ok(rx.recv().ok())
    }

    fn close(&mut self) {
        // Dropping the receiver makes pending and future pushes fail.
        self.rx = None;
    }
}
