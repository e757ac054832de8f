use std::io::{ErrorKind, Read};
use std::thread::JoinHandle;

use crate::capture::infrastructure::channel_frame_source::{ChannelFrameSource, FrameFeed};
use crate::shared::frame::Frame;

/// Reads fixed-size raw BGR24 frames from a byte stream and pushes them
/// into a [`FrameFeed`] on its own thread.
///
/// Typical use is `ffmpeg ... -f rawvideo -pix_fmt bgr24 - | facecap live --pipe WxH`.
pub struct RawPipeTransport<R> {
    reader: R,
    width: u32,
    height: u32,
}

impl<R: Read + Send + 'static> RawPipeTransport<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            width,
            height,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Starts the reader thread. The handle yields the number of frames
    /// pushed before the stream ended or the source hung up.
    pub fn spawn(self, feed: FrameFeed) -> std::io::Result<JoinHandle<usize>> {
        std::thread::Builder::new()
            .name("raw-pipe".into())
            .spawn(move || self.run(feed))
    }

    fn run(mut self, feed: FrameFeed) -> usize {
        let frame_len = self.frame_len();
        let mut pushed = 0;

        loop {
            let mut buf = vec![0u8; frame_len];
            match self.reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    log::debug!("Raw pipe reached end of stream after {pushed} frames");
                    break;
                }
                Err(e) => {
                    log::warn!("Raw pipe read failed after {pushed} frames: {e}");
                    break;
                }
            }

            let frame = Frame::new(buf, self.width, self.height, 3, pushed);
            if !feed.push(frame) {
                break;
            }
            pushed += 1;
        }

        pushed
    }
}

/// Builds a push source that starts a new [`RawPipeTransport`] over
/// `open_reader()` each time the session opens it.
pub fn raw_pipe_source<R, F>(width: u32, height: u32, mut open_reader: F) -> ChannelFrameSource
where
    R: Read + Send + 'static,
    F: FnMut() -> R + Send + 'static,
{
    ChannelFrameSource::new(
        format!("raw bgr24 pipe {width}x{height}"),
        Box::new(move |feed: FrameFeed| {
            RawPipeTransport::new(open_reader(), width, height).spawn(feed)?;
            Ok(())
        }),
    )
    .with_dimensions(width, height)
}
