use crate::shared::frame::Frame;

/// What a source reports once it is open.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// 0.0 when the source does not know its rate.
    pub fps: f64,
    pub description: String,
}

/// A live or recorded supply of BGR frames, pulled one per tick.
///
/// Sources can be reopened after `close` to start a fresh sequence.
/// `next_frame` returns `Ok(None)` when the stream has ended normally and
/// `Err` when acquisition failed. `close` must be idempotent.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device, file or transport held by the source.
    fn close(&mut self);
}
