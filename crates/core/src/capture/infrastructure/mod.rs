#[cfg(feature = "opencv")]
pub mod camera_frame_source;
pub mod channel_frame_source;
pub mod raw_pipe_transport;
pub mod still_image_frame_source;
pub mod video_file_frame_source;
