#[cfg(feature = "opencv")]
pub mod cascade_face_detector;
pub mod cascade_resolver;
