pub mod detection_smoother;
pub mod detector;
pub mod face_region;
