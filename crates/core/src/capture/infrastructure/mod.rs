pub mod capture_encoder;
pub mod image_sequence_source;
