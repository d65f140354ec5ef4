pub mod error;
pub mod mood;
pub mod prompt;
pub mod response_parser;
pub mod transport;
pub mod wire;
