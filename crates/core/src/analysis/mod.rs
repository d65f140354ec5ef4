pub mod domain;
pub mod infrastructure;
pub mod mood_analysis_client;
