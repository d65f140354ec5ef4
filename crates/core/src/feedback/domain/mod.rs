pub mod feedback_store;
pub mod fingerprint;
