pub mod endpoint_feedback_sink;
