pub mod detection_loop;
pub mod pipeline_logger;
pub mod scan_mood_use_case;
