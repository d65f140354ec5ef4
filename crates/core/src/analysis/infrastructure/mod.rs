pub mod endpoint_transport;
pub mod vision_model_transport;
