pub mod analysis;
pub mod capture;
pub mod detection;
pub mod feedback;
pub mod pipeline;
pub mod shared;
