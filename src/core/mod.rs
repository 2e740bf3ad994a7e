pub mod realtime;
pub mod relay;
