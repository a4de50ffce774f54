pub mod app;
pub mod events;
pub mod frame_clock;
pub mod orchestrator;
pub mod settings;
pub mod storage;
