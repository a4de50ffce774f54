pub mod audio;
pub mod midi;
