pub mod buffer;
pub mod capture;
pub mod decode;
pub mod frame;
pub mod resample;

pub use buffer::{BufferSnapshot, StreamingAudioBuffer};
pub use capture::{CaptureSource, CaptureWorker};
pub use frame::AudioFrame;
