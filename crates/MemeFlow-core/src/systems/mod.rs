pub mod generation;
pub mod scheduler;

pub use generation::CaptionGenerator;
pub use scheduler::{PreviewState, RenderRequest, RenderScheduler, Resolution};
