pub mod captions;

pub use captions::{CaptionChange, CaptionStore};
