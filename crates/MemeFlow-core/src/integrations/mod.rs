pub mod gemini;
pub mod imgflip;

pub use gemini::GeminiClient;
pub use imgflip::{ImgflipCatalog, ImgflipClient};
