pub mod events;

pub use events::{EditorEvent, EditorEventBus};
