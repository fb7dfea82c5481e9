pub mod app;
pub mod color;
pub mod key;

pub use app::{App, WindowConfig};
pub use color::Color;
pub use key::Key;
