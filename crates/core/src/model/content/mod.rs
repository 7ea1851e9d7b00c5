pub mod media;
pub mod text;

pub use media::{ImageRef, MediaValidationError};
pub use text::{Locale, LocalizedText, TextError};
