pub mod convert;
pub mod error;
pub mod expression;
pub mod mapping;
pub mod params;
pub mod parse;
pub mod platform;
pub mod validate;
pub mod wasm;

pub use convert::{ConversionOptions, ConversionResult, convert, convert_json, convert_workflow};
pub use error::ConversionError;
pub use platform::{Direction, Platform};
