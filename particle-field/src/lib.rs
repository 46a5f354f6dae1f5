// particle-field - Floating sprite background for the invitation page
//
// Layers:
//   sim/     particle state: spawn, rise, recycle, sway
//   render   particle state -> inline CSS declarations
//   engine   load / start / stop state machine over a `Host`
//   dom/     browser host, sprite loading, wasm exports (wasm32 only)
//
// Everything above dom/ is plain Rust and tests natively.

pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod dom;

pub use config::{BackgroundConfig, FieldConfig, Range, asset_url};
pub use engine::{Engine, Host};
pub use error::FieldError;
pub use sim::{Field, Size};
