//! Terminal UI module using ratatui.
//!
//! - `render`: Frame layout, guard states and overlays
//! - `input`: Keyboard event handling
//! - `styles`: Color schemes and text styling
//! - `views`: Per-route content (sign-in, registration, dashboards)

pub mod input;
pub mod render;
pub mod styles;
pub mod views;
