//! Element identity and selector synthesis.
//!
//! A [`picker::session::PickerSession`] turns pointer input into a chosen
//! element, the [`synth::synthesizer::Synthesizer`] derives unique selectors
//! and a snapshot for it, and the [`registry::registry::ElementRegistry`]
//! keeps named records across page loads.

pub mod cli;
pub mod dom;
pub mod picker;
pub mod registry;
pub mod synth;
