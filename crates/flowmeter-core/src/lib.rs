//! flowmeter-core: Core types, traits, and error definitions for flowmeter.
//!
//! This crate defines the values that flow out of the pulse detector and
//! the collaborator boundary that feeds bytes into it. Renderers,
//! statistics collectors, and capture backends depend on these types
//! without pulling in the detector.
//!
//! # Key types
//!
//! - [`Sample`] / [`Pulse`] / [`Reading`] -- detector output
//! - [`MeterId`] -- which flow meter a pulse came from
//! - [`PcmSource`] -- byte-level producer of PCM audio
//! - [`FlowEvent`] -- stream notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod source;
pub mod types;

pub use error::{Error, Result};
pub use events::FlowEvent;
pub use source::PcmSource;
pub use types::*;
