//! A timing-based intermediate representation for infrared remote-control
//! codes, codecs for the common wire formats built on top of it (NEC, RC5,
//! Broadlink, Pronto), and a blind format-identification pipeline.
//!
//! [`raw::RawCode`] is the universal interchange currency: every format
//! lowers to it via `to_raw` and recovers from it via `from_code`. The
//! [`formats`] module is the registry tying names, text grammar, and struct
//! form together; [`identify`] ranks candidate formats against an
//! unlabelled trace.

pub mod code;
pub mod device;
pub mod error;
pub mod formats;
pub mod identify;
pub mod params;
pub mod pulse;
pub mod raw;

pub use error::{Error, Result};
