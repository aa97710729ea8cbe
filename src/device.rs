//! The transport boundary: this crate owns the wire codecs, never a
//! concrete USB/network blaster.

use crate::error::Error;
use crate::raw::RawCode;

/// A thing that can emit and capture raw pulse trains. No implementation
/// ships here; a collaborator crate plugs in a concrete transport.
///
/// Adapting a typed code (e.g. `BroadlinkCode`) to whatever wire shape a
/// device actually wants is the caller's job, done before `transmit` is
/// called.
pub trait Device {
    fn transmit(&mut self, code: &RawCode) -> Result<(), Error>;
    fn receive(&mut self) -> Result<RawCode, Error>;
}
