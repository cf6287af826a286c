//! concrete [HttpPort][crate::http_port::HttpPort] implementations, as
//! opposed to the port itself, which is transport-agnostic.

#[cfg(feature = "xitca-transport")]
mod xitca;

#[cfg(feature = "xitca-transport")]
pub use xitca::XitcaTransport;
