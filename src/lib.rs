//! Blocking Wi-Fi management and one-shot HTTP client services over a
//! pluggable network stack driver.
//!
//! The stack itself (association handshake, TCP/IP) lives behind the
//! [`wifi::WifiDriver`] seam; this crate supplies the typed service layer on
//! top of it, the event plumbing connecting the two, and an in-process
//! simulated driver so the demo programs and the test-suite run without a
//! radio.

pub mod errors;
pub mod eventloop;
pub mod http;
pub mod log;
pub mod sim;
pub mod socket;
pub mod wifi;
