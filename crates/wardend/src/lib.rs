//! wardend library surface: the IPC server and wire protocol.
//!
//! Split out of the binary so integration tests and future clients can
//! speak the protocol with the same types.

pub mod ipc;
pub mod proto;
