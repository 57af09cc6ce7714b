//! Demo services shipped with the `remoting` binary.

pub mod services;
