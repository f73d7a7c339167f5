//! Controller integration tests
//!
//! Every test drives a real controller over in-memory definitions and
//! inspects the hook log written by [`support::Recorder`].

mod creation;
mod messaging;
mod support;
