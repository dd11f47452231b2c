//! Background worker that runs backend commands off the UI thread.

pub mod runtime;
