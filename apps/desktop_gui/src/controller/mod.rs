//! Controller glue for the desktop window: bridge events and command queueing.

pub mod events;
pub mod orchestration;
