//! Client-side state and backend access for the spreadsheet merge service.
//!
//! The service itself parses and merges the files; this crate keeps the
//! picked files, the latest inspect results and the form options consistent,
//! and talks to the service over HTTP.

pub mod activity_log;
pub mod command;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod inspection;
pub mod registry;
pub mod sequencer;
pub mod settings;
pub mod view;

pub use command::{execute, BackendCommand, BackendOutcome};
pub use controller::{AppState, MergeController, UiAction};
pub use error::GatewayError;
pub use gateway::{HttpGateway, MergeBackend};
pub use registry::PickedFile;
pub use settings::{load_settings, ClientSettings};
pub use view::ViewModel;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
