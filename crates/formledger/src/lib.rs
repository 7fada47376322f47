//! `formledger` - Registration form server with CSV-backed storage
//!
//! Serves a registration form, appends accepted registrations to an
//! append-only CSV file and exposes a separate CSV dataset as JSON.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod registrant;
pub mod registration;
pub mod server;
pub mod storage;

pub use config::Config;
pub use dataset::{DatasetReader, Row};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use registrant::Registrant;
pub use registration::{Outcome, RegistrationForm};
pub use server::{build_router, AppState, Server};
pub use storage::{RecordSink, RecordStore, RecordWriter};
