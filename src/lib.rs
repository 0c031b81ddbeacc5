pub mod config;
pub mod console_display;
pub mod continuation;
pub mod engine;
pub mod error;
pub mod event_reader;
pub mod groove;
pub mod harmony;
pub mod improvisation;
pub mod metrics;
pub mod note_buffer;
pub mod osc_sender;
pub mod session;
pub mod simulator;
pub mod trigger;
pub mod types;
pub mod validator;
