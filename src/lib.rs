// Library root
// -----------
// This crate exposes the pieces of the n8n workflow CLI. The binary
// (`main.rs`) wires them together and runs the interactive menu.
//
// Module responsibilities:
// - `config`: environment / `.env` settings loaded once at startup.
// - `api`: blocking HTTP client for the n8n public REST API.
// - `model`: workflow and tag documents plus request payloads.
// - `store`: the local `workflows/` and `backups/` directories.
// - `compare`: workflow equality and file/API reconciliation.
// - `prompt`: the input seam used by every interactive flow.
// - `ui`, `upload`, `sync`, `tags`: the menu and its flows.
pub mod api;
pub mod compare;
pub mod config;
pub mod error;
pub mod model;
pub mod prompt;
pub mod store;
pub mod sync;
pub mod tags;
pub mod ui;
pub mod upload;
