//! turnloop: a conversational tool-use loop.
//!
//! A user talks to a language model that may, instead of answering, ask for
//! registered local functions to be run. The loop runs them, feeds the
//! results back, and re-queries until the model produces a plain reply.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnloop::prelude::*;
//! use turnloop::tools::builtin::FlightDesk;
//!
//! # async fn example() -> turnloop::error::Result<()> {
//! let config = SessionConfig::from_env()?;
//! let desk = Arc::new(FlightDesk::default());
//! let mut registry = ToolRegistry::new();
//! for tool in FlightDesk::tools(&desk) {
//!     registry.register(tool)?;
//! }
//!
//! let endpoint = OpenAiResponsesEndpoint::new(
//!     config.model.clone(),
//!     config.require_api_key()?,
//!     Some(config.base_url.clone()),
//! );
//! let mut turn_loop = TurnLoop::new(Arc::new(endpoint), Arc::new(registry), config.loop_settings());
//! turn_loop.run(&mut StdConsole::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
