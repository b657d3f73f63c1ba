//! paramwiz - an interactive parameter wizard.
//!
//! Given a target function's declared signature, the wizard prompts for each
//! parameter, evaluates and type-checks every answer, offers to save and
//! restore configurations, and finally invokes the target.

pub mod config;
pub mod eval;
pub mod filename;
pub mod io;
pub mod logging;
pub mod schema;
pub mod store;
pub mod targets;
pub mod wizard;

pub use wizard::{Arguments, Collection, Wizard};
