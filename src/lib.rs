//! QuickDesk helpdesk service - library exports for the server, the seeding
//! tool and the tests.

pub mod api;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::core::assistant::SuggestionTask;
use tokio::sync::OnceCell;
use tokio::sync::mpsc;

/// Queue of the reply assistant worker, set once by `main`.
pub static SUGGESTION_SENDER: OnceCell<mpsc::Sender<SuggestionTask>> = OnceCell::const_new();
