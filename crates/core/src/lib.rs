//! Plex now-playing resolution
//!
//! Turns a `/status/sessions` listing into a single "is currently watching"
//! line for the preferred player, and builds the player directory used to
//! pick that preference.

pub mod command;
pub mod directory;
pub mod error;
pub mod models;
pub mod preferences;
pub mod resolver;
pub mod traits;

pub use command::*;
pub use directory::*;
pub use error::*;
pub use models::*;
pub use preferences::*;
pub use resolver::*;
pub use traits::*;
