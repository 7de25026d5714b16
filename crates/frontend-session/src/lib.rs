//! Front-end side of the assessment bridge.
//!
//! Hosts the named service the helper connects to, decodes the helper's
//! pushes into a [`SessionView`] and sends the front-end's requests.

mod error;
mod launcher;
mod session;
mod view;

pub use error::{SessionError, SessionResult};
pub use launcher::{launch_helper, HelperProcess};
pub use session::{FormalRequestOutcome, FrontendSession, ViewUpdate};
pub use view::SessionView;
