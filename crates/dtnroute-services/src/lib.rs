//! dtnroute-services — routing state and the per-connection event loop.

pub mod cla;
pub mod delivery;
pub mod dispatch;
pub mod peer;
pub mod session;

pub use cla::match_clas;
pub use delivery::DeliveryTracker;
pub use dispatch::{DispatchStats, Dispatcher};
pub use peer::PeerDirectory;
pub use session::{Session, SessionEnd, SessionError};
