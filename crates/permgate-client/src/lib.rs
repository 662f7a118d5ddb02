//! # Permgate Client
//!
//! Presentation-tier capability checks.
//!
//! Everything here is advisory. It decides whether to *show* an action; the
//! server guard still decides whether the action is *allowed*. Nothing in
//! this crate depends on `permgate-guard`, so there is no path by which a
//! client check can stand in for a server one.
//!
//! The same [`permgate_core::matches_any`] backs both tiers, so a button is
//! hidden exactly when the server would refuse it.
//!
//! ## Example
//!
//! ```rust
//! use permgate_client::{CapabilityGate, ClientSession, SessionView, Visibility};
//! use permgate_core::Principal;
//!
//! let principal = Principal::new("u-1").with_permissions(["apikey:create:own"]);
//! let view = SessionView::Authenticated(ClientSession::from(&principal));
//!
//! let gate = CapabilityGate::new().permission(["apikey:create:own"]);
//! assert_eq!(gate.evaluate(&view), Visibility::Show);
//! assert_eq!(gate.evaluate(&SessionView::Loading), Visibility::Fallback);
//! ```

pub mod feed;
pub mod gate;
pub mod session;

pub use feed::{GateWatcher, SessionFeed};
pub use gate::{permission_status, role_status, Capability, CapabilityGate, Visibility};
pub use session::{ClientSession, SessionView};
