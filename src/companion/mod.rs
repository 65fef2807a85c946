//! View-models of the companion app.
//!
//! Everything here is UI-toolkit agnostic: state is published on tokio
//! `watch` channels and views are plain structs a front end can render.

pub mod auth;
pub mod detail;
pub mod event;
pub mod gizmo;
pub mod load_state;
pub mod repository;
pub mod subscription;


pub use self::auth::{
    AuthActionResult, AuthProvider, AuthStateChange, AuthStateModel, AuthUser, AuthViewModel,
};
pub use self::detail::{GizmoDetailView, GizmoDetailViewModel, GizmoState};
pub use self::event::Event;
pub use self::gizmo::{Gizmo, Toggle, ToggleCommand};
pub use self::load_state::LoadState;
pub use self::repository::{FirestoreGizmoRepository, GizmoRepository, RepositoryError};
pub use self::subscription::Subscription;
