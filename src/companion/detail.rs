use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::auth::AuthProvider;
use super::gizmo::{Gizmo, Toggle, ToggleCommand};
use super::load_state::LoadState;
use super::repository::{GizmoRepository, RepositoryError};
use super::subscription::Subscription;

pub type GizmoState = LoadState<Option<Gizmo>>;

/// Shows one gizmo and flips its toggles.
pub struct GizmoDetailViewModel {
    auth: Arc<dyn AuthProvider>,
    repository: Arc<dyn GizmoRepository>,
    gizmo_id: Option<String>,
    state: Arc<watch::Sender<GizmoState>>,
    observation: Option<Subscription>,
}

impl GizmoDetailViewModel {
    pub fn new(auth: Arc<dyn AuthProvider>, repository: Arc<dyn GizmoRepository>) -> Self {
        let (state, _) = watch::channel(LoadState::Loading);
        Self {
            auth,
            repository,
            gizmo_id: None,
            state: Arc::new(state),
            observation: None,
        }
    }

    pub fn gizmo(&self) -> watch::Receiver<GizmoState> {
        self.state.subscribe()
    }

    pub fn gizmo_id(&self) -> Option<&str> {
        self.gizmo_id.as_deref()
    }

    pub fn is_observing(&self) -> bool {
        self.observation.as_ref().is_some_and(Subscription::is_active)
    }

    /// Observes `gizmo_id` for the current user. Setting the same id again
    /// keeps the running observation.
    pub fn set_gizmo_id(&mut self, gizmo_id: &str) {
        if self.gizmo_id.as_deref() == Some(gizmo_id) {
            return;
        }
        self.gizmo_id = Some(gizmo_id.to_string());
        self.observation = None;

        let Some(user) = self.auth.current_user().borrow().clone() else {
            self.state.send_replace(LoadState::Success(None));
            return;
        };

        self.state.send_replace(LoadState::Loading);
        let mut gizmos = self.repository.observe_gizmo(&user.uid, gizmo_id);
        let state = Arc::clone(&self.state);

        self.observation = Some(Subscription::spawn(async move {
            while let Some(item) = gizmos.next().await {
                match item {
                    Ok(gizmo) => {
                        state.send_replace(LoadState::Success(gizmo));
                    }
                    Err(e) => {
                        warn!(error = %e, "gizmo observation failed");
                        state.send_replace(LoadState::Error(e.to_string()));
                        break;
                    }
                }
            }
        }));
    }

    /// Asks for `toggle` to be flipped. Returns `Ok(None)` without sending
    /// anything when no user is signed in or no gizmo is selected.
    pub async fn on_toggle_clicked(
        &self,
        toggle: &Toggle,
    ) -> Result<Option<ToggleCommand>, RepositoryError> {
        let Some(gizmo_id) = self.gizmo_id.clone() else {
            return Ok(None);
        };
        let Some(user) = self.auth.current_user().borrow().clone() else {
            return Ok(None);
        };

        let command = ToggleCommand {
            user_id: user.uid,
            gizmo_id,
            toggle_id: toggle.id.clone(),
            on: !toggle.on,
            timestamp: chrono::Utc::now(),
        };
        self.repository.send_toggle_command(&command).await?;
        Ok(Some(command))
    }
}

/// What the detail screen displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GizmoDetailView {
    pub progress_visible: bool,
    pub content_visible: bool,
    pub name: String,
    pub toggles: String,
}

impl GizmoDetailView {
    /// Applies a state. Text is only replaced when there is a gizmo to show.
    pub fn bind(&mut self, state: &GizmoState) {
        let gizmo = match state {
            LoadState::Success(gizmo) => gizmo.as_ref(),
            _ => None,
        };

        self.content_visible = gizmo.is_some();
        if let Some(gizmo) = gizmo {
            self.name = gizmo.display_name.clone();
            self.toggles = gizmo
                .toggles
                .iter()
                .map(Toggle::summary)
                .collect::<Vec<_>>()
                .join("\n");
        }
        self.progress_visible = state.is_loading();
    }
}
