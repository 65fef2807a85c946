use std::sync::Arc;
use tokio::sync::watch;

use super::event::Event;
use super::subscription::Subscription;

/// The signed-in user as seen by the companion app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStateChange {
    SignedIn,
    SignedOut,
    UserChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateModel {
    pub auth_state_change: AuthStateChange,
    pub user: Option<AuthUser>,
}

/// Outcome of a sign-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthActionResult {
    Success,
    Cancel,
    Fail,
}

/// Identity backend of the companion app.
pub trait AuthProvider: Send + Sync {
    /// Launches the sign-in flow. Its outcome comes back through
    /// [`AuthViewModel::on_auth_result`].
    fn start_sign_in(&self);

    fn sign_out(&self);

    /// The current user, updated on every sign-in, sign-out or refresh.
    fn current_user(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Classifies a change of the current user. Refreshes of the same user are
/// not a change.
pub fn auth_state_change(
    previous: Option<&AuthUser>,
    current: Option<&AuthUser>,
) -> Option<AuthStateChange> {
    match (previous, current) {
        (None, Some(_)) => Some(AuthStateChange::SignedIn),
        (Some(_), None) => Some(AuthStateChange::SignedOut),
        (Some(a), Some(b)) if a.uid != b.uid => Some(AuthStateChange::UserChanged),
        _ => None,
    }
}

type EventChannel<T> = watch::Sender<Option<Event<T>>>;

pub struct AuthViewModel {
    provider: Arc<dyn AuthProvider>,
    auth_state: Arc<EventChannel<AuthStateModel>>,
    action_result: EventChannel<AuthActionResult>,
    _observation: Subscription,
}

impl AuthViewModel {
    /// Starts observing `provider`. Must be called within a tokio runtime.
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (auth_state, _) = watch::channel(None);
        let auth_state = Arc::new(auth_state);
        let (action_result, _) = watch::channel(None);

        let observation = Subscription::spawn(observe_user(
            provider.current_user(),
            Arc::clone(&auth_state),
        ));

        Self {
            provider,
            auth_state,
            action_result,
            _observation: observation,
        }
    }

    pub fn sign_in(&self) {
        self.provider.start_sign_in();
    }

    pub fn sign_out(&self) {
        self.provider.sign_out();
    }

    pub fn on_auth_result(&self, result: AuthActionResult) {
        self.action_result.send_replace(Some(Event::new(result)));
    }

    pub fn auth_state(&self) -> watch::Receiver<Option<Event<AuthStateModel>>> {
        self.auth_state.subscribe()
    }

    pub fn auth_action_result(&self) -> watch::Receiver<Option<Event<AuthActionResult>>> {
        self.action_result.subscribe()
    }
}

async fn observe_user(
    mut users: watch::Receiver<Option<AuthUser>>,
    auth_state: Arc<EventChannel<AuthStateModel>>,
) {
    let mut previous = users.borrow_and_update().clone();
    let initial = if previous.is_some() {
        AuthStateChange::SignedIn
    } else {
        AuthStateChange::SignedOut
    };
    auth_state.send_replace(Some(Event::new(AuthStateModel {
        auth_state_change: initial,
        user: previous.clone(),
    })));

    while users.changed().await.is_ok() {
        let current = users.borrow_and_update().clone();
        if let Some(change) = auth_state_change(previous.as_ref(), current.as_ref()) {
            auth_state.send_replace(Some(Event::new(AuthStateModel {
                auth_state_change: change,
                user: current.clone(),
            })));
        }
        previous = current;
    }
}
