use serde::{Deserialize, Serialize};

/// The subset of the Auth0 `/userinfo` response we rely on.
///
/// `sub` is the stable subject id (e.g. `google-oauth2|1234567890`) used as
/// the Firestore user id and as the Smart Home `agentUserId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
}
