pub mod auth;
pub mod datastore;
pub mod storage;
pub mod webhook;

pub use auth::{AuthClient, AuthError, AuthSession, AuthUser, SignUpOutcome};
pub use datastore::DataClient;
pub use storage::StorageClient;
pub use webhook::{ResumeEvent, WebhookNotifier};
