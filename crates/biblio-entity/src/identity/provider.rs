//! Identity lookup seam over the external identity store.

use async_trait::async_trait;
use uuid::Uuid;

use biblio_core::AppResult;

use super::model::Identity;

/// Polymorphic identity lookup over the external system-of-record store.
///
/// A single `find_by_id` resolves identities of every role. The relational
/// store behind this trait (and credential validation against it) lives
/// outside this workspace.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Find an identity by id. Returns `None` if no row exists for any role.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Identity>>;
}
