use async_trait::async_trait;

use crate::session::OwnerId;

/// Authorization gate for starting dictation sessions (external
/// collaborator). Checked before any session state is allocated.
#[async_trait]
pub trait Entitlement: Send + Sync {
    async fn can_use(&self, owner: &OwnerId) -> bool;
}

/// Permits every owner. The production default until a billing-backed
/// implementation is wired in upstream.
pub struct AllowAll;

#[async_trait]
impl Entitlement for AllowAll {
    async fn can_use(&self, _owner: &OwnerId) -> bool {
        true
    }
}
