use crate::db::OrderStore;
use crate::order::{UserId, UserRole};

/// Role used when nothing better is known, it can barely do anything
pub const FALLBACK_ROLE: UserRole = UserRole::Seller;

/// Resolves the caller's role once per session
///
/// The profile's `user_type` in the store wins. If the store can't be
/// reached, or has no usable value, `persisted` (what was cached on the
/// device last time) is used instead. Values that aren't a known role are
/// ignored.
pub async fn resolve_role<S: OrderStore>(
    store: &mut S,
    uid: UserId,
    persisted: Option<&str>,
) -> UserRole {
    let from_profile = match store.profile_role(uid).await {
        Ok(user_type) => user_type.as_deref().and_then(UserRole::from_id),
        Err(e) => {
            log::warn!("resolve_role {uid}: profile lookup failed: {e:?}");
            None
        }
    };
    if let Some(role) = from_profile {
        log::debug!("resolve_role {uid}: {role} from profile");
        return role
    }

    if let Some(role) = persisted.and_then(UserRole::from_id) {
        log::debug!("resolve_role {uid}: {role} from persisted value");
        return role
    }

    log::info!("resolve_role {uid}: falling back to {}", FALLBACK_ROLE);
    FALLBACK_ROLE
}
