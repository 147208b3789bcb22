use std::fmt::Debug;

use async_trait::async_trait;

use kns_metadata::acl::AccessControlEntrySpec;
use kns_metadata::extended::ResourceKind;
use kns_metadata::rolebinding::{RoleBindingSpec, Verb};

use super::{AuthError, Identity};

#[async_trait]
pub trait AuthContext: Debug + Send + Sync + 'static {
    /// check if verb is allowed on the kind as a whole
    async fn allow_type_action(&self, ty: ResourceKind, action: Verb) -> Result<bool, AuthError>;

    /// check if verb is allowed on a specific named resource
    async fn allow_instance_action(
        &self,
        ty: ResourceKind,
        action: Verb,
        key: &str,
    ) -> Result<bool, AuthError>;
}

#[async_trait]
pub trait Authorization: Debug + Send + Sync + 'static {
    type Context: AuthContext;

    /// create auth context for a caller acting inside a namespace
    async fn create_auth_context(
        &self,
        identity: &Identity,
        namespace: &str,
    ) -> Result<Self::Context, AuthError>;

    /// allow|deny for a single request, mutating verbs also need ownership
    async fn authorize(
        &self,
        identity: &Identity,
        namespace: &str,
        ty: ResourceKind,
        name: &str,
        action: Verb,
    ) -> Result<bool, AuthError> {
        let ctx = self.create_auth_context(identity, namespace).await?;
        if !ctx.allow_type_action(ty, action).await? {
            return Ok(false);
        }
        if action.is_mutating() {
            ctx.allow_instance_action(ty, action, name).await
        } else {
            Ok(true)
        }
    }
}

/// Read access to the data authorization decisions are computed from.
/// Implementations must return current data, decisions are never cached.
#[async_trait]
pub trait PolicySource: Debug + Send + Sync + 'static {
    /// role bindings stored in a namespace
    async fn role_bindings(&self, namespace: &str) -> Result<Vec<RoleBindingSpec>, AuthError>;

    /// OWNER entries granted to a namespace, whichever namespace granted them
    async fn owner_entries(
        &self,
        namespace: &str,
    ) -> Result<Vec<AccessControlEntrySpec>, AuthError>;
}
