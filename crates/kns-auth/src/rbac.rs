//!
//! # Role based authorization
//!
//! A caller may use a verb on a kind when a role binding of the namespace
//! binds one of its groups and grants the verb. Mutating a named resource
//! additionally requires the namespace to be OWNER of it.
//!
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use kns_metadata::acl::AclResourceType;
use kns_metadata::extended::ResourceKind;
use kns_metadata::rolebinding::Verb;

use crate::{AuthContext, AuthError, Authorization, Identity, PolicySource};

#[derive(Debug)]
pub struct RbacAuthorization<P> {
    policy: Arc<P>,
}

impl<P> RbacAuthorization<P> {
    pub fn new(policy: Arc<P>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl<P: PolicySource> Authorization for RbacAuthorization<P> {
    type Context = RbacAuthContext<P>;

    async fn create_auth_context(
        &self,
        identity: &Identity,
        namespace: &str,
    ) -> Result<Self::Context, AuthError> {
        Ok(RbacAuthContext {
            policy: self.policy.clone(),
            identity: identity.clone(),
            namespace: namespace.to_owned(),
        })
    }
}

#[derive(Debug)]
pub struct RbacAuthContext<P> {
    policy: Arc<P>,
    identity: Identity,
    namespace: String,
}

impl<P: PolicySource> RbacAuthContext<P> {
    /// namespaces and role bindings are managed by admins only
    fn admin_only(ty: ResourceKind, action: Verb) -> bool {
        action.is_mutating() && matches!(ty, ResourceKind::Namespace | ResourceKind::RoleBinding)
    }

    async fn is_owner(&self, resource_type: AclResourceType, name: &str) -> Result<bool, AuthError> {
        let entries = self.policy.owner_entries(&self.namespace).await?;
        Ok(entries
            .iter()
            .any(|ace| ace.grants_ownership(&self.namespace, resource_type, name)))
    }
}

#[async_trait]
impl<P: PolicySource> AuthContext for RbacAuthContext<P> {
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn allow_type_action(&self, ty: ResourceKind, action: Verb) -> Result<bool, AuthError> {
        if self.identity.admin {
            return Ok(true);
        }
        if Self::admin_only(ty, action) {
            debug!("admin only");
            return Ok(false);
        }

        let bindings = self.policy.role_bindings(&self.namespace).await?;
        let allowed = bindings.iter().any(|binding| {
            binding.binds(&self.identity.principal, &self.identity.groups)
                && binding.grants(ty, action)
        });
        debug!(allowed, "type action");
        Ok(allowed)
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn allow_instance_action(
        &self,
        ty: ResourceKind,
        action: Verb,
        key: &str,
    ) -> Result<bool, AuthError> {
        if self.identity.admin {
            return Ok(true);
        }
        if !self.allow_type_action(ty, action).await? {
            return Ok(false);
        }
        // records without an ACE type belong to the namespace they are stored in
        let Some(resource_type) = AclResourceType::for_kind(ty) else {
            return Ok(true);
        };
        let owner = self.is_owner(resource_type, key).await?;
        debug!(owner, "instance action");
        Ok(owner)
    }
}

#[cfg(test)]
mod test {

    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use async_trait::async_trait;

    use kns_metadata::acl::{AccessControlEntrySpec, AclResourceType, Permission, ResourcePatternType};
    use kns_metadata::extended::ResourceKind;
    use kns_metadata::rolebinding::{RoleBindingSpec, Verb};

    use crate::{AuthError, Authorization, Identity, PolicySource};

    use super::RbacAuthorization;

    /// fixture policy, entries keyed by the namespace owning them
    #[derive(Debug, Default)]
    struct TestPolicy {
        bindings: RwLock<HashMap<String, Vec<RoleBindingSpec>>>,
        entries: RwLock<Vec<AccessControlEntrySpec>>,
    }

    #[async_trait]
    impl PolicySource for TestPolicy {
        async fn role_bindings(&self, namespace: &str) -> Result<Vec<RoleBindingSpec>, AuthError> {
            let bindings = self
                .bindings
                .read()
                .map_err(|err| AuthError::PolicySource(err.to_string()))?;
            Ok(bindings.get(namespace).cloned().unwrap_or_default())
        }

        async fn owner_entries(
            &self,
            namespace: &str,
        ) -> Result<Vec<AccessControlEntrySpec>, AuthError> {
            let entries = self
                .entries
                .read()
                .map_err(|err| AuthError::PolicySource(err.to_string()))?;
            Ok(entries
                .iter()
                .filter(|ace| ace.granted_to == namespace && ace.permission == Permission::Owner)
                .cloned()
                .collect())
        }
    }

    fn setup() -> (Arc<TestPolicy>, RbacAuthorization<TestPolicy>) {
        let policy = Arc::new(TestPolicy::default());
        policy.bindings.write().expect("lock").insert(
            "test".to_owned(),
            vec![RoleBindingSpec::for_group(
                "group1",
                &[ResourceKind::Topic, ResourceKind::AccessControlEntry],
                &[Verb::Get, Verb::Post, Verb::Delete],
            )],
        );
        (policy.clone(), RbacAuthorization::new(policy))
    }

    fn owner_ace() -> AccessControlEntrySpec {
        AccessControlEntrySpec::owner(
            AclResourceType::Topic,
            "test.",
            ResourcePatternType::Prefixed,
            "test",
        )
    }

    #[fluvio_future::test]
    async fn test_admin_always_allowed() {
        let (_, auth) = setup();
        let allowed = auth
            .authorize(
                &Identity::admin("admin"),
                "other",
                ResourceKind::Namespace,
                "other",
                Verb::Post,
            )
            .await
            .expect("authorize");
        assert!(allowed);
    }

    #[fluvio_future::test]
    async fn test_role_binding_required() {
        let (policy, auth) = setup();
        policy.entries.write().expect("lock").push(owner_ace());

        let member = Identity::new("alice", ["group1"]);
        let stranger = Identity::new("bob", ["group2"]);

        for (identity, expected) in [(member, true), (stranger, false)] {
            let allowed = auth
                .authorize(&identity, "test", ResourceKind::Topic, "test.topic", Verb::Post)
                .await
                .expect("authorize");
            assert_eq!(allowed, expected, "{}", identity.principal);
        }

        // verb not granted by the binding
        let allowed = auth
            .authorize(
                &Identity::new("alice", ["group1"]),
                "test",
                ResourceKind::Topic,
                "test.topic",
                Verb::Put,
            )
            .await
            .expect("authorize");
        assert!(!allowed);
    }

    async fn can_create(auth: &RbacAuthorization<TestPolicy>, name: &str) -> bool {
        auth.authorize(
            &Identity::new("alice", ["group1"]),
            "test",
            ResourceKind::Topic,
            name,
            Verb::Post,
        )
        .await
        .expect("authorize")
    }

    #[fluvio_future::test]
    async fn test_ownership_grant_and_revoke() {
        let (policy, auth) = setup();

        assert!(!can_create(&auth, "test.topic").await);

        policy.entries.write().expect("lock").push(owner_ace());
        assert!(can_create(&auth, "test.topic").await);
        assert!(!can_create(&auth, "prod.topic").await);

        policy.entries.write().expect("lock").clear();
        assert!(!can_create(&auth, "test.topic").await);
    }

    #[fluvio_future::test]
    async fn test_read_permission_does_not_own() {
        let (policy, auth) = setup();
        policy.entries.write().expect("lock").push(AccessControlEntrySpec {
            permission: Permission::Read,
            ..owner_ace()
        });
        let identity = Identity::new("alice", ["group1"]);

        let read = auth
            .authorize(&identity, "test", ResourceKind::Topic, "test.topic", Verb::Get)
            .await
            .expect("authorize");
        assert!(read);

        let write = auth
            .authorize(&identity, "test", ResourceKind::Topic, "test.topic", Verb::Delete)
            .await
            .expect("authorize");
        assert!(!write);
    }

    #[fluvio_future::test]
    async fn test_role_bindings_admin_only() {
        let (policy, auth) = setup();
        policy.bindings.write().expect("lock").insert(
            "test".to_owned(),
            vec![RoleBindingSpec::for_group(
                "group1",
                &[ResourceKind::RoleBinding],
                &[Verb::Get, Verb::Post],
            )],
        );
        let identity = Identity::new("alice", ["group1", "kns-admins"]);

        let allowed = auth
            .authorize(&identity, "test", ResourceKind::RoleBinding, "rb", Verb::Post)
            .await
            .expect("authorize");
        assert!(!allowed);

        let admin = identity.with_admin_group("kns-admins");
        let allowed = auth
            .authorize(&admin, "test", ResourceKind::RoleBinding, "rb", Verb::Post)
            .await
            .expect("authorize");
        assert!(allowed);
    }
}
