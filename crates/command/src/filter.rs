//! Composable predicates gating handler invocation.

use std::sync::Arc;

use kotori_protocol::Event;
use kotori_rbac::{RbacService, roles};

/// A predicate over `(event, rbac)`. Deny short-circuits dispatch before
/// any binding happens.
#[derive(Clone)]
pub enum Filter {
    /// Group messages only.
    Group,
    /// Private messages only.
    Private,
    /// Sender holds the `admin` role (directly or via inheritance).
    Admin,
    /// Sender holds the `root` role.
    Root,
    /// Sender is a group administrator or owner, per the sender block.
    GroupAdmin,
    /// Sender is the group owner.
    GroupOwner,
    /// Arbitrary user predicate over the event.
    Custom(Arc<dyn Fn(&Event) -> bool + Send + Sync>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Build a custom filter from a plain closure.
    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            },
            first => Self::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            },
            first => Self::Or(vec![first, other]),
        }
    }

    /// Evaluate against an event. Role filters consult RBAC with the
    /// sender's user id; events without a sender are denied by those.
    pub fn allows(&self, event: &Event, rbac: &mut RbacService) -> bool {
        match self {
            Self::Group => matches!(event, Event::GroupMessage(_)),
            Self::Private => matches!(event, Event::PrivateMessage(_)),
            Self::Admin => Self::has_role(event, rbac, roles::ADMIN),
            Self::Root => Self::has_role(event, rbac, roles::ROOT),
            Self::GroupAdmin => event.sender().is_some_and(|s| s.is_group_admin()),
            Self::GroupOwner => event.sender().is_some_and(|s| s.is_group_owner()),
            Self::Custom(predicate) => predicate(event),
            Self::And(filters) => filters.iter().all(|f| f.allows(event, rbac)),
            Self::Or(filters) => filters.iter().any(|f| f.allows(event, rbac)),
        }
    }

    fn has_role(event: &Event, rbac: &mut RbacService, role: &str) -> bool {
        let Some(user_id) = event.user_id() else {
            return false;
        };
        rbac.user_has_role(user_id, role, true).unwrap_or(false)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group => f.write_str("Group"),
            Self::Private => f.write_str("Private"),
            Self::Admin => f.write_str("Admin"),
            Self::Root => f.write_str("Root"),
            Self::GroupAdmin => f.write_str("GroupAdmin"),
            Self::GroupOwner => f.write_str("GroupOwner"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::And(inner) => f.debug_tuple("And").field(inner).finish(),
            Self::Or(inner) => f.debug_tuple("Or").field(inner).finish(),
        }
    }
}
