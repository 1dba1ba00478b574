//! The RBAC service: users, roles, inheritance, grants, and checks.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    num::NonZeroUsize,
    sync::Arc,
};

use {
    lru::LruCache,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    Error, Result,
    path::PermissionPath,
    roles,
    trie::PermissionTrie,
};

const CACHE_CAPACITY: usize = 256;

/// Grant/revoke target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    User,
    Role,
}

/// Which list a grant lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    White,
    Black,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RoleEntry {
    #[serde(default)]
    whitelist: BTreeSet<String>,
    #[serde(default)]
    blacklist: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct UserEntry {
    #[serde(default)]
    whitelist: BTreeSet<String>,
    #[serde(default)]
    blacklist: BTreeSet<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Memoized effective permission sets for one user.
#[derive(Debug, Default)]
struct Effective {
    whitelist: Vec<PermissionPath>,
    blacklist: Vec<PermissionPath>,
}

struct EffectiveCache(LruCache<String, Arc<Effective>>);

impl Default for EffectiveCache {
    fn default() -> Self {
        Self(LruCache::new(
            NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        ))
    }
}

/// Role-based access control state. Persisted as a single JSON document via
/// [`crate::RbacStore`]; the memoization cache is rebuilt on load.
#[derive(Serialize, Deserialize)]
pub struct RbacService {
    permissions: PermissionTrie,
    roles: BTreeMap<String, RoleEntry>,
    users: BTreeMap<String, UserEntry>,
    role_users: BTreeMap<String, BTreeSet<String>>,
    inheritance: BTreeMap<String, Vec<String>>,
    case_sensitive: bool,
    default_role: Option<String>,
    #[serde(skip)]
    cache: EffectiveCache,
}

impl Default for RbacService {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl RbacService {
    #[must_use]
    pub fn new(case_sensitive: bool, default_role: Option<String>) -> Self {
        Self {
            permissions: PermissionTrie::new(case_sensitive),
            roles: BTreeMap::new(),
            users: BTreeMap::new(),
            role_users: BTreeMap::new(),
            inheritance: BTreeMap::new(),
            case_sensitive,
            default_role,
            cache: EffectiveCache::default(),
        }
    }

    /// Seed the built-in `root` → `admin` → `user` hierarchy and grant the
    /// root role everything. Safe to call on an already-populated store.
    pub fn seed_builtin(&mut self, root_user: Option<&str>) -> Result<()> {
        self.add_role(roles::USER, true)?;
        self.add_role(roles::ADMIN, true)?;
        self.add_role(roles::ROOT, true)?;
        self.set_inheritance(roles::ADMIN, roles::USER)?;
        self.set_inheritance(roles::ROOT, roles::ADMIN)?;
        if self.default_role.is_none() {
            self.default_role = Some(roles::USER.to_string());
        }
        self.grant(Target::Role, roles::ROOT, "**", ListMode::White, true)?;
        if let Some(root_user) = root_user {
            self.assign_role(root_user, roles::ROOT, true)?;
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        self.cache.0.clear();
    }

    // ── Permission paths ─────────────────────────────────────────────────

    pub fn add_permission(&mut self, path: &str) {
        if !self.permissions.contains(path) {
            self.permissions.add(path);
            self.clear_cache();
        }
    }

    pub fn remove_permission(&mut self, path: &str) {
        self.permissions.remove(path);
        self.clear_cache();
    }

    #[must_use]
    pub fn permission_exists(&self, path: &str) -> bool {
        self.permissions.contains(path)
    }

    // ── Roles ────────────────────────────────────────────────────────────

    pub fn add_role(&mut self, role: &str, exist_ok: bool) -> Result<()> {
        if self.roles.contains_key(role) {
            if exist_ok {
                return Ok(());
            }
            return Err(Error::RoleExists { role: role.into() });
        }
        self.roles.insert(role.to_string(), RoleEntry::default());
        self.role_users.insert(role.to_string(), BTreeSet::new());
        self.clear_cache();
        Ok(())
    }

    /// Remove a role, cascading out of inheritance lists and user role sets.
    pub fn remove_role(&mut self, role: &str) -> Result<()> {
        if !self.roles.contains_key(role) {
            return Err(Error::role_not_found(role));
        }

        self.inheritance.remove(role);
        for parents in self.inheritance.values_mut() {
            parents.retain(|p| p != role);
        }

        if let Some(members) = self.role_users.remove(role) {
            for user in members {
                if let Some(entry) = self.users.get_mut(&user) {
                    entry.roles.retain(|r| r != role);
                }
            }
        }

        self.roles.remove(role);
        self.clear_cache();
        Ok(())
    }

    #[must_use]
    pub fn role_exists(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Let `role` inherit from `parent`. Rejected if it would close a cycle.
    pub fn set_inheritance(&mut self, role: &str, parent: &str) -> Result<()> {
        if !self.roles.contains_key(role) {
            return Err(Error::role_not_found(role));
        }
        if !self.roles.contains_key(parent) {
            return Err(Error::role_not_found(parent));
        }
        if role == parent {
            return Err(Error::SelfInheritance { role: role.into() });
        }
        if self.would_create_cycle(role, parent) {
            return Err(Error::InheritanceCycle {
                role: role.into(),
                parent: parent.into(),
            });
        }

        let parents = self.inheritance.entry(role.to_string()).or_default();
        if !parents.contains(&parent.to_string()) {
            parents.push(parent.to_string());
            self.clear_cache();
        }
        Ok(())
    }

    /// DFS from the proposed parent looking for the child.
    fn would_create_cycle(&self, role: &str, new_parent: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![new_parent];
        while let Some(current) = stack.pop() {
            if current == role {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(parents) = self.inheritance.get(current) {
                stack.extend(parents.iter().map(String::as_str));
            }
        }
        false
    }

    // ── Users ────────────────────────────────────────────────────────────

    pub fn add_user(&mut self, user: &str, exist_ok: bool) -> Result<()> {
        if self.users.contains_key(user) {
            if exist_ok {
                return Ok(());
            }
            return Err(Error::UserExists { user: user.into() });
        }

        let mut entry = UserEntry::default();
        if let Some(default_role) = self.default_role.clone() {
            if self.roles.contains_key(&default_role) {
                entry.roles.push(default_role.clone());
                if let Some(members) = self.role_users.get_mut(&default_role) {
                    members.insert(user.to_string());
                }
            }
        }
        self.users.insert(user.to_string(), entry);
        self.clear_cache();
        Ok(())
    }

    pub fn remove_user(&mut self, user: &str) -> Result<()> {
        let Some(entry) = self.users.remove(user) else {
            return Err(Error::user_not_found(user));
        };
        for role in entry.roles {
            if let Some(members) = self.role_users.get_mut(&role) {
                members.remove(user);
            }
        }
        self.clear_cache();
        Ok(())
    }

    #[must_use]
    pub fn user_exists(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    /// Whether the user holds `role`, directly or through inheritance.
    /// Unknown users are created on first sight when `create_user` is set.
    pub fn user_has_role(&mut self, user: &str, role: &str, create_user: bool) -> Result<bool> {
        if !self.user_exists(user) {
            if create_user {
                self.add_user(user, false)?;
            } else {
                return Ok(false);
            }
        }
        let direct = self
            .users
            .get(user)
            .map(|e| e.roles.clone())
            .unwrap_or_default();
        Ok(self.expand_roles(&direct).contains(role))
    }

    pub fn assign_role(&mut self, user: &str, role: &str, create_user: bool) -> Result<()> {
        if !self.user_exists(user) {
            if create_user {
                self.add_user(user, false)?;
            } else {
                return Err(Error::user_not_found(user));
            }
        }
        if !self.roles.contains_key(role) {
            return Err(Error::role_not_found(role));
        }

        let entry = self
            .users
            .get_mut(user)
            .ok_or_else(|| Error::user_not_found(user))?;
        if !entry.roles.contains(&role.to_string()) {
            entry.roles.push(role.to_string());
            if let Some(members) = self.role_users.get_mut(role) {
                members.insert(user.to_string());
            }
            self.clear_cache();
        }
        Ok(())
    }

    pub fn unassign_role(&mut self, user: &str, role: &str) -> Result<()> {
        let entry = self
            .users
            .get_mut(user)
            .ok_or_else(|| Error::user_not_found(user))?;
        if entry.roles.iter().any(|r| r == role) {
            entry.roles.retain(|r| r != role);
            if let Some(members) = self.role_users.get_mut(role) {
                members.remove(user);
            }
            self.clear_cache();
        }
        Ok(())
    }

    // ── Grants ───────────────────────────────────────────────────────────

    /// Put `permission` on a white or black list. Granting to one list
    /// removes the permission from the opposite list.
    pub fn grant(
        &mut self,
        target: Target,
        name: &str,
        permission: &str,
        mode: ListMode,
        create_permission: bool,
    ) -> Result<()> {
        if !self.permission_exists(permission) {
            if create_permission {
                self.add_permission(permission);
            } else {
                return Err(Error::PermissionNotFound {
                    permission: permission.into(),
                });
            }
        }

        let (whitelist, blacklist) = self.lists_mut(target, name)?;
        match mode {
            ListMode::White => {
                whitelist.insert(permission.to_string());
                blacklist.remove(permission);
            },
            ListMode::Black => {
                blacklist.insert(permission.to_string());
                whitelist.remove(permission);
            },
        }
        self.clear_cache();
        Ok(())
    }

    /// Remove `permission` from both lists of the target.
    pub fn revoke(&mut self, target: Target, name: &str, permission: &str) -> Result<()> {
        let (whitelist, blacklist) = self.lists_mut(target, name)?;
        whitelist.remove(permission);
        blacklist.remove(permission);
        self.clear_cache();
        Ok(())
    }

    fn lists_mut(
        &mut self,
        target: Target,
        name: &str,
    ) -> Result<(&mut BTreeSet<String>, &mut BTreeSet<String>)> {
        match target {
            Target::User => {
                let entry = self
                    .users
                    .get_mut(name)
                    .ok_or_else(|| Error::user_not_found(name))?;
                Ok((&mut entry.whitelist, &mut entry.blacklist))
            },
            Target::Role => {
                let entry = self
                    .roles
                    .get_mut(name)
                    .ok_or_else(|| Error::role_not_found(name))?;
                Ok((&mut entry.whitelist, &mut entry.blacklist))
            },
        }
    }

    // ── Checks ───────────────────────────────────────────────────────────

    /// Black list beats white list beats default deny. Unknown users are
    /// created (picking up the default role) so first contact behaves the
    /// same as the thousandth.
    pub fn check(&mut self, user: &str, permission: &str) -> Result<bool> {
        if !self.user_exists(user) {
            self.add_user(user, true)?;
        }

        let effective = self.effective(user);
        let query = PermissionPath::parse(permission, self.case_sensitive);

        if effective.blacklist.iter().any(|p| p.matches(&query)) {
            return Ok(false);
        }
        Ok(effective.whitelist.iter().any(|p| p.matches(&query)))
    }

    fn expand_roles(&self, direct: &[String]) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        let mut stack: Vec<&str> = direct.iter().map(String::as_str).collect();
        while let Some(role) = stack.pop() {
            if !all.insert(role.to_string()) {
                continue;
            }
            if let Some(parents) = self.inheritance.get(role) {
                stack.extend(parents.iter().map(String::as_str));
            }
        }
        all
    }

    fn effective(&mut self, user: &str) -> Arc<Effective> {
        if let Some(hit) = self.cache.0.get(user) {
            return Arc::clone(hit);
        }

        let Some(entry) = self.users.get(user) else {
            return Arc::new(Effective::default());
        };

        let mut whitelist: BTreeSet<String> = entry.whitelist.clone();
        let mut blacklist: BTreeSet<String> = entry.blacklist.clone();
        for role in self.expand_roles(&entry.roles) {
            if let Some(role_entry) = self.roles.get(&role) {
                whitelist.extend(role_entry.whitelist.iter().cloned());
                blacklist.extend(role_entry.blacklist.iter().cloned());
            }
        }

        let case_sensitive = self.case_sensitive;
        let effective = Arc::new(Effective {
            whitelist: whitelist
                .iter()
                .map(|p| PermissionPath::parse(p, case_sensitive))
                .collect(),
            blacklist: blacklist
                .iter()
                .map(|p| PermissionPath::parse(p, case_sensitive))
                .collect(),
        });

        debug!(user = %user, white = effective.whitelist.len(), black = effective.blacklist.len(), "effective permissions computed");
        self.cache.0.put(user.to_string(), Arc::clone(&effective));
        effective
    }
}
