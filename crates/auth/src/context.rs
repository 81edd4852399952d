//! Per-request tenant context: the authorization snapshot every protected
//! operation consults.
//!
//! A [`TenantContext`] is built fresh from the resolved actor on each
//! request and discarded with it. It aggregates the actor's global
//! capability set, a per-team capability map over active memberships, the
//! org scope, and the effective team focus. [`TenantContext::has`] is the
//! single decision primitive; [`ScopeFilter`] reifies the row-visibility
//! contract list endpoints apply.

use std::collections::{BTreeMap, BTreeSet};

use flowdeck_core::{OrgId, TeamId};

use crate::actor::Actor;
use crate::capability::Capability;
use crate::identity::AuthError;
use crate::roles::capabilities_for;

/// Team dimension of a row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamScope {
    /// No team restriction (platform admins without an explicit focus).
    All,
    /// Restrict to exactly these teams. May be empty: an actor without
    /// memberships sees no team-owned rows, which is an empty result, not
    /// an error.
    Teams(BTreeSet<TeamId>),
}

/// Row-visibility predicate for list queries.
///
/// Org first, then team. `org: None` means platform-wide scope and injects
/// no org filter at all; that is different from filtering on an empty set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    org: Option<OrgId>,
    teams: TeamScope,
}

impl ScopeFilter {
    pub fn org(&self) -> Option<OrgId> {
        self.org
    }

    pub fn teams(&self) -> &TeamScope {
        &self.teams
    }

    /// Whether a row owned by `org_id` passes the org dimension.
    pub fn permits_org(&self, org_id: OrgId) -> bool {
        self.org.is_none_or(|scope| scope == org_id)
    }

    /// Whether a row owned by `team_id` passes the team dimension.
    pub fn permits_team(&self, team_id: TeamId) -> bool {
        match &self.teams {
            TeamScope::All => true,
            TeamScope::Teams(teams) => teams.contains(&team_id),
        }
    }

    /// Whether a row owned by (`org_id`, `team_id`) is visible.
    pub fn permits(&self, org_id: OrgId, team_id: TeamId) -> bool {
        self.permits_org(org_id) && self.permits_team(team_id)
    }
}

/// Per-request authorization snapshot for one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    org_id: Option<OrgId>,
    focused_team: Option<TeamId>,
    global: Capability,
    team_capabilities: BTreeMap<TeamId, Capability>,
}

impl TenantContext {
    /// Build the snapshot from a resolved actor and an optional focus hint.
    ///
    /// The hint wins over the actor's stored default team; either is
    /// honored only when it names an active membership, and an invalid
    /// value falls back to no focus rather than widening anything. The
    /// per-team map is derived from active memberships only.
    pub fn build(actor: &Actor, focus_hint: Option<TeamId>) -> Self {
        let team_capabilities: BTreeMap<TeamId, Capability> = actor
            .memberships
            .iter()
            .filter(|m| m.active)
            .map(|m| (m.team_id, capabilities_for(&m.role_name)))
            .collect();

        let focused_team = focus_hint
            .filter(|team| team_capabilities.contains_key(team))
            .or_else(|| {
                actor
                    .default_team_id
                    .filter(|team| team_capabilities.contains_key(team))
            });

        Self {
            org_id: actor.org_id,
            focused_team,
            global: capabilities_for(&actor.role_name),
            team_capabilities,
        }
    }

    /// Organization scope; `None` means platform-wide.
    pub fn org_id(&self) -> Option<OrgId> {
        self.org_id
    }

    /// Effective focused team for this request, if any.
    pub fn focused_team(&self) -> Option<TeamId> {
        self.focused_team
    }

    /// Capabilities granted by the actor's global role.
    pub fn global_capabilities(&self) -> Capability {
        self.global
    }

    /// Capability set per team, active memberships only.
    pub fn team_capabilities(&self) -> &BTreeMap<TeamId, Capability> {
        &self.team_capabilities
    }

    /// Teams the actor actively belongs to, ascending.
    pub fn member_team_ids(&self) -> Vec<TeamId> {
        self.team_capabilities.keys().copied().collect()
    }

    /// Platform-admin short-circuit: the flag counts wherever it appears,
    /// globally or in any team-scoped set.
    pub fn is_platform_admin(&self) -> bool {
        self.global.contains(Capability::PLATFORM_ADMIN)
            || self
                .team_capabilities
                .values()
                .any(|caps| caps.contains(Capability::PLATFORM_ADMIN))
    }

    /// The decision primitive.
    ///
    /// Unscoped: granted globally, or by any team membership (aggregate
    /// views span every team the actor belongs to). Scoped: granted by
    /// that team's membership only; a global grant does not satisfy a
    /// team-scoped check. Platform admin passes everything.
    pub fn has(&self, capability: Capability, team_id: Option<TeamId>) -> bool {
        if self.is_platform_admin() {
            return true;
        }
        match team_id {
            Some(team) => self
                .team_capabilities
                .get(&team)
                .is_some_and(|caps| caps.contains(capability)),
            None => {
                self.global.contains(capability)
                    || self
                        .team_capabilities
                        .values()
                        .any(|caps| caps.contains(capability))
            }
        }
    }

    /// Guard: reject unless `capability` is held unscoped.
    pub fn require(&self, capability: Capability) -> Result<(), AuthError> {
        if self.has(capability, None) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(capability))
        }
    }

    /// Guard: reject unless `capability` is held in `team_id`.
    ///
    /// `team_id` must be the team of the record being touched, not the
    /// caller's focus; taking it from the focus would let a caller write
    /// into team A while focused on team B.
    pub fn require_in_team(
        &self,
        capability: Capability,
        team_id: TeamId,
    ) -> Result<(), AuthError> {
        if self.has(capability, Some(team_id)) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(capability))
        }
    }

    /// The row filter for list queries: org scope, then the focused team
    /// if one is set, otherwise all teams for admins and the membership
    /// set for everyone else.
    pub fn scope_filter(&self) -> ScopeFilter {
        let teams = if let Some(focus) = self.focused_team {
            TeamScope::Teams(BTreeSet::from([focus]))
        } else if self.is_platform_admin() {
            TeamScope::All
        } else {
            TeamScope::Teams(self.team_capabilities.keys().copied().collect())
        };
        ScopeFilter {
            org: self.org_id,
            teams,
        }
    }

    /// Like [`TenantContext::scope_filter`] but ignoring any team focus:
    /// the widest set of rows the actor may address directly. Fetching a
    /// single row by id uses this, so a focused actor can still reach its
    /// other teams' rows and admins reach everything.
    pub fn visibility(&self) -> ScopeFilter {
        let teams = if self.is_platform_admin() {
            TeamScope::All
        } else {
            TeamScope::Teams(self.team_capabilities.keys().copied().collect())
        };
        ScopeFilter {
            org: self.org_id,
            teams,
        }
    }
}
