use std::collections::BTreeSet;

pub const LIST_BADGETEAM: &str = "teams.list_badgeteam";
pub const VIEW_BADGETEAM: &str = "teams.view_badgeteam";
pub const ADD_BADGETEAM: &str = "teams.add_badgeteam";
pub const CHANGE_BADGETEAM: &str = "teams.change_badgeteam";
pub const DELETE_BADGETEAM: &str = "teams.delete_badgeteam";
pub const INVITE_BADGETEAM: &str = "teams.invite_badgeteam";
pub const APPLY_BADGETEAM: &str = "teams.apply_badgeteam";
pub const LIST_APPLICATION: &str = "teams.list_badgeteamapplication";
pub const VIEW_APPLICATION: &str = "teams.view_badgeteamapplication";
pub const DELETE_APPLICATION: &str = "teams.delete_badgeteamapplication";
pub const APPROVE_APPLICATION: &str = "teams.approve_badgeteamapplication";
pub const REMOVE_MEMBER: &str = "teams.remove_member";
pub const PROMOTE_MEMBER: &str = "teams.promote_member";
pub const DEMOTE_MEMBER: &str = "teams.demote_member";

pub const ADD_BADGE: &str = "badger.add_badge";
pub const CHANGE_BADGE: &str = "badger.change_badge";
pub const DELETE_BADGE: &str = "badger.delete_badge";
pub const AWARD_BADGE: &str = "badger.award_badge";
pub const NOMINATE_BADGE: &str = "badger.nominate_badge";
pub const MANAGE_DEFERREDAWARDS: &str = "badger.manage_deferredawards";
pub const CHANGE_AWARD: &str = "badger.change_award";
pub const DELETE_AWARD: &str = "badger.delete_award";
pub const CHANGE_NOMINATION: &str = "badger.change_nomination";
pub const DELETE_NOMINATION: &str = "badger.delete_nomination";
pub const APPROVE_NOMINATION: &str = "badger.approve_nomination";
pub const REJECT_NOMINATION: &str = "badger.reject_nomination";
pub const GRANT_DEFERREDAWARD: &str = "badger.grant_deferredaward";

/// Every codename known to the application; superusers hold all of them.
pub const ALL_PERMISSIONS: &[&str] = &[
    LIST_BADGETEAM,
    VIEW_BADGETEAM,
    ADD_BADGETEAM,
    CHANGE_BADGETEAM,
    DELETE_BADGETEAM,
    INVITE_BADGETEAM,
    APPLY_BADGETEAM,
    LIST_APPLICATION,
    VIEW_APPLICATION,
    DELETE_APPLICATION,
    APPROVE_APPLICATION,
    REMOVE_MEMBER,
    PROMOTE_MEMBER,
    DEMOTE_MEMBER,
    ADD_BADGE,
    CHANGE_BADGE,
    DELETE_BADGE,
    AWARD_BADGE,
    NOMINATE_BADGE,
    MANAGE_DEFERREDAWARDS,
    CHANGE_AWARD,
    DELETE_AWARD,
    CHANGE_NOMINATION,
    DELETE_NOMINATION,
    APPROVE_NOMINATION,
    REJECT_NOMINATION,
    GRANT_DEFERREDAWARD,
];

const EVERYONE_GRANTS: &[&str] = &[LIST_BADGETEAM, VIEW_BADGETEAM];
const AUTHENTICATED_GRANTS: &[&str] = &[ADD_BADGETEAM, APPLY_BADGETEAM, ADD_BADGE];

/// Set of permission codenames held by a user, optionally on an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<&'static str>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self::from_codenames(ALL_PERMISSIONS)
    }

    pub fn from_codenames(codenames: &[&'static str]) -> Self {
        Self(codenames.iter().copied().collect())
    }

    /// Return the union of this set and `codenames`.
    pub fn union(mut self, codenames: &[&'static str]) -> Self {
        self.0.extend(codenames.iter().copied());
        self
    }

    pub fn insert(&mut self, codename: &'static str) {
        self.0.insert(codename);
    }

    pub fn contains(&self, codename: &str) -> bool {
        self.0.contains(codename)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Site-wide grants applied before any object policy.
pub fn site_permissions(authenticated: bool) -> PermissionSet {
    let base = PermissionSet::from_codenames(EVERYONE_GRANTS);
    if authenticated {
        base.union(AUTHENTICATED_GRANTS)
    } else {
        base
    }
}

/// How a user relates to a team.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Standing {
    pub authenticated: bool,
    pub is_member: bool,
    pub is_owner: bool,
}

impl Standing {
    pub const ANONYMOUS: Self = Self {
        authenticated: false,
        is_member: false,
        is_owner: false,
    };

    pub fn outsider() -> Self {
        Self {
            authenticated: true,
            ..Self::ANONYMOUS
        }
    }

    pub fn member() -> Self {
        Self {
            is_member: true,
            ..Self::outsider()
        }
    }

    pub fn owner() -> Self {
        Self {
            is_owner: true,
            ..Self::member()
        }
    }
}

/// Grants per audience for objects owned by a team.
#[derive(Clone, Copy, Debug)]
pub struct Policy {
    pub all: &'static [&'static str],
    pub authenticated: &'static [&'static str],
    pub members: &'static [&'static str],
    pub owners: &'static [&'static str],
}

impl Policy {
    /// Widen `base` by every audience `standing` belongs to.
    ///
    /// Anonymous users only ever receive the `all` grants, even if the
    /// standing claims membership.
    pub fn filter_permissions(&self, standing: Standing, base: PermissionSet) -> PermissionSet {
        let mut permissions = base.union(self.all);
        if standing.authenticated {
            permissions = permissions.union(self.authenticated);
            if standing.is_owner {
                permissions = permissions.union(self.owners);
            }
            if standing.is_member {
                permissions = permissions.union(self.members);
            }
        }
        permissions
    }
}

pub const BADGE_TEAM_POLICY: Policy = Policy {
    all: &[],
    authenticated: &[],
    members: &[
        AWARD_BADGE,
        NOMINATE_BADGE,
        MANAGE_DEFERREDAWARDS,
        DELETE_AWARD,
        APPROVE_NOMINATION,
        REJECT_NOMINATION,
        GRANT_DEFERREDAWARD,
    ],
    owners: &[
        CHANGE_BADGETEAM,
        DELETE_BADGETEAM,
        INVITE_BADGETEAM,
        LIST_APPLICATION,
        VIEW_APPLICATION,
        DELETE_APPLICATION,
        APPROVE_APPLICATION,
        REMOVE_MEMBER,
        PROMOTE_MEMBER,
        DEMOTE_MEMBER,
        CHANGE_BADGE,
        DELETE_BADGE,
        AWARD_BADGE,
        NOMINATE_BADGE,
        MANAGE_DEFERREDAWARDS,
        CHANGE_AWARD,
        DELETE_AWARD,
        CHANGE_NOMINATION,
        DELETE_NOMINATION,
        APPROVE_NOMINATION,
        REJECT_NOMINATION,
        GRANT_DEFERREDAWARD,
    ],
};

/// Applications inherit their team's grants; the applicant may view and
/// withdraw their own application.
pub fn application_permissions(
    team_permissions: PermissionSet,
    authenticated: bool,
    is_creator: bool,
) -> PermissionSet {
    if authenticated && is_creator {
        team_permissions.union(&[VIEW_APPLICATION, DELETE_APPLICATION])
    } else {
        team_permissions
    }
}

/// Badges inherit their team's grants; the badge creator manages and awards it.
pub fn badge_permissions(
    team_permissions: PermissionSet,
    authenticated: bool,
    is_creator: bool,
) -> PermissionSet {
    if authenticated && is_creator {
        team_permissions.union(&[CHANGE_BADGE, DELETE_BADGE, AWARD_BADGE])
    } else {
        team_permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_perms(standing: Standing) -> PermissionSet {
        BADGE_TEAM_POLICY.filter_permissions(standing, site_permissions(standing.authenticated))
    }

    #[test]
    fn anonymous_users_can_only_browse() {
        let perms = team_perms(Standing::ANONYMOUS);
        assert!(perms.contains(LIST_BADGETEAM));
        assert!(perms.contains(VIEW_BADGETEAM));
        assert!(!perms.contains(APPLY_BADGETEAM));
        assert!(!perms.contains(ADD_BADGETEAM));
    }

    #[test]
    fn anonymous_membership_claims_are_ignored() {
        let standing = Standing {
            authenticated: false,
            is_member: true,
            is_owner: true,
        };
        assert!(!team_perms(standing).contains(CHANGE_BADGETEAM));
    }

    #[test]
    fn outsiders_can_apply_but_not_manage() {
        let perms = team_perms(Standing::outsider());
        assert!(perms.contains(APPLY_BADGETEAM));
        assert!(!perms.contains(LIST_APPLICATION));
        assert!(!perms.contains(AWARD_BADGE));
    }

    #[test]
    fn members_award_but_do_not_administer() {
        let perms = team_perms(Standing::member());
        assert!(perms.contains(AWARD_BADGE));
        assert!(perms.contains(APPROVE_NOMINATION));
        assert!(!perms.contains(LIST_APPLICATION));
        assert!(!perms.contains(APPROVE_APPLICATION));
        assert!(!perms.contains(CHANGE_BADGETEAM));
    }

    #[test]
    fn owners_administer_team_and_applications() {
        let perms = team_perms(Standing::owner());
        for codename in [
            CHANGE_BADGETEAM,
            DELETE_BADGETEAM,
            LIST_APPLICATION,
            APPROVE_APPLICATION,
            REMOVE_MEMBER,
            PROMOTE_MEMBER,
            DEMOTE_MEMBER,
            CHANGE_AWARD,
        ] {
            assert!(perms.contains(codename), "owner lacks {codename}");
        }
    }

    #[test]
    fn owner_without_membership_row_still_gets_owner_grants() {
        let standing = Standing {
            authenticated: true,
            is_member: false,
            is_owner: true,
        };
        let perms = team_perms(standing);
        assert!(perms.contains(APPROVE_APPLICATION));
        assert!(perms.contains(AWARD_BADGE));
    }

    #[test]
    fn applicant_can_view_and_withdraw_own_application() {
        let base = team_perms(Standing::outsider());
        let own = application_permissions(base.clone(), true, true);
        assert!(own.contains(VIEW_APPLICATION));
        assert!(own.contains(DELETE_APPLICATION));
        assert!(!own.contains(APPROVE_APPLICATION));

        let other = application_permissions(base, true, false);
        assert!(!other.contains(VIEW_APPLICATION));
    }

    #[test]
    fn badge_creator_can_award_without_team() {
        let perms = badge_permissions(site_permissions(true), true, true);
        assert!(perms.contains(AWARD_BADGE));
        assert!(!perms.contains(APPROVE_NOMINATION));
    }

    #[test]
    fn all_permissions_cover_policy_sets() {
        let all = PermissionSet::all();
        for codename in BADGE_TEAM_POLICY.owners.iter().chain(BADGE_TEAM_POLICY.members) {
            assert!(all.contains(codename));
        }
        assert_eq!(all.len(), ALL_PERMISSIONS.len());
    }
}
