//! Which links a team page offers to its viewer.

use serde::Serialize;

use badgus_database::model::application::TeamApplication;
use badgus_utils::permissions::{
    APPLY_BADGETEAM, APPROVE_APPLICATION, CHANGE_BADGETEAM, DELETE_BADGETEAM, DEMOTE_MEMBER,
    LIST_APPLICATION, PROMOTE_MEMBER, PermissionSet, REMOVE_MEMBER, Standing,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TeamAffordances {
    pub apply: bool,
    /// URL of the viewer's pending application.
    pub view_application: Option<String>,
    pub list_applications: bool,
    pub edit: bool,
    pub delete: bool,
    pub remove_member: bool,
    pub promote_member: bool,
    pub demote_member: bool,
}

pub fn team_affordances(
    team_slug: &str,
    standing: Standing,
    perms: &PermissionSet,
    existing_application: Option<&TeamApplication>,
) -> TeamAffordances {
    let pending = existing_application.filter(|application| application.is_pending());
    let is_member = standing.is_member || standing.is_owner;

    TeamAffordances {
        apply: standing.authenticated
            && !is_member
            && pending.is_none()
            && perms.contains(APPLY_BADGETEAM),
        view_application: pending
            .filter(|_| !is_member)
            .map(|application| application.url(team_slug)),
        list_applications: perms.contains(LIST_APPLICATION),
        edit: perms.contains(CHANGE_BADGETEAM),
        delete: perms.contains(DELETE_BADGETEAM),
        remove_member: perms.contains(REMOVE_MEMBER),
        promote_member: perms.contains(PROMOTE_MEMBER),
        demote_member: perms.contains(DEMOTE_MEMBER),
    }
}

/// The approve button shows while pending, to those allowed to approve.
pub fn can_approve(application: &TeamApplication, perms: &PermissionSet) -> bool {
    application.is_pending() && perms.contains(APPROVE_APPLICATION)
}

#[cfg(test)]
mod tests {
    use badgus_core::authz::team_permissions_for;
    use badgus_database::model::application::TeamApplication;
    use badgus_database::model::user::User;
    use badgus_utils::permissions::{PermissionSet, Standing};

    use super::{TeamAffordances, can_approve, team_affordances};

    fn viewer() -> User {
        User {
            id: 5,
            username: "user1".to_owned(),
            email: String::new(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: 0,
        }
    }

    fn perms(standing: Standing) -> PermissionSet {
        let user = viewer();
        let viewer = standing.authenticated.then_some(&user);
        team_permissions_for(viewer, standing)
    }

    fn application(approved: bool) -> TeamApplication {
        TeamApplication {
            id: 9,
            team_id: 1,
            creator_id: Some(5),
            approver_id: approved.then_some(2),
            comment: "hello".to_owned(),
            created_at: 0,
            modified_at: 0,
        }
    }

    fn links(standing: Standing, existing: Option<&TeamApplication>) -> TeamAffordances {
        team_affordances("Alpha", standing, &perms(standing), existing)
    }

    #[test]
    fn outsiders_may_apply() {
        let links = links(Standing::outsider(), None);
        assert!(links.apply);
        assert_eq!(links.view_application, None);
        assert!(!links.list_applications);
    }

    #[test]
    fn anonymous_viewers_see_no_actions() {
        assert_eq!(links(Standing::ANONYMOUS, None), TeamAffordances::default());
    }

    #[test]
    fn pending_application_replaces_apply_link() {
        let pending = application(false);
        let links = links(Standing::outsider(), Some(&pending));
        assert!(!links.apply);
        assert_eq!(
            links.view_application.as_deref(),
            Some("/teams/Alpha/applications/9")
        );
    }

    #[test]
    fn approved_members_see_neither_link() {
        let approved = application(true);
        let links = links(Standing::member(), Some(&approved));
        assert!(!links.apply);
        assert_eq!(links.view_application, None);
    }

    #[test]
    fn removed_members_may_apply_again() {
        let approved = application(true);
        assert!(links(Standing::outsider(), Some(&approved)).apply);
    }

    #[test]
    fn owners_manage_the_team() {
        let links = links(Standing::owner(), None);
        assert!(!links.apply);
        assert!(links.list_applications);
        assert!(links.edit && links.delete);
        assert!(links.remove_member && links.promote_member && links.demote_member);
    }

    #[test]
    fn members_do_not_administer() {
        let links = links(Standing::member(), None);
        assert!(!links.list_applications);
        assert!(!links.edit);
        assert!(!links.remove_member);
    }

    #[test]
    fn approve_button_only_while_pending() {
        let owner = perms(Standing::owner());
        assert!(can_approve(&application(false), &owner));
        assert!(!can_approve(&application(true), &owner));
        assert!(!can_approve(&application(false), &perms(Standing::member())));
    }
}
