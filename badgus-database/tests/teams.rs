#![cfg(feature = "postgres-tests")]

use std::time::Duration;

use sqlx::PgPool;

use badgus_database::Database;
use badgus_database::impls::{accounts, applications, badges, profiles, teams};
use badgus_database::model::badge::{AwardOutcome, NewBadge};
use badgus_database::model::profile::UsernameChange;
use badgus_database::model::team::TeamInput;
use badgus_database::model::user::{NewUser, User};

async fn user(db: &Database, username: &str) -> User {
    accounts::create_user(db, NewUser::regular(username, "", "correct horse"))
        .await
        .unwrap()
        .unwrap()
}

fn input<'a>(name: &'a str) -> TeamInput<'a> {
    TeamInput {
        name,
        description: Some("A team"),
    }
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn renaming_regenerates_slug(pool: PgPool) {
    let db = Database::new(pool);
    let founder = user(&db, "founder").await;
    let team = teams::create_team(&db, input("Alpha Team"), founder.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(team.slug, "Alpha-Team");

    let renamed = teams::update_team(&db, &team, input("Beta: Squad"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.slug, "Beta-Squad");
    assert!(teams::get_team_by_slug(&db, "Alpha-Team").await.unwrap().is_none());
    assert_eq!(
        teams::get_team_by_slug(&db, "Beta-Squad").await.unwrap().map(|t| t.id),
        Some(team.id)
    );
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn duplicate_team_names_are_refused(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    teams::create_team(&db, input("Alpha"), alice.id).await.unwrap().unwrap();
    assert!(teams::create_team(&db, input("Alpha"), bob.id).await.unwrap().is_none());
    assert!(profiles::list_memberships(&db, bob.id).await.unwrap().is_empty());
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn new_team_is_owned_by_its_creator(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let team = teams::create_team(&db, input("Alpha"), alice.id).await.unwrap().unwrap();

    assert!(teams::has_owner(&db, team.id, alice.id).await.unwrap());
    let members = teams::list_members(&db, team.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "alice");
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn add_member_only_ever_promotes(pool: PgPool) {
    let db = Database::new(pool);
    let founder = user(&db, "founder").await;
    let alice = user(&db, "alice").await;
    let team = teams::create_team(&db, input("Alpha"), founder.id).await.unwrap().unwrap();

    teams::add_member(&db, team.id, alice.id, true).await.unwrap();
    let again = teams::add_member(&db, team.id, alice.id, false).await.unwrap();
    assert!(again.is_owner);
    assert!(teams::has_owner(&db, team.id, alice.id).await.unwrap());

    assert!(teams::set_member_owner(&db, team.id, alice.id, false).await.unwrap());
    assert!(teams::has_member(&db, team.id, alice.id).await.unwrap());
    assert!(!teams::has_owner(&db, team.id, alice.id).await.unwrap());
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn removing_member_detaches_their_team_badges(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let founder = user(&db, "founder").await;
    let team = teams::create_team(&db, input("Alpha"), founder.id).await.unwrap().unwrap();
    teams::add_member(&db, team.id, alice.id, false).await.unwrap();
    teams::add_member(&db, team.id, bob.id, false).await.unwrap();

    for (title, creator) in [("Alice Badge", alice.id), ("Bob Badge", bob.id)] {
        badges::create_badge(
            &db,
            NewBadge {
                title,
                description: "",
                creator_id: creator,
                team_id: Some(team.id),
            },
        )
        .await
        .unwrap()
        .unwrap();
    }

    assert!(teams::remove_member(&db, team.id, alice.id).await.unwrap());
    assert!(!teams::has_member(&db, team.id, alice.id).await.unwrap());

    let remaining = badges::list_badges_for_team(&db, team.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Bob Badge");
    let detached = badges::get_badge_by_slug(&db, "Alice-Badge").await.unwrap().unwrap();
    assert_eq!(detached.team_id, None);
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn deleting_team_keeps_badges(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let team = teams::create_team(&db, input("Alpha"), alice.id).await.unwrap().unwrap();
    badges::create_badge(
        &db,
        NewBadge {
            title: "Keeper",
            description: "",
            creator_id: alice.id,
            team_id: Some(team.id),
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert!(teams::delete_team(&db, &team).await.unwrap());
    let badge = badges::get_badge_by_slug(&db, "Keeper").await.unwrap().unwrap();
    assert_eq!(badge.team_id, None);
    assert!(profiles::list_memberships(&db, alice.id).await.unwrap().is_empty());
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn approval_grants_membership_once(pool: PgPool) {
    let db = Database::new(pool);
    let owner = user(&db, "owner").await;
    let applicant = user(&db, "applicant").await;
    let team = teams::create_team(&db, input("Alpha"), owner.id).await.unwrap().unwrap();

    let application = applications::create_application(&db, team.id, applicant.id, "let me in")
        .await
        .unwrap();
    let pending = applications::list_applications(&db, team.id, false).await.unwrap();
    assert_eq!(pending.len(), 1);

    assert!(applications::approve_application(&db, &application, owner.id).await.unwrap());
    assert!(!applications::approve_application(&db, &application, owner.id).await.unwrap());
    assert!(teams::has_member(&db, team.id, applicant.id).await.unwrap());
    assert!(!teams::has_owner(&db, team.id, applicant.id).await.unwrap());

    assert!(applications::list_applications(&db, team.id, false).await.unwrap().is_empty());
    let approved = applications::list_applications(&db, team.id, true).await.unwrap();
    assert_eq!(approved[0].approver_username.as_deref(), Some("owner"));
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn unique_badges_are_awarded_once(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let badge = badges::create_badge(
        &db,
        NewBadge {
            title: "Once",
            description: "",
            creator_id: alice.id,
            team_id: None,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let first = badges::award_badge(&db, &badge, bob.id, Some(alice.id), "").await.unwrap();
    assert!(matches!(first, AwardOutcome::Awarded(_)));
    let second = badges::award_badge(&db, &badge, bob.id, Some(alice.id), "").await.unwrap();
    assert_eq!(second, AwardOutcome::AlreadyAwarded);
    assert_eq!(badges::list_awards_for_user(&db, bob.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn approved_nomination_links_its_award(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let badge = badges::create_badge(
        &db,
        NewBadge {
            title: "Helper",
            description: "",
            creator_id: alice.id,
            team_id: None,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let nomination = badges::create_nomination(&db, &badge, bob.id, alice.id)
        .await
        .unwrap()
        .unwrap();
    assert!(nomination.is_pending());

    let outcome = badges::approve_nomination(&db, &badge, &nomination, alice.id)
        .await
        .unwrap();
    assert!(matches!(outcome, Some(AwardOutcome::Awarded(_))));
    assert!(badges::approve_nomination(&db, &badge, &nomination, alice.id)
        .await
        .unwrap()
        .is_none());

    let stored = badges::get_nomination(&db, badge.id, nomination.id).await.unwrap().unwrap();
    assert!(stored.accepted);
    assert!(stored.award_id.is_some());
    assert!(!badges::reject_nomination(&db, &stored, alice.id, "late").await.unwrap());
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn username_changes_are_limited(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    user(&db, "taken").await;

    assert_eq!(
        profiles::change_username(&db, alice.id, "alice", 1).await.unwrap(),
        UsernameChange::Unchanged
    );
    assert_eq!(
        profiles::change_username(&db, alice.id, "taken", 1).await.unwrap(),
        UsernameChange::Taken
    );
    assert_eq!(
        profiles::change_username(&db, alice.id, "alicia", 1).await.unwrap(),
        UsernameChange::Changed
    );
    assert_eq!(
        profiles::change_username(&db, alice.id, "ally", 1).await.unwrap(),
        UsernameChange::LimitReached
    );
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn concurrent_renames_share_one_allowance(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;
    profiles::get_or_create_profile(&db, alice.id).await.unwrap();

    let (first, second) = tokio::join!(
        profiles::change_username(&db, alice.id, "alicia", 1),
        profiles::change_username(&db, alice.id, "ally", 1),
    );
    let outcomes = [first.unwrap(), second.unwrap()];
    let changed = outcomes.iter().filter(|o| **o == UsernameChange::Changed).count();
    assert_eq!(changed, 1, "{outcomes:?}");
    assert!(outcomes.contains(&UsernameChange::LimitReached));

    let profile = profiles::get_or_create_profile(&db, alice.id).await.unwrap();
    assert_eq!(profile.username_changes, 1);
}

#[sqlx::test(migrator = "badgus_database::MIGRATOR")]
async fn sessions_resolve_to_active_users(pool: PgPool) {
    let db = Database::new(pool);
    let alice = user(&db, "alice").await;

    assert!(accounts::authenticate(&db, "alice", "wrong password").await.unwrap().is_none());
    let authed = accounts::authenticate(&db, "alice", "correct horse").await.unwrap();
    assert_eq!(authed.map(|u| u.id), Some(alice.id));

    let token = accounts::create_session(&db, alice.id, Duration::from_secs(60)).await.unwrap();
    assert_eq!(
        accounts::user_for_session(&db, &token).await.unwrap().map(|u| u.username),
        Some("alice".to_owned())
    );
    assert!(accounts::delete_session(&db, &token).await.unwrap());
    assert!(accounts::user_for_session(&db, &token).await.unwrap().is_none());
}
