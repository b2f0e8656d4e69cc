use std::collections::HashMap;

use anyhow::Context as _;
use serde_json::Value;
use tera::{Context, Tera};

use badgus_utils::time::format_unix_timestamp;
use badgus_utils::upload::upload_url;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("teams/list.html", include_str!("../templates/teams/list.html")),
    ("teams/detail.html", include_str!("../templates/teams/detail.html")),
    ("teams/form.html", include_str!("../templates/teams/form.html")),
    ("teams/delete.html", include_str!("../templates/teams/delete.html")),
    ("teams/member_confirm.html", include_str!("../templates/teams/member_confirm.html")),
    ("applications/list.html", include_str!("../templates/applications/list.html")),
    ("applications/detail.html", include_str!("../templates/applications/detail.html")),
    ("applications/form.html", include_str!("../templates/applications/form.html")),
    ("applications/delete.html", include_str!("../templates/applications/delete.html")),
    ("profiles/detail.html", include_str!("../templates/profiles/detail.html")),
    ("profiles/edit.html", include_str!("../templates/profiles/edit.html")),
    ("profiles/username.html", include_str!("../templates/profiles/username.html")),
    ("accounts/login.html", include_str!("../templates/accounts/login.html")),
    ("accounts/register.html", include_str!("../templates/accounts/register.html")),
    ("badges/form.html", include_str!("../templates/badges/form.html")),
    ("badges/detail.html", include_str!("../templates/badges/detail.html")),
    ("admin/teams.html", include_str!("../templates/admin/teams.html")),
    ("admin/applications.html", include_str!("../templates/admin/applications.html")),
];

/// Compiled page templates. HTML is autoescaped.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new(uploads_url: &str) -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .context("failed to compile templates")?;

        tera.register_filter("timestamp", timestamp_filter);
        let uploads_url = uploads_url.to_owned();
        tera.register_filter(
            "upload_url",
            move |value: &Value, _: &HashMap<String, Value>| -> tera::Result<Value> {
                let url = match value.as_str() {
                    Some(relative) if !relative.is_empty() => upload_url(&uploads_url, relative),
                    _ => String::new(),
                };
                Ok(Value::String(url))
            },
        );

        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, ctx: &Context) -> anyhow::Result<String> {
        self.tera
            .render(template, ctx)
            .with_context(|| format!("failed to render `{template}`"))
    }
}

fn timestamp_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let secs = value
        .as_u64()
        .or_else(|| value.as_i64().map(|secs| secs.max(0).unsigned_abs()))
        .ok_or_else(|| tera::Error::msg("timestamp filter expects an integer"))?;
    Ok(Value::String(format_unix_timestamp(secs)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tera::Context;

    use super::Renderer;

    fn renderer() -> Renderer {
        Renderer::new("/media/uploads/").unwrap()
    }

    #[test]
    fn all_templates_compile() {
        renderer();
    }

    #[test]
    fn filters_format_values() {
        let mut tera = renderer().tera;
        tera.add_raw_template("t.txt", "{{ ts | timestamp }} {{ img | upload_url }}|{{ none | upload_url }}")
            .unwrap();
        let mut ctx = Context::new();
        ctx.insert("ts", &0);
        ctx.insert("img", "team/1/5_team.png");
        ctx.insert("none", &json!(null));
        let out = tera.render("t.txt", &ctx).unwrap();
        assert_eq!(out, "1970-01-01 00:00 UTC /media/uploads/team/1/5_team.png|");
    }

    fn team_page(links: serde_json::Value) -> String {
        let ctx = Context::from_serialize(json!({
            "viewer": { "authenticated": true, "username": "bob", "is_staff": false },
            "team": {
                "id": 1, "name": "Core <Team>", "slug": "core-team", "description": null,
                "image": null, "created_at": 0, "modified_at": 0
            },
            "members": [
                { "user_id": 1, "username": "alice", "display_name": "Alice A", "avatar": null, "is_owner": true },
                { "user_id": 2, "username": "carol", "display_name": null, "avatar": null, "is_owner": false }
            ],
            "badges": [{
                "id": 1, "title": "Helper", "slug": "helper", "description": "", "image": null,
                "creator_id": 1, "team_id": 1, "is_unique": false, "nominations_accepted": true,
                "nominations_autoapproved": false, "created_at": 0, "modified_at": 0
            }],
            "links": links,
        }))
        .unwrap();
        renderer().render("teams/detail.html", &ctx).unwrap()
    }

    #[test]
    fn team_detail_lists_members_and_badges() {
        let html = team_page(json!({
            "apply": true, "view_application": null, "list_applications": false,
            "edit": false, "delete": false, "remove_member": false,
            "promote_member": false, "demote_member": false
        }));
        assert_eq!(html.matches(r#"<li class="member"#).count(), 2);
        assert!(html.contains(r#"<span class="title">alice</span>"#));
        assert!(html.contains(r#"<span class="subtitle">Alice A</span>"#));
        assert_eq!(html.matches(r#"<li class="badge">"#).count(), 1);
        assert!(html.contains("Core &lt;Team&gt;"));
        assert!(html.contains(r#"class="apply-team""#));
        assert!(!html.contains("view-team-application"));
        assert!(!html.contains("list-team-applications"));
        assert!(!html.contains("remove-member"));
    }

    #[test]
    fn team_detail_shows_owner_links() {
        let html = team_page(json!({
            "apply": false, "view_application": "/teams/core-team/applications/4",
            "list_applications": true, "edit": true, "delete": true, "remove_member": true,
            "promote_member": true, "demote_member": true
        }));
        assert!(!html.contains("apply-team"));
        assert!(html.contains(r#"class="view-team-application""#));
        assert!(html.contains(r#"class="list-team-applications""#));
        assert_eq!(html.matches(r#"class="remove-member""#).count(), 2);
        assert_eq!(html.matches(r#"class="demote-member""#).count(), 1);
        assert_eq!(html.matches(r#"class="promote-member""#).count(), 1);
    }

    #[test]
    fn empty_application_list_says_so() {
        let ctx = Context::from_serialize(json!({
            "viewer": { "authenticated": true, "username": "alice", "is_staff": false },
            "team": {
                "id": 1, "name": "Core", "slug": "core", "description": null,
                "image": null, "created_at": 0, "modified_at": 0
            },
            "applications": [],
            "approved": false,
        }))
        .unwrap();
        let html = renderer().render("applications/list.html", &ctx).unwrap();
        assert!(html.contains(r#"<ul class="applications">"#));
        assert!(html.contains(r#"<li class="empty">"#));
        assert!(!html.contains(r#"<li class="application">"#));
    }

    #[test]
    fn form_errors_render_next_to_fields() {
        let ctx = Context::from_serialize(json!({
            "viewer": { "authenticated": true, "username": "alice", "is_staff": false },
            "team": null,
            "form": { "name": "new", "description": "" },
            "errors": { "fields": { "name": ["Invalid name"] }, "form": [] },
        }))
        .unwrap();
        let html = renderer().render("teams/form.html", &ctx).unwrap();
        assert!(html.contains("<li>Invalid name</li>"));
        assert!(html.contains("Create a team"));
        assert!(!html.contains("nonfield"));
    }
}
