use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

fn titles(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn students_see_own_and_public_projects_only() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;

    test.create_project(&alice, "alice private", json!({})).await?;
    test.create_project(&bob, "bob private", json!({})).await?;
    test.create_project(&bob, "bob public", json!({ "public_visibility": true })).await?;

    let (status, page) = test.request("GET", "/projects", Some(&alice), None).await?;
    assert_eq!(status, StatusCode::OK);

    let mut seen = titles(&page);
    seen.sort();
    assert_eq!(seen, vec!["alice private", "bob public"]);

    Ok(())
}

#[tokio::test]
async fn teachers_see_assigned_and_public_projects() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let assigned = test.create_project(&alice, "assigned private", json!({})).await?;
    test.create_project(&bob, "unrelated private", json!({})).await?;
    test.create_project(&bob, "unrelated public", json!({ "public_visibility": true })).await?;

    test.propose_assignment(&alice, assigned, teacher_id, "supervisor").await?;

    let (_, page) = test.request("GET", "/projects", Some(&teacher), None).await?;
    let mut seen = titles(&page);
    seen.sort();
    assert_eq!(seen, vec!["assigned private", "unrelated public"]);

    Ok(())
}

#[tokio::test]
async fn admins_see_all_non_deleted_projects() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;
    let (admin, admin_id) = test.register("root", "teacher").await?;
    test.make_admin(admin_id).await?;

    test.create_project(&alice, "one", json!({})).await?;
    let doomed = test.create_project(&bob, "two", json!({})).await?;

    let (status, _) = test
        .request("DELETE", &format!("/projects/{}", doomed), Some(&bob), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, page) = test.request("GET", "/projects", Some(&admin), None).await?;
    assert_eq!(titles(&page), vec!["one"]);

    Ok(())
}

#[tokio::test]
async fn foreign_private_project_reads_as_not_found() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;

    let private = test.create_project(&bob, "bob private", json!({})).await?;

    // indistinguishable from a record that never existed
    let (status, value) = test
        .request("GET", &format!("/projects/{}", private), Some(&alice), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["error"], "not_found");

    Ok(())
}

#[tokio::test]
async fn unauthenticated_listing_returns_public_non_deleted_only() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    test.create_project(&alice, "private", json!({})).await?;
    let public = test
        .create_project(&alice, "public", json!({ "public_visibility": true }))
        .await?;
    let deleted_public = test
        .create_project(&alice, "deleted public", json!({ "public_visibility": true }))
        .await?;
    test.request("DELETE", &format!("/projects/{}", deleted_public), Some(&alice), None)
        .await?;

    let (status, page) = test.request("GET", "/public/projects", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&page), vec!["public"]);

    let (status, _) = test
        .request("GET", &format!("/public/projects/{}", public), None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = test
        .request("GET", &format!("/public/projects/{}", deleted_public), None, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn soft_deleted_project_vanishes_from_every_view_but_keeps_its_row() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (admin, admin_id) = test.register("root", "teacher").await?;
    test.make_admin(admin_id).await?;

    let project = test
        .create_project(&alice, "doomed", json!({ "public_visibility": true }))
        .await?;

    let (status, _) = test
        .request("DELETE", &format!("/projects/{}", project), Some(&alice), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // gone for the owner, for admins, and for the public
    for (uri, token) in [
        (format!("/projects/{}", project), Some(alice.as_str())),
        (format!("/projects/{}", project), Some(admin.as_str())),
        (format!("/public/projects/{}", project), None),
    ] {
        let (status, _) = test.request("GET", &uri, token, None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, page) = test.request("GET", "/projects", Some(&admin), None).await?;
    assert!(titles(&page).is_empty());

    // the row itself is retained; deletion is a hide, not a purge
    let deleted: bool = sqlx::query_scalar("SELECT deleted FROM projects WHERE id = ?")
        .bind(project)
        .fetch_one(&test.pool)
        .await?;
    assert!(deleted);

    Ok(())
}

#[tokio::test]
async fn year_outside_bounds_is_rejected() -> Result<()> {
    let test = common::setup().await?;
    let (alice, _) = test.register("alice", "student").await?;

    let body = json!({
        "title": "old work",
        "description": "desc",
        "year": 1999,
        "field": "history",
        "keywords": [],
    });
    let (status, _) = test.request("POST", "/projects", Some(&alice), Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}
