use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

struct Fixture {
    test: common::TestApp,
    student: String,
    teacher: String,
    milestone: Uuid,
}

/// Student-owned project with an assigned teacher and one milestone.
async fn fixture() -> Result<Fixture> {
    let test = common::setup().await?;

    let (student, _) = test.register("alice", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let project = test.create_project(&student, "p", json!({})).await?;
    test.propose_assignment(&student, project, teacher_id, "supervisor").await?;

    let body = json!({
        "project_id": project,
        "title": "prototype",
        "description": "working prototype",
        "deadline": "2026-01-15T12:00:00Z",
    });
    let (status, created) = test.request("POST", "/milestones", Some(&teacher), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let milestone: Uuid = created["id"].as_str().unwrap().parse()?;

    Ok(Fixture {
        test,
        student,
        teacher,
        milestone,
    })
}

async fn set_completion(f: &Fixture, token: &str, completion: Value) -> Result<(StatusCode, Value)> {
    f.test
        .request(
            "POST",
            &format!("/milestones/{}/update_completion", f.milestone),
            Some(token),
            Some(json!({ "completion": completion })),
        )
        .await
}

#[tokio::test]
async fn completion_drives_status_forward_only() -> Result<()> {
    let f = fixture().await?;

    let (status, milestone) = set_completion(&f, &f.student, json!(50)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(milestone["completion"], 50);
    assert_eq!(milestone["status"], "in_progress");

    let (_, milestone) = set_completion(&f, &f.student, json!(100)).await?;
    assert_eq!(milestone["status"], "completed");

    // zero keeps whatever status was there; it never regresses
    let (_, milestone) = set_completion(&f, &f.student, json!(0)).await?;
    assert_eq!(milestone["completion"], 0);
    assert_eq!(milestone["status"], "completed");

    Ok(())
}

#[tokio::test]
async fn completion_accepts_numeric_strings() -> Result<()> {
    let f = fixture().await?;

    let (status, milestone) = set_completion(&f, &f.teacher, json!("75")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(milestone["completion"], 75);
    assert_eq!(milestone["status"], "in_progress");

    Ok(())
}

#[tokio::test]
async fn completion_rejects_out_of_range_and_non_integers() -> Result<()> {
    let f = fixture().await?;

    for bad in [json!(101), json!(-1), json!("many"), json!(12.5)] {
        let (status, value) = set_completion(&f, &f.student, bad).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "bad_request");
    }

    Ok(())
}

#[tokio::test]
async fn completion_update_is_gated_to_owner_teacher_admin() -> Result<()> {
    let f = fixture().await?;

    // an unrelated student is outside the milestone's visible set entirely
    let (stranger, _) = f.test.register("bob", "student").await?;
    let (status, _) = set_completion(&f, &stranger, json!(10)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (admin, admin_id) = f.test.register("root", "teacher").await?;
    f.test.make_admin(admin_id).await?;
    let (status, _) = set_completion(&f, &admin, json!(10)).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn students_cannot_create_or_delete_milestones() -> Result<()> {
    let test = common::setup().await?;

    let (student, _) = test.register("alice", "student").await?;
    let project = test.create_project(&student, "p", json!({})).await?;

    // even on their own project, milestone writes belong to assigned teachers
    let body = json!({
        "project_id": project,
        "title": "m",
        "description": "d",
        "deadline": "2026-01-15T12:00:00Z",
    });
    let (status, _) = test.request("POST", "/milestones", Some(&student), Some(body)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn milestone_create_derives_status_from_completion() -> Result<()> {
    let test = common::setup().await?;

    let (student, _) = test.register("alice", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;
    let project = test.create_project(&student, "p", json!({})).await?;
    test.propose_assignment(&student, project, teacher_id, "supervisor").await?;

    let body = json!({
        "project_id": project,
        "title": "half done already",
        "description": "d",
        "completion": 40,
        "deadline": "2026-01-15T12:00:00Z",
    });
    let (status, created) = test.request("POST", "/milestones", Some(&teacher), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "in_progress");

    Ok(())
}

#[tokio::test]
async fn milestone_listing_is_scoped_and_filterable() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let alices = test.create_project(&alice, "a", json!({})).await?;
    let bobs = test.create_project(&bob, "b", json!({ "public_visibility": true })).await?;
    test.propose_assignment(&alice, alices, teacher_id, "supervisor").await?;
    test.propose_assignment(&teacher, bobs, teacher_id, "opponent").await?;

    for (project, deadline) in [(alices, "2026-03-01T00:00:00Z"), (bobs, "2026-01-01T00:00:00Z")] {
        let body = json!({
            "project_id": project,
            "title": "m",
            "description": "d",
            "deadline": deadline,
        });
        let (status, _) = test.request("POST", "/milestones", Some(&teacher), Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    // alice only sees her own project's milestone, despite bob's being public
    let (_, list) = test.request("GET", "/milestones", Some(&alice), None).await?;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["project_id"], alices.to_string());

    // the teacher sees both, ordered by deadline
    let (_, list) = test.request("GET", "/milestones", Some(&teacher), None).await?;
    let deadlines: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["deadline"].as_str().unwrap())
        .collect();
    assert_eq!(deadlines.len(), 2);
    assert!(deadlines[0] < deadlines[1]);

    let (_, list) = test
        .request(
            "GET",
            &format!("/milestones?project_id={}", alices),
            Some(&teacher),
            None,
        )
        .await?;
    assert_eq!(list.as_array().unwrap().len(), 1);

    Ok(())
}
