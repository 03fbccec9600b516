use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn consultation_create_requires_assignment_and_forces_teacher() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (assigned, assigned_id) = test.register("newton", "teacher").await?;
    let (outsider, _) = test.register("leibniz", "teacher").await?;

    let project = test.create_project(&alice, "p", json!({})).await?;
    test.propose_assignment(&alice, project, assigned_id, "supervisor").await?;

    let body = json!({
        "project_id": project,
        "notes": "initial scoping",
        "consultation_date": "2026-02-10T14:00:00Z",
    });

    // an unassigned teacher is refused at the pre-check
    let (status, _) = test
        .request("POST", "/consultations", Some(&outsider), Some(body.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // students may not record consultations at all
    let (status, _) = test
        .request("POST", "/consultations", Some(&alice), Some(body.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the assigned teacher is recorded as the consulting teacher
    let (status, created) = test
        .request("POST", "/consultations", Some(&assigned), Some(body))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["teacher_id"], assigned_id.to_string());

    // the owning student sees it in their scope
    let (_, list) = test.request("GET", "/consultations", Some(&alice), None).await?;
    assert_eq!(list.as_array().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn directly_named_teacher_sees_record_without_assignment() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (named, named_id) = test.register("newton", "teacher").await?;
    let (admin, admin_id) = test.register("root", "teacher").await?;
    test.make_admin(admin_id).await?;

    let project = test.create_project(&alice, "p", json!({})).await?;

    // admin records a consultation naming a teacher with no assignment
    let body = json!({
        "project_id": project,
        "teacher_id": named_id,
        "notes": "ad-hoc advice",
        "consultation_date": "2026-02-10T14:00:00Z",
    });
    let (status, created) = test.request("POST", "/consultations", Some(&admin), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();

    // visibility is a union: the named teacher sees it even unassigned
    let (status, _) = test
        .request("GET", &format!("/consultations/{}", id), Some(&named), None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = test.request("GET", "/consultations", Some(&named), None).await?;
    assert_eq!(list.as_array().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn evaluation_lifecycle_for_assigned_teacher() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let project = test.create_project(&alice, "p", json!({})).await?;
    test.propose_assignment(&alice, project, teacher_id, "opponent").await?;

    let body = json!({
        "project_id": project,
        "evaluation": "solid work",
        "score": 88,
    });
    let (status, created) = test.request("POST", "/evaluations", Some(&teacher), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["teacher_id"], teacher_id.to_string());
    assert_eq!(created["score"], 88);
    let id = created["id"].as_str().unwrap().to_string();

    let update = json!({ "score": 91 });
    let (status, updated) = test
        .request("PUT", &format!("/evaluations/{}", id), Some(&teacher), Some(update))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["score"], 91);

    // the student reads but cannot touch
    let (status, _) = test
        .request("GET", &format!("/evaluations/{}", id), Some(&alice), None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = test
        .request(
            "PUT",
            &format!("/evaluations/{}", id),
            Some(&alice),
            Some(json!({ "score": 100 })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = test
        .request("DELETE", &format!("/evaluations/{}", id), Some(&teacher), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = test
        .request("GET", &format!("/evaluations/{}", id), Some(&teacher), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn students_never_see_foreign_consultations() -> Result<()> {
    let test = common::setup().await?;

    let (alice, _) = test.register("alice", "student").await?;
    let (bob, _) = test.register("bob", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let project = test
        .create_project(&alice, "public p", json!({ "public_visibility": true }))
        .await?;
    test.propose_assignment(&alice, project, teacher_id, "supervisor").await?;

    let body = json!({
        "project_id": project,
        "notes": "notes",
        "consultation_date": "2026-02-10T14:00:00Z",
    });
    test.request("POST", "/consultations", Some(&teacher), Some(body)).await?;

    // bob sees the public project but not its consultations
    let (_, list) = test.request("GET", "/consultations", Some(&bob), None).await?;
    assert!(list.as_array().unwrap().is_empty());

    Ok(())
}
