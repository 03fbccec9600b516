use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

mod common;

/// The full submission story: no document blocks the transition, attaching
/// one unblocks it, visibility stays in teacher/admin hands.
#[tokio::test]
async fn submission_and_visibility_scenario() -> Result<()> {
    let test = common::setup().await?;

    let (student, _) = test.register("svetlana", "student").await?;
    let (teacher, _) = test.register("newton", "teacher").await?;
    let (admin, admin_id) = test.register("root", "teacher").await?;
    test.make_admin(admin_id).await?;

    let project = test.create_project(&student, "X", json!({ "year": 2024 })).await?;

    // submit without a document fails and mutates nothing
    let (status, value) = test
        .request("POST", &format!("/projects/{}/submit", project), Some(&student), None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "precondition_failed");

    let (_, detail) = test
        .request("GET", &format!("/projects/{}", project), Some(&student), None)
        .await?;
    assert_eq!(detail["status"], "draft");

    // attach a document, submit again
    let update = json!({ "document": "uploads/thesis.pdf" });
    let (status, _) = test
        .request("PUT", &format!("/projects/{}", project), Some(&student), Some(update))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, submitted) = test
        .request("POST", &format!("/projects/{}/submit", project), Some(&student), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "submitted");
    // submit never touches visibility
    assert_eq!(submitted["public_visibility"], false);

    // an unassigned teacher may not flip visibility
    let flip = json!({ "public_visibility": true });
    let (status, value) = test
        .request(
            "POST",
            &format!("/projects/{}/set_visibility", project),
            Some(&teacher),
            Some(flip.clone()),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["error"], "forbidden");

    // neither may the owning student
    let (status, _) = test
        .request(
            "POST",
            &format!("/projects/{}/set_visibility", project),
            Some(&student),
            Some(flip.clone()),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // an admin may; the project becomes publicly listed
    let (status, flipped) = test
        .request(
            "POST",
            &format!("/projects/{}/set_visibility", project),
            Some(&admin),
            Some(flip),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flipped["public_visibility"], true);

    let (_, page) = test.request("GET", "/public/projects", None, None).await?;
    let titles: Vec<&str> = page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["X"]);

    Ok(())
}

#[tokio::test]
async fn assigned_teacher_may_set_visibility() -> Result<()> {
    let test = common::setup().await?;

    let (student, _) = test.register("svetlana", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let project = test.create_project(&student, "X", json!({})).await?;
    test.propose_assignment(&student, project, teacher_id, "supervisor").await?;

    let (status, flipped) = test
        .request(
            "POST",
            &format!("/projects/{}/set_visibility", project),
            Some(&teacher),
            Some(json!({ "public_visibility": true })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flipped["public_visibility"], true);

    Ok(())
}

#[tokio::test]
async fn only_involved_actors_may_update_or_delete() -> Result<()> {
    let test = common::setup().await?;

    let (owner, _) = test.register("owner", "student").await?;
    let (intruder, _) = test.register("intruder", "student").await?;
    let (teacher, teacher_id) = test.register("newton", "teacher").await?;

    let project = test
        .create_project(&owner, "mine", json!({ "public_visibility": true }))
        .await?;

    // a foreign student can see the public project but not touch it
    let update = json!({ "title": "stolen" });
    let (status, _) = test
        .request("PUT", &format!("/projects/{}", project), Some(&intruder), Some(update.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // an unassigned teacher cannot either
    let (status, _) = test
        .request("PUT", &format!("/projects/{}", project), Some(&teacher), Some(update.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // once assigned, the teacher can
    test.propose_assignment(&owner, project, teacher_id, "consultant").await?;
    let (status, updated) = test
        .request("PUT", &format!("/projects/{}", project), Some(&teacher), Some(update))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "stolen");

    Ok(())
}
