//! Flavor catalog API tests.

mod common;

use axum::http::StatusCode;
use common::{fixtures, TestConfig, TestFixture, ADMIN_KEY, VIEWER_KEY};
use humorflow_core::FlavorStore;
use serde_json::json;

#[tokio::test]
async fn test_flavor_crud_lifecycle() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .post(
            "/api/v1/flavors",
            json!({ "slug": "office-humor", "description": "Dry workplace jokes" }),
        )
        .await;
    assert_status!(created, StatusCode::CREATED);
    assert_json_path!(created.body, "slug", json!("office-humor"));
    assert_json_path!(created.body, "step_count", json!(0));
    let id = created.body["id"].as_i64().unwrap();

    let fetched = fixture.get(&format!("/api/v1/flavors/{}", id)).await;
    assert_status!(fetched, StatusCode::OK);
    assert_json_path!(fetched.body, "description", json!("Dry workplace jokes"));

    let updated = fixture
        .put(
            &format!("/api/v1/flavors/{}", id),
            json!({ "slug": "office-humor-v2", "description": "" }),
        )
        .await;
    assert_status!(updated, StatusCode::OK);
    assert_json_path!(updated.body, "slug", json!("office-humor-v2"));
    assert!(updated.body["description"].is_null());

    let deleted = fixture.delete(&format!("/api/v1/flavors/{}", id)).await;
    assert_status!(deleted, StatusCode::OK);

    let missing = fixture.get(&format!("/api/v1/flavors/{}", id)).await;
    assert_status!(missing, StatusCode::NOT_FOUND);
    assert!(missing.body["error"].is_string());
}

#[tokio::test]
async fn test_list_and_search_flavors() {
    let fixture = TestFixture::new().await;
    fixture
        .store
        .create_flavor(&fixtures::flavor_input("sarcastic", "Biting remarks"))
        .unwrap();
    fixture
        .store
        .create_flavor(&fixtures::flavor_input("wholesome", "Kind puns"))
        .unwrap();

    let all = fixture.get("/api/v1/flavors").await;
    assert_status!(all, StatusCode::OK);
    assert_json_path!(all.body, "total", json!(2));

    let searched = fixture.get("/api/v1/flavors?search=PUNS").await;
    assert_status!(searched, StatusCode::OK);
    assert_json_path!(searched.body, "total", json!(1));
    assert_eq!(searched.body["flavors"][0]["slug"], "wholesome");
}

#[tokio::test]
async fn test_create_flavor_validation_and_conflict() {
    let fixture = TestFixture::new().await;

    let blank = fixture
        .post("/api/v1/flavors", json!({ "slug": "  " }))
        .await;
    assert_status!(blank, StatusCode::BAD_REQUEST);

    fixture
        .post("/api/v1/flavors", json!({ "slug": "dupe" }))
        .await;
    let duplicate = fixture
        .post("/api/v1/flavors", json!({ "slug": "dupe" }))
        .await;
    assert_status!(duplicate, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_steps_are_listed_in_execution_order() {
    let fixture = TestFixture::new().await;
    let flavor = fixture
        .store
        .create_flavor(&fixtures::flavor_input("chain", "Two-step"))
        .unwrap();

    for (order, prompt) in [(2, "Punch it up"), (1, "Describe the image")] {
        let response = fixture
            .post(
                &format!("/api/v1/flavors/{}/steps", flavor.id),
                json!({ "order_by": order, "llm_user_prompt": prompt, "llm_temperature": 0.5 }),
            )
            .await;
        assert_status!(response, StatusCode::CREATED);
    }

    let listed = fixture
        .get(&format!("/api/v1/flavors/{}/steps", flavor.id))
        .await;
    assert_status!(listed, StatusCode::OK);
    assert_eq!(listed.body["flavor"]["step_count"], 2);
    let steps = listed.body["steps"].as_array().unwrap();
    assert_eq!(steps[0]["llm_user_prompt"], "Describe the image");
    assert_eq!(steps[1]["llm_user_prompt"], "Punch it up");

    let step_id = steps[0]["id"].as_i64().unwrap();
    let updated = fixture
        .put(
            &format!("/api/v1/steps/{}", step_id),
            json!({ "order_by": 3, "llm_user_prompt": "Describe it briefly" }),
        )
        .await;
    assert_status!(updated, StatusCode::OK);
    assert_json_path!(updated.body, "order_by", json!(3));

    let deleted = fixture.delete(&format!("/api/v1/steps/{}", step_id)).await;
    assert_status!(deleted, StatusCode::OK);
    let gone = fixture.get(&format!("/api/v1/steps/{}", step_id)).await;
    assert_status!(gone, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_steps_for_missing_flavor() {
    let fixture = TestFixture::new().await;

    let listed = fixture.get("/api/v1/flavors/999/steps").await;
    assert_status!(listed, StatusCode::NOT_FOUND);

    let created = fixture
        .post("/api/v1/flavors/999/steps", json!({ "order_by": 1 }))
        .await;
    assert_status!(created, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lookups() {
    let fixture = TestFixture::new().await;

    let added = fixture
        .post("/api/v1/lookups/llm_models", json!({ "name": "gpt-4.1" }))
        .await;
    assert_status!(added, StatusCode::CREATED);

    let listed = fixture.get("/api/v1/lookups/llm_models").await;
    assert_status!(listed, StatusCode::OK);
    assert_eq!(listed.body["kind"], "llm_models");
    assert_eq!(listed.body["items"][0]["name"], "gpt-4.1");

    let unknown = fixture.get("/api/v1/lookups/profiles").await;
    assert_status!(unknown, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_viewer_can_read_but_not_write() {
    let fixture = TestFixture::with_config(TestConfig::with_api_keys()).await;
    let flavor = fixture
        .store
        .create_flavor(&fixtures::flavor_input("readonly", "Look, don't touch"))
        .unwrap();

    let read = fixture.get_as("/api/v1/flavors", VIEWER_KEY).await;
    assert_status!(read, StatusCode::OK);

    let write = fixture
        .post_as(
            "/api/v1/flavors",
            json!({ "slug": "sneaky" }),
            Some(VIEWER_KEY),
        )
        .await;
    assert_status!(write, StatusCode::FORBIDDEN);

    let delete = fixture
        .delete_as(&format!("/api/v1/flavors/{}", flavor.id), VIEWER_KEY)
        .await;
    assert_status!(delete, StatusCode::FORBIDDEN);

    let admin_delete = fixture
        .delete_as(&format!("/api/v1/flavors/{}", flavor.id), ADMIN_KEY)
        .await;
    assert_status!(admin_delete, StatusCode::OK);
}

#[tokio::test]
async fn test_reads_require_authentication() {
    let fixture = TestFixture::with_config(TestConfig::with_api_keys()).await;

    let response = fixture.get("/api/v1/flavors").await;
    assert_status!(response, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_endpoints() {
    let fixture = TestFixture::with_config(TestConfig::with_api_keys()).await;

    let health = fixture.get("/api/v1/health").await;
    assert_status!(health, StatusCode::OK);
    assert_json_path!(health.body, "status", json!("ok"));

    let metrics = fixture.get("/api/v1/metrics").await;
    assert_status!(metrics, StatusCode::OK);
    assert!(metrics
        .body
        .as_str()
        .unwrap()
        .contains("humorflow_http_requests_total"));

    let config = fixture.get_as("/api/v1/config", ADMIN_KEY).await;
    assert_status!(config, StatusCode::OK);
    assert_eq!(config.body["auth"]["method"], "api_key");
    assert_eq!(config.body["pipeline"]["api_token_configured"], true);
    assert!(config.body["auth"].get("api_key").is_none());
}
