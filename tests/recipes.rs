mod common;

use common::{attribute_id, result_ids, TestApp, PNG};
use serde_json::json;
use warp::http::StatusCode;

#[tokio::test]
async fn requires_authentication() {
    let app = TestApp::new();

    let response = app.request("GET", "/recipes/", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["detail"].is_string());

    let response = app.request("GET", "/recipes/", Some("garbage"), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_assigns_owner_from_session() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com").await;
    let (bob_user, bob) = app.user("bob@example.com").await;

    let response = app
        .post(
            "/recipes/",
            &alice,
            json!({
                "title": "Soup",
                "time_minutes": 15,
                "price": 4.5,
                "user": bob_user.id,
                "tags": [{"name": "Dinner"}],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["title"], "Soup");
    assert_eq!(response.body["price"], "4.50");
    assert_eq!(response.body["image"], serde_json::Value::Null);
    assert_eq!(response.body["tags"][0]["name"], "Dinner");
    assert!(response.body.get("user").is_none());

    let alice_list = app.get("/recipes/", &alice).await;
    assert_eq!(alice_list.body["count"], 1);

    let bob_list = app.get("/recipes/", &bob).await;
    assert_eq!(bob_list.status, StatusCode::OK);
    assert_eq!(bob_list.body["count"], 0);
    assert_eq!(result_ids(&bob_list.body), Vec::<i64>::new());
}

#[tokio::test]
async fn create_validates_body() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let response = app.post("/recipes/", &token, json!({"title": ""})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["title"].is_array());
    assert!(response.body["time_minutes"].is_array());
    assert!(response.body["price"].is_array());
    assert_eq!(app.get("/recipes/", &token).await.body["count"], 0);
}

#[tokio::test]
async fn list_uses_summary_shape_and_detail_uses_nested_shape() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Curry", &["Spicy"], &["Rice"]).await;
    let id = recipe["id"].as_i64().unwrap();
    let tag_id = attribute_id(&recipe, "tags", "Spicy");

    let list = app.get("/recipes/", &token).await;
    let summary = &list.body["results"][0];
    assert_eq!(summary["tags"], json!([tag_id]));
    assert!(summary.get("description").is_none());
    assert!(summary.get("image").is_none());

    let detail = app.get(&format!("/recipes/{id}/"), &token).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["tags"], json!([{"id": tag_id, "name": "Spicy"}]));
    assert_eq!(detail.body["ingredients"][0]["name"], "Rice");
    assert_eq!(detail.body["description"], "");
}

#[tokio::test]
async fn foreign_recipes_read_as_missing() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com").await;
    let (_, bob) = app.user("bob@example.com").await;
    let recipe = app.create_recipe(&alice, "Private", &[], &[]).await;
    let path = format!("/recipes/{}/", recipe["id"]);

    assert_eq!(app.get(&path, &bob).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.patch(&path, &bob, json!({"title": "Stolen"})).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.put(
            &path,
            &bob,
            json!({"title": "Stolen", "time_minutes": 1, "price": "1.00"})
        )
        .await
        .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&path, &bob).await.status, StatusCode::NOT_FOUND);

    let unchanged = app.get(&path, &alice).await;
    assert_eq!(unchanged.status, StatusCode::OK);
    assert_eq!(unchanged.body["title"], "Private");
}

#[tokio::test]
async fn missing_recipe_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let response = app.get("/recipes/999/", &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"detail": "Not found."}));
}

#[tokio::test]
async fn partial_and_full_updates() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Stew", &["Winter", "Slow"], &[]).await;
    let path = format!("/recipes/{}/", recipe["id"]);

    let response = app.patch(&path, &token, json!({"title": "Beef stew"})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Beef stew");
    assert_eq!(response.body["tags"].as_array().unwrap().len(), 2);

    let response = app.patch(&path, &token, json!({"tags": []})).await;
    assert_eq!(response.body["tags"], json!([]));

    let response = app.put(&path, &token, json!({"title": "Only title"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["price"].is_array());

    let response = app
        .put(
            &path,
            &token,
            json!({
                "title": "Fish stew",
                "time_minutes": 45,
                "price": "12.30",
                "link": "https://example.com/stew",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["time_minutes"], 45);
    assert_eq!(response.body["price"], "12.30");
    assert_eq!(response.body["link"], "https://example.com/stew");
}

#[tokio::test]
async fn delete_removes_recipe() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Toast", &[], &[]).await;
    let path = format!("/recipes/{}/", recipe["id"]);

    let response = app.delete(&path, &token).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.bytes.is_empty());

    assert_eq!(app.get(&path, &token).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&path, &token).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filters_by_any_listed_tag_without_duplicates() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let first = app.create_recipe(&token, "First", &["A"], &[]).await;
    let second = app.create_recipe(&token, "Second", &["B"], &[]).await;
    let both = app.create_recipe(&token, "Both", &["A", "B"], &[]).await;
    app.create_recipe(&token, "Untagged", &[], &[]).await;

    let a = attribute_id(&first, "tags", "A");
    let b = attribute_id(&second, "tags", "B");
    assert_eq!(attribute_id(&both, "tags", "A"), a);

    let response = app.get(&format!("/recipes/?tags={a},{b}"), &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 3);
    assert_eq!(
        result_ids(&response.body),
        vec![
            both["id"].as_i64().unwrap(),
            second["id"].as_i64().unwrap(),
            first["id"].as_i64().unwrap(),
        ]
    );

    let response = app.get(&format!("/recipes/?tags={b}"), &token).await;
    assert_eq!(response.body["count"], 2);
}

#[tokio::test]
async fn combines_tag_and_ingredient_filters() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let vegan_rice = app.create_recipe(&token, "Vegan rice", &["Vegan"], &["Rice"]).await;
    app.create_recipe(&token, "Vegan salad", &["Vegan"], &["Lettuce"]).await;
    app.create_recipe(&token, "Chicken rice", &["Meat"], &["Rice"]).await;

    let vegan = attribute_id(&vegan_rice, "tags", "Vegan");
    let rice = attribute_id(&vegan_rice, "ingredients", "Rice");

    let response = app
        .get(&format!("/recipes/?tags={vegan}&ingredients={rice}"), &token)
        .await;

    assert_eq!(result_ids(&response.body), vec![vegan_rice["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn empty_filter_values_are_ignored() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    app.create_recipe(&token, "One", &["A"], &[]).await;
    app.create_recipe(&token, "Two", &[], &[]).await;

    let response = app.get("/recipes/?tags=&ingredients=", &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let response = app.get("/recipes/?tags=abc", &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["tags"].is_array());

    let response = app.get("/recipes/?ingredients=1,x&offset=-1", &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["ingredients"].is_array());
    assert!(response.body["offset"].is_array());
}

#[tokio::test]
async fn filters_never_reach_other_users() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com").await;
    let (_, bob) = app.user("bob@example.com").await;

    let recipe = app.create_recipe(&alice, "Alice's", &["Shared"], &[]).await;
    let tag = attribute_id(&recipe, "tags", "Shared");

    let response = app.get(&format!("/recipes/?tags={tag}"), &bob).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 0);
}

#[tokio::test]
async fn paginates_with_offsets() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    for n in 0..12 {
        app.create_recipe(&token, &format!("Recipe {n}"), &[], &[]).await;
    }

    let first = app.get("/recipes/", &token).await;
    assert_eq!(first.body["count"], 12);
    assert_eq!(first.body["results"].as_array().unwrap().len(), 10);
    assert_eq!(first.body["next"], 10);
    assert_eq!(first.body["previous"], serde_json::Value::Null);

    let second = app.get("/recipes/?offset=10", &token).await;
    assert_eq!(second.body["results"].as_array().unwrap().len(), 2);
    assert_eq!(second.body["next"], serde_json::Value::Null);
    assert_eq!(second.body["previous"], 0);
}

#[tokio::test]
async fn rejects_unsupported_methods() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let response = app.request("DELETE", "/recipes/", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

    let response = app.get("/unknown/", &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_upload_leaves_recipe_unchanged() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Cake", &[], &[]).await;
    let id = recipe["id"].as_i64().unwrap();
    let upload_path = format!("/recipes/{id}/upload-image/");

    let response = app
        .upload(&upload_path, &token, "image", "notes.txt", b"definitely not an image")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["image"].is_array());

    let response = app
        .upload(&upload_path, &token, "photo", "cake.png", PNG)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["image"], json!(["No file was submitted."]));

    let response = app
        .post(&upload_path, &token, json!({"image": "not-a-file"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let detail = app.get(&format!("/recipes/{id}/"), &token).await;
    assert_eq!(detail.body["image"], serde_json::Value::Null);
}

#[tokio::test]
async fn valid_upload_is_visible_on_retrieve() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Pie", &[], &[]).await;
    let id = recipe["id"].as_i64().unwrap();

    let response = app
        .upload(&format!("/recipes/{id}/upload-image/"), &token, "image", "pie.png", PNG)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);

    let image = response.body["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("/media/uploads/recipe/"));
    assert!(image.ends_with(".png"));
    assert!(response.body.get("title").is_none());

    let detail = app.get(&format!("/recipes/{id}/"), &token).await;
    assert_eq!(detail.body["image"], image.as_str());

    let served = app.get(&image, &token).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.bytes, PNG);
}

#[tokio::test]
async fn cannot_upload_to_foreign_recipe() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com").await;
    let (_, bob) = app.user("bob@example.com").await;
    let recipe = app.create_recipe(&alice, "Secret", &[], &[]).await;

    let response = app
        .upload(
            &format!("/recipes/{}/upload-image/", recipe["id"]),
            &bob,
            "image",
            "x.png",
            PNG,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corrupted_image_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    let recipe = app.create_recipe(&token, "Tart", &[], &[]).await;
    let id = recipe["id"].as_i64().unwrap();

    let mut corrupt = PNG[..8].to_vec();
    corrupt.extend_from_slice(b"garbage where the chunks should be");

    let response = app
        .upload(&format!("/recipes/{id}/upload-image/"), &token, "image", "tart.png", &corrupt)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["image"],
        json!(["Upload a valid image. The file you uploaded was either not an image or a corrupted image."])
    );

    let detail = app.get(&format!("/recipes/{id}/"), &token).await;
    assert_eq!(detail.body["image"], serde_json::Value::Null);
}

#[tokio::test]
async fn wrongly_typed_fields_are_reported_per_field() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;

    let response = app
        .post(
            "/recipes/",
            &token,
            json!({
                "title": "Curry",
                "time_minutes": "soon",
                "price": "7.00",
                "tags": [1, 2],
                "ingredients": [{"name": 5}],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["time_minutes"], json!(["A valid integer is required."]));
    assert!(response.body["tags"].is_array());
    assert_eq!(response.body["ingredients"], json!(["Not a valid string."]));
    assert!(response.body.get("detail").is_none());
    assert_eq!(app.get("/recipes/", &token).await.body["count"], 0);
}

#[tokio::test]
async fn offset_past_the_end_keeps_total_and_way_back() {
    let app = TestApp::new();
    let (_, token) = app.user("alice@example.com").await;
    for n in 0..3 {
        app.create_recipe(&token, &format!("Recipe {n}"), &[], &[]).await;
    }

    let response = app.get("/recipes/?offset=50", &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 3);
    assert_eq!(response.body["results"], json!([]));
    assert_eq!(response.body["next"], serde_json::Value::Null);
    assert_eq!(response.body["previous"], 0);
}

#[tokio::test]
async fn invalid_update_of_foreign_recipe_is_not_found() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice@example.com").await;
    let (_, bob) = app.user("bob@example.com").await;
    let recipe = app.create_recipe(&alice, "Private", &[], &[]).await;
    let path = format!("/recipes/{}/", recipe["id"]);

    let response = app.put(&path, &bob, json!({"title": ""})).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"detail": "Not found."}));

    let response = app.patch(&path, &bob, json!({"time_minutes": "soon"})).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.put(&path, &alice, json!({"title": ""})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
