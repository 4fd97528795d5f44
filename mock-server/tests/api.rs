use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, load_seed, City};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn seeded() -> axum::Router {
    app_with(
        load_seed(
            r#"[
                {"id":1,"cityName":"Lisbon","country":"Portugal"},
                {"id":2,"cityName":"Madrid","country":"Spain"}
            ]"#,
        )
        .unwrap(),
    )
}

// --- list ---

#[tokio::test]
async fn list_cities_empty() {
    let resp = app().oneshot(empty_request("GET", "/cities")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cities: Vec<City> = body_json(resp).await;
    assert!(cities.is_empty());
}

#[tokio::test]
async fn list_cities_keeps_seed_order() {
    let resp = seeded().oneshot(empty_request("GET", "/cities")).await.unwrap();

    let cities: Vec<City> = body_json(resp).await;
    let ids: Vec<u64> = cities.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(cities[1].fields["country"], "Spain");
}

// --- create ---

#[tokio::test]
async fn create_city_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request("POST", "/cities", r#"{"cityName":"Porto","notes":""}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let city: City = body_json(resp).await;
    assert_eq!(city.id, 1);
    assert_eq!(city.fields["cityName"], "Porto");
}

#[tokio::test]
async fn create_city_ignores_client_id() {
    let resp = seeded()
        .oneshot(json_request("POST", "/cities", r#"{"id":1,"cityName":"Faro"}"#))
        .await
        .unwrap();

    let city: City = body_json(resp).await;
    assert_eq!(city.id, 3);
}

#[tokio::test]
async fn create_city_non_object_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/cities", "[1,2]"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get ---

#[tokio::test]
async fn get_city_found() {
    let resp = seeded().oneshot(empty_request("GET", "/cities/2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let city: City = body_json(resp).await;
    assert_eq!(city.fields["cityName"], "Madrid");
}

#[tokio::test]
async fn get_city_not_found() {
    let resp = app().oneshot(empty_request("GET", "/cities/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_city_bad_id_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/cities/not-a-number"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delete ---

#[tokio::test]
async fn delete_city_not_found() {
    let resp = app().oneshot(empty_request("DELETE", "/cities/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = seeded().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/cities", r#"{"cityName":"Berlin","emoji":"🇩🇪"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: City = body_json(resp).await;
    assert_eq!(created.fields["emoji"], "🇩🇪");
    let id = created.id;

    // list: appended after the seed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/cities"))
        .await
        .unwrap();
    let cities: Vec<City> = body_json(resp).await;
    assert_eq!(cities.len(), 3);
    assert_eq!(cities[2], created);

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/cities/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: City = body_json(resp).await;
    assert_eq!(fetched, created);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/cities/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/cities/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // ids are not reused
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/cities", r#"{"cityName":"Hamburg"}"#))
        .await
        .unwrap();
    let next: City = body_json(resp).await;
    assert_eq!(next.id, id + 1);
}
