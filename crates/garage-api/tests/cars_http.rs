use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;
use tower::ServiceExt;

use garage_api::router;
use garage_api::state::{AppState, AppStateInner};
use garage_api::storage::ImageStorage;
use garage_db::Database;
use garage_types::api::{Claims, ErrorResponse};
use garage_types::models::CarRecord;

const SECRET: &str = "integration-secret";

async fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let storage = ImageStorage::new(dir.path().join("uploads")).await.unwrap();
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        storage,
        jwt_secret: SECRET.into(),
        max_upload_bytes: 64 * 1024,
    });
    (dir, state)
}

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn image(name: &str) -> Part {
    Part::bytes(format!("fake jpeg: {name}").into_bytes())
        .file_name(name.to_string())
        .mime_str("image/jpeg")
        .unwrap()
}

#[tokio::test]
async fn test_health_and_auth_guard() {
    let (_dir, state) = test_state().await;
    let app = router(state);

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/api/cars").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/cars")
                .header("Authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_car_lifecycle() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let base = format!("http://{addr}/api/cars");
    let client = reqwest::Client::new();
    let alice = token("alice");
    let mallory = token("mallory");

    // Create
    let form = Form::new()
        .text("title", "Golf")
        .text("description", "GTI, 2004")
        .text("tags", "vw, hatch")
        .part("images", image("front.jpg"))
        .part("images", image("back.jpg"));
    let res = client.post(&base).bearer_auth(&alice).multipart(form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let car: CarRecord = res.json().await.unwrap();
    assert_eq!(car.owner_id, "alice");
    assert_eq!(car.tags, vec!["vw", "hatch"]);
    assert_eq!(car.images.len(), 2);
    assert!(state.storage.exists(&car.images[0]).await);

    // Images are served statically
    let res = client
        .get(format!("http://{addr}/{}", car.images[0]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"fake jpeg: front.jpg");

    // Other users can't see it
    let res = client.get(format!("{base}/{}", car.id)).bearer_auth(&mallory).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client
        .get(format!("{base}/{}", uuid::Uuid::new_v4()))
        .bearer_auth(&mallory)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let cars: Vec<CarRecord> = client.get(&base).bearer_auth(&mallory).send().await.unwrap().json().await.unwrap();
    assert!(cars.is_empty());

    // Update: new title, drop the back image, add a side image
    let deleted = serde_json::to_string(&[&car.images[1]]).unwrap();
    let form = Form::new()
        .text("title", "Golf GTI")
        .text("images", car.images[0].clone())
        .part("images", image("side.jpg"))
        .text("deletedImages", deleted);
    let res = client
        .put(format!("{base}/{}", car.id))
        .bearer_auth(&alice)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: CarRecord = res.json().await.unwrap();
    assert_eq!(updated.title, "Golf GTI");
    assert_eq!(updated.description.as_deref(), Some("GTI, 2004"));
    assert_eq!(updated.tags, car.tags);
    assert_eq!(updated.images.len(), 2);
    assert_eq!(updated.images[0], car.images[0]);
    assert!(updated.images[1].ends_with("-side.jpg"));
    assert!(!state.storage.exists(&car.images[1]).await);

    let fetched: CarRecord = client
        .get(format!("{base}/{}", car.id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, updated);

    // Delete
    let res = client.delete(format!("{base}/{}", car.id)).bearer_auth(&mallory).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = client.delete(format!("{base}/{}", car.id)).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    for img in &updated.images {
        assert!(!state.storage.exists(img).await);
    }
    let cars: Vec<CarRecord> = client.get(&base).bearer_auth(&alice).send().await.unwrap().json().await.unwrap();
    assert!(cars.is_empty());
}

#[tokio::test]
async fn test_update_limit_rejected() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let base = format!("http://{addr}/api/cars");
    let client = reqwest::Client::new();
    let alice = token("alice");

    let form = Form::new()
        .text("title", "Miata")
        .part("images", image("a.jpg"))
        .part("images", image("b.jpg"))
        .part("images", image("c.jpg"));
    let car: CarRecord = client
        .post(&base)
        .bearer_auth(&alice)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut form = Form::new().text("deletedImages", serde_json::to_string(&car.images).unwrap());
    for i in 0..8 {
        form = form.part("images", image(&format!("new{i}.jpg")));
    }
    let res = client
        .put(format!("{base}/{}", car.id))
        .bearer_auth(&alice)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = res.json().await.unwrap();
    assert_eq!(body.error, "You can upload up to 10 images only.");

    let after = state.db.find_owned("alice", &car.id).unwrap().unwrap();
    assert_eq!(after, car);
    for img in &car.images {
        assert!(state.storage.exists(img).await);
    }
    // Only the three original images remain on disk.
    assert_eq!(std::fs::read_dir(state.storage.dir()).unwrap().count(), 3);
}

#[tokio::test]
async fn test_create_rejects_eleven_images() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let client = reqwest::Client::new();

    let mut form = Form::new().text("title", "Too many");
    for i in 0..11 {
        form = form.part("images", image(&format!("{i}.jpg")));
    }
    let res = client
        .post(format!("http://{addr}/api/cars"))
        .bearer_auth(token("alice"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(state.db.list_owned("alice").unwrap().is_empty());
    assert_eq!(std::fs::read_dir(state.storage.dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_malformed_deleted_images() {
    let (_dir, state) = test_state().await;
    let addr = spawn_server(state.clone()).await;
    let base = format!("http://{addr}/api/cars");
    let client = reqwest::Client::new();
    let alice = token("alice");

    let car: CarRecord = client
        .post(&base)
        .bearer_auth(&alice)
        .multipart(Form::new().text("title", "Beetle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(car.images.is_empty());
    assert!(car.description.is_none());

    let res = client
        .put(format!("{base}/{}", car.id))
        .bearer_auth(&alice)
        .multipart(Form::new().text("deletedImages", "uploads/x.jpg"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(format!("{base}/not-a-uuid"))
        .bearer_auth(&alice)
        .multipart(Form::new().text("title", "x"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
