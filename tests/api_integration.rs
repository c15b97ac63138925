use axum::{body::Bytes, http::StatusCode};
use axum_test::TestServer;
use galleria::{Config, create_app, images::ImagePage};
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

fn create_test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.templates.directory = PathBuf::from("templates");
    config.static_files.directory = PathBuf::from("static");
    config.storage.data_directory = temp_dir.path().join("data");
    config.storage.uploads_directory = temp_dir.path().join("data/uploads");
    config.gallery.images_per_page = 2;
    config
}

async fn setup_server() -> (TempDir, TestServer) {
    let temp_dir = TempDir::new().unwrap();
    let app = create_app(create_test_config(&temp_dir)).await;
    let server = TestServer::new(app).unwrap();
    (temp_dir, server)
}

async fn create_image(server: &TestServer, title: &str) -> Value {
    let response = server
        .post("/api/images")
        .json(&json!({
            "title": title,
            "description": "A nice day",
            "url": "/uploads/photo.png",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_list_starts_empty() {
    let (_temp_dir, server) = setup_server().await;

    let response = server.get("/api/images").await;
    response.assert_status_ok();
    let page = response.json::<ImagePage>();
    assert!(page.data.is_empty());
    assert!(page.after.is_none());
}

#[tokio::test]
async fn test_create_image_returns_record() {
    let (temp_dir, server) = setup_server().await;

    let image = create_image(&server, "My Photo").await;
    assert_eq!(image["title"], "My Photo");
    assert_eq!(image["url"], "/uploads/photo.png");
    assert!(image["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(image["ts"].is_i64());

    let page = server.get("/api/images").await.json::<ImagePage>();
    assert_eq!(page.data.len(), 1);
    assert!(temp_dir.path().join("data/images.json").exists());
}

#[tokio::test]
async fn test_create_rejects_invalid_fields() {
    let (_temp_dir, server) = setup_server().await;

    let response = server
        .post("/api/images")
        .json(&json!({
            "title": "A",
            "description": "A nice day",
            "url": "/uploads/photo.png",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["field"], "title");
    assert_eq!(body["message"], "Minimum 2 characters.");

    let response = server
        .post("/api/images")
        .json(&json!({
            "title": "My Photo",
            "description": "A nice day",
            "url": "",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["field"], "url");

    for url in ["/a.png\" onerror=\"alert(1)", "/a b.png"] {
        let response = server
            .post("/api/images")
            .json(&json!({
                "title": "My Photo",
                "description": "A nice day",
                "url": url,
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["field"], "url", "{url}");
    }

    let page = server.get("/api/images").await.json::<ImagePage>();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_upload_then_fetch_file() {
    let (_temp_dir, server) = setup_server().await;
    let data = vec![7u8; 2048];

    let response = server
        .post("/api/upload")
        .content_type("image/png")
        .bytes(Bytes::from(data.clone()))
        .await;
    response.assert_status_ok();
    let url = response.json::<Value>()["url"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    let file = server.get(&url).await;
    file.assert_status_ok();
    assert_eq!(file.as_bytes().as_ref(), data.as_slice());
    assert_eq!(
        file.headers()["cache-control"],
        "public, max-age=31536000, immutable"
    );
}

#[tokio::test]
async fn test_upload_rejects_unsupported_format() {
    let (temp_dir, server) = setup_server().await;

    let response = server
        .post("/api/upload")
        .content_type("image/bmp")
        .bytes(Bytes::from(vec![0u8; 512]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["field"], "image");
    assert_eq!(body["message"], "Only PNG, JPEG and GIF files are accepted.");

    let uploads = temp_dir.path().join("data/uploads");
    assert!(!uploads.exists() || std::fs::read_dir(uploads).unwrap().next().is_none());
}

#[tokio::test]
async fn test_upload_rejects_empty_body() {
    let (_temp_dir, server) = setup_server().await;

    let response = server
        .post("/api/upload")
        .content_type("image/png")
        .bytes(Bytes::new())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "File is required.");
}

#[tokio::test]
async fn test_pagination_follows_cursor() {
    let (_temp_dir, server) = setup_server().await;
    for title in ["First", "Second", "Third"] {
        create_image(&server, title).await;
    }

    let first = server.get("/api/images").await.json::<ImagePage>();
    let titles: Vec<&str> = first.data.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second"]);
    let cursor = first.after.expect("cursor for the next page");

    let second = server
        .get("/api/images")
        .add_query_param("after", &cursor)
        .await
        .json::<ImagePage>();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.data[0].title, "Third");
    assert!(second.after.is_none());
}
