//! End-to-end behaviour of the API client over a scripted transport

mod common;

use common::{account_json, client_with, ScriptedTransport, ERROR_BODY};
use removebg_saver::{
    params::FieldValue, transport::Method, DetectedType, ErrorCode, ForegroundType, ImageSize,
    RemoveBackgroundParams, RemoveBgError,
};
use std::sync::Arc;

fn url_params() -> RemoveBackgroundParams {
    RemoveBackgroundParams::builder()
        .image_url("https://images.example.test/dog.jpg")
        .size(ImageSize::Regular)
        .foreground_type(ForegroundType::Animal)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_every_documented_status_maps_to_its_kind() {
    let transport = Arc::new(ScriptedTransport::default());
    for status in [400, 402, 403, 429, 500] {
        transport.respond(status, &[("Retry-After", "7")], ERROR_BODY);
    }
    let client = client_with(transport);
    let params = url_params();

    let err = client.remove_background(&params).await.unwrap_err();
    assert!(matches!(err, RemoveBgError::InvalidParameters(_)));

    let err = client.remove_background(&params).await.unwrap_err();
    assert!(matches!(err, RemoveBgError::InsufficientCredits(_)));

    let err = client.remove_background(&params).await.unwrap_err();
    assert!(matches!(err, RemoveBgError::AuthFailure(_)));

    let err = client.remove_background(&params).await.unwrap_err();
    match &err {
        RemoveBgError::RateLimited {
            retry_after,
            errors,
        } => {
            assert_eq!(*retry_after, Some(7));
            assert_eq!(errors.first().title, "Something went wrong");
        },
        other => panic!("expected RateLimited, got {:?}", other),
    }
    assert!(err.is_retryable());

    let err = client.remove_background(&params).await.unwrap_err();
    assert!(matches!(
        err,
        RemoveBgError::UnexpectedStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_error_body_is_carried_verbatim() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(400, &[], ERROR_BODY);
    let client = client_with(transport);

    let err = client.remove_background(&url_params()).await.unwrap_err();
    let errors = err.error_response().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.first().detail.as_deref(), Some("details here"));
    // codes outside the known set still parse
    assert!(errors.has_code(ErrorCode::Unknown));
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_no_response_is_transport_error() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.drop_connection();
    let client = client_with(transport);

    let err = client.get_account().await.unwrap_err();
    assert!(matches!(err, RemoveBgError::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_removal_request_shape() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        200,
        &[("X-Type", "animal"), ("X-Width", "800"), ("X-Height", "600")],
        r#"{"data":{"result_b64":"aGVsbG8="}}"#,
    );
    let client = client_with(transport.clone());

    let result = client.remove_background(&url_params()).await.unwrap();
    assert_eq!(result.detected_type, DetectedType::Animal);
    assert_eq!((result.result_width, result.result_height), (800, 600));
    assert_eq!(result.image.unwrap().to_bytes().unwrap().as_ref(), b"hello");

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    let request = seen.first().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "https://api.example.test/v1.0/removebg");
    assert_eq!(request.header("x-api-key"), Some("integration-key"));

    let form = request.form.as_ref().unwrap();
    let first = form.first().unwrap();
    assert_eq!(first.name, "image_url");
    assert_eq!(
        first.value,
        FieldValue::Text("https://images.example.test/dog.jpg".to_string())
    );
    assert!(form
        .iter()
        .any(|f| f.name == "size" && f.as_text() == Some("regular")));
    assert!(form
        .iter()
        .any(|f| f.name == "type" && f.as_text() == Some("animal")));
}

#[tokio::test]
async fn test_account_is_fetched_fresh_each_time() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(200, &[], account_json(200.0));
    transport.respond(200, &[], account_json(199.0));
    let client = client_with(transport.clone());

    let first = client.get_account().await.unwrap();
    let second = client.get_account().await.unwrap();

    assert_eq!(first.credits.total, 200.0);
    assert_eq!(second.credits.total, 199.0);
    assert_eq!(first.api, second.api);
    assert_eq!(transport.seen().len(), 2);
    assert!(transport
        .seen()
        .iter()
        .all(|r| r.method == Method::Get && r.url.ends_with("/account")));
}

#[tokio::test]
async fn test_file_upload_writes_result_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("portrait.jpg");
    std::fs::write(&input, b"jpeg-bytes").unwrap();

    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(200, &[("X-Type", "person")], &b"png-bytes"[..]);
    let client = client_with(transport.clone());

    let params = RemoveBackgroundParams::from_path(&input).await.unwrap();
    let output = dir.path().join("out").join("portrait_no_bg.png");
    let result = client
        .remove_background_to_file(&params, &output)
        .await
        .unwrap();

    assert!(result.image.is_none());
    assert_eq!(result.detected_type, DetectedType::Person);
    assert_eq!(std::fs::read(&output).unwrap(), b"png-bytes");

    let seen = transport.seen();
    let request = seen.first().unwrap();
    match &request.form.as_ref().unwrap().first().unwrap().value {
        FieldValue::File { data, file_name } => {
            assert_eq!(data.as_ref(), b"jpeg-bytes");
            assert_eq!(file_name, "portrait.jpg");
        },
        other => panic!("expected file field, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_params_never_reach_the_network() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client_with(transport.clone());

    let params = RemoveBackgroundParams::from_url("   ");
    let err = client.remove_background(&params).await.unwrap_err();

    assert!(matches!(err, RemoveBgError::InvalidRequest(_)));
    assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn test_shadow_options_are_left_to_the_service() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(400, &[], ERROR_BODY);
    let client = client_with(transport.clone());

    let params = RemoveBackgroundParams::builder()
        .image_url("https://images.example.test/car.jpg")
        .shadow_opacity(150)
        .build()
        .unwrap();
    let err = client.remove_background(&params).await.unwrap_err();

    assert!(matches!(err, RemoveBgError::InvalidParameters(_)));
    let seen = transport.seen();
    let form = seen.first().unwrap().form.as_ref().unwrap();
    assert!(form
        .iter()
        .any(|f| f.name == "shadow_opacity" && f.as_text() == Some("150")));
}
