//! Integration tests using wiremock to simulate HTTP servers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wirefetch::{
    AbortSignal, Blob, Body, Client, CsrfOptions, Error, FormData, ParseError, RequestOptions,
    ResolveMode, Resolved, StaticCookies, TransportError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

fn client(server: &MockServer) -> Client {
    Client::builder().base_url(server.uri()).build().unwrap()
}

#[tokio::test]
async fn test_get_with_path_variables_and_query() {
    let mock_server = MockServer::start().await;

    let response_data = TestData {
        id: 42,
        name: "Test".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(query_param("active", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_data))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/", mock_server.uri()))
        .build()
        .unwrap();

    let options = RequestOptions::new()
        .path_variable("id", "42")
        .query("active", true);
    let data: TestData = client
        .fetch("/users/:id", &options)
        .await
        .unwrap()
        .into_json()
        .unwrap();

    assert_eq!(data, response_data);
}

#[tokio::test]
async fn test_path_prefix_from_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .path_prefix("api/v2/")
        .build()
        .unwrap();

    let resolved = client.get("items").await.unwrap();
    assert_eq!(resolved.as_text(), Some("ok"));
}

#[tokio::test]
async fn test_post_json_body() {
    let mock_server = MockServer::start().await;

    let request_data = TestData {
        id: 0,
        name: "a".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(&request_data))
        .respond_with(ResponseTemplate::new(201).set_body_json(TestData {
            id: 1,
            name: "a".to_string(),
        }))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolved = client(&mock_server)
        .post("/users", &request_data)
        .await
        .unwrap();

    assert_eq!(resolved.into_json::<TestData>().unwrap().id, 1);
}

#[tokio::test]
async fn test_explicit_content_type_passes_body_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/import"))
        .and(header("content-type", "text/csv"))
        .and(body_string("id,name\n1,a\n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = RequestOptions::new()
        .method_str("put")
        .unwrap()
        .header("Content-Type", "text/csv")
        .unwrap()
        .body("id,name\n1,a\n")
        .resolve(ResolveMode::Void);

    let resolved = client(&mock_server)
        .fetch("/import", &options)
        .await
        .unwrap();
    assert!(resolved.is_void());
}

#[tokio::test]
async fn test_url_encoded_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("user=a+b&pass=%26x"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = RequestOptions::new()
        .method_str("POST")
        .unwrap()
        .body(Body::url_encoded([("user", "a b"), ("pass", "&x")]))
        .resolve(ResolveMode::Void);

    client(&mock_server)
        .fetch("/login", &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_multipart_body_gets_boundary_from_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let form = FormData::new().text("title", "notes").file(
        "attachment",
        Blob::new(&b"hello"[..]).with_mime("text/plain"),
        Some("notes.txt".to_string()),
    );
    let options = RequestOptions::new()
        .method_str("POST")
        .unwrap()
        .body(form)
        .resolve(ResolveMode::Void);

    client(&mock_server)
        .fetch("/upload", &options)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("hello"));
}

#[tokio::test]
async fn test_http_error_4xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).get("/secret").await;

    match result {
        Err(Error::NotOk {
            method,
            response,
            raw_response,
        }) => {
            assert_eq!(method, http::Method::GET);
            assert_eq!(response.status.as_u16(), 403);
            assert_eq!(raw_response, "Forbidden");
        }
        other => panic!("Expected NotOk, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_hook_is_called_once_and_error_still_returned() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .on_error(move |err| {
            assert!(err.has_status(500));
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let err = client.delete("/users/1").await.unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.method(), Some(&http::Method::DELETE));
    assert!(wirefetch::is_request_error(
        &err,
        Some(http::StatusCode::INTERNAL_SERVER_ERROR)
    ));
}

#[tokio::test]
async fn test_per_call_hook_overrides_client_hook() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client_calls = Arc::new(AtomicUsize::new(0));
    let call_calls = Arc::new(AtomicUsize::new(0));
    let (c1, c2) = (client_calls.clone(), call_calls.clone());

    let client = Client::builder()
        .base_url(mock_server.uri())
        .on_error(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let options = RequestOptions::new().on_error(move |_| {
        c2.fetch_add(1, Ordering::SeqCst);
    });
    let _ = client.fetch("/missing", &options).await;

    assert_eq!(client_calls.load(Ordering::SeqCst), 0);
    assert_eq!(call_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("invalid json", "application/json"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).get("/broken").await;

    match result {
        Err(Error::Parse {
            response, source, ..
        }) => {
            assert_eq!(response.status.as_u16(), 200);
            assert!(matches!(source, ParseError::Json(_)));
        }
        other => panic!("Expected Parse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_octet_stream_resolves_to_blob() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bin"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "application/octet-stream"),
        )
        .mount(&mock_server)
        .await;

    let resolved = client(&mock_server).get("/bin").await.unwrap();

    match resolved {
        Resolved::Blob(blob) => assert_eq!(blob.bytes.as_ref(), &[1u8, 2, 3]),
        other => panic!("Expected Blob, got {:?}", other),
    }
}

#[tokio::test]
async fn test_file_mode_uses_content_disposition() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("id\n1\n", "text/csv")
                .insert_header("content-disposition", "attachment; filename=\"export.csv\""),
        )
        .mount(&mock_server)
        .await;

    let options = RequestOptions::new().resolve(ResolveMode::File);
    let file = client(&mock_server)
        .fetch("/export", &options)
        .await
        .unwrap()
        .into_file()
        .unwrap();

    assert_eq!(file.name, "export.csv");
    assert_eq!(file.mime(), Some("text/csv"));
    assert_eq!(file.bytes().as_ref(), b"id\n1\n");
}

#[tokio::test]
async fn test_response_mode_returns_unread_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(TestData {
                    id: 5,
                    name: "x".to_string(),
                })
                .insert_header("x-custom-header", "custom-value"),
        )
        .mount(&mock_server)
        .await;

    let options = RequestOptions::new().resolve(ResolveMode::Response);
    let response = client(&mock_server)
        .fetch("/raw", &options)
        .await
        .unwrap()
        .into_response()
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.header("x-custom-header"), Some("custom-value"));
    assert!(response.text().await.unwrap().contains("\"id\":5"));
}

#[tokio::test]
async fn test_csrf_default_matcher() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/items"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .csrf(CsrfOptions::from_cookie("XSRF-TOKEN").default_matcher(true))
        .cookie_source(Arc::new(StaticCookies(
            "theme=dark; XSRF-TOKEN=abc123".to_string(),
        )))
        .build()
        .unwrap();

    let get = RequestOptions::new().resolve(ResolveMode::Void);
    client.fetch("/items", &get).await.unwrap();

    let post = RequestOptions::new()
        .method_str("post")
        .unwrap()
        .resolve(ResolveMode::Void);
    client.fetch("/items", &post).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("x-csrf-token").is_none());
    assert_eq!(requests[1].headers.get("x-csrf-token").unwrap(), "abc123");
}

#[tokio::test]
async fn test_forced_redirect_fails_with_location() {
    let mock_server = MockServer::start().await;
    let target = format!("{}/login", mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("login page"))
        .mount(&mock_server)
        .await;

    let options = RequestOptions::new()
        .method_str("POST")
        .unwrap()
        .body("form")
        .force_redirect(true);
    let err = client(&mock_server)
        .fetch("/submit", &options)
        .await
        .unwrap_err();

    assert_eq!(err.location(), Some(target.as_str()));
    assert!(matches!(err, Error::Redirected { .. }));
}

#[tokio::test]
async fn test_redirect_followed_without_force() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let resolved = client(&mock_server).get("/old").await.unwrap();
    assert_eq!(resolved.as_text(), Some("moved"));
}

#[tokio::test]
async fn test_abort_signal_cancels_request() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let signal = AbortSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let options = RequestOptions::new().signal(signal);
    let err = client(&mock_server)
        .fetch("/slow", &options)
        .await
        .unwrap_err();

    match err {
        Error::Transport { source, .. } => assert!(matches!(source, TransportError::Aborted)),
        other => panic!("Expected Transport, got {:?}", other),
    }
}

#[tokio::test]
async fn test_abort_signal_cancels_body_read() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (headers_sent, on_headers_sent) = tokio::sync::oneshot::channel();

    // Promises 100 bytes, sends 3, then stalls.
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 100\r\n\r\nabc",
            )
            .await
            .unwrap();
        let _ = headers_sent.send(());
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let signal = AbortSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        let _ = on_headers_sent.await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let client = Client::builder()
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();
    let options = RequestOptions::new().signal(signal);
    let err = tokio::time::timeout(Duration::from_secs(5), client.fetch("/stalled", &options))
        .await
        .expect("call should end once the signal fires")
        .unwrap_err();

    match err {
        Error::Parse { response, source, .. } => {
            assert_eq!(response.status, 200);
            assert!(matches!(source, ParseError::Body(TransportError::Aborted)));
        }
        other => panic!("Expected Parse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let err = client.get("/nothing").await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.response().is_none());
}
