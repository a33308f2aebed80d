use manifest_validator_client::{Error, StaticToken, TokenSource, ValidationClient};
use manifest_validator_core::{RequestObject, State, ValidationApi};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn submit_sends_credentials_and_content() {
    let (endpoint, server) =
        serve_once(200, r#"{"name":"operations/op-1","done":false}"#).await;
    let client =
        ValidationClient::new(endpoint, "my-project", StaticToken::new("s3cr3t"), TIMEOUT).unwrap();

    let req = RequestObject::from_manifest("web", "kind: Service\n").unwrap();
    let operation = client.submit(req.content()).await.unwrap();
    assert_eq!(operation.name, "operations/op-1");
    assert_eq!(operation.state(), State::Pending);

    let request = server.await.unwrap();
    let head = request.to_lowercase();
    assert!(head.starts_with("post /v1:validateresources http/1.1\r\n"));
    assert!(head.contains("\r\nauthorization: bearer s3cr3t\r\n"));
    assert!(head.contains("\r\nx-goog-user-project: my-project\r\n"));
    assert!(request.contains(&format!(
        r#"{{"resources":{{"contentType":"1","data":"{}"}}}}"#,
        req.content().data
    )));
}

#[tokio::test]
async fn get_operation() {
    let (endpoint, server) = serve_once(
        200,
        r#"{"name":"operations/op-1","done":true,"response":{"violations":[{"policyName":"no-root","message":"runs as root"}]}}"#,
    )
    .await;
    let client = ValidationClient::new(
        format!("{endpoint}/"),
        "my-project",
        StaticToken::new("s3cr3t"),
        TIMEOUT,
    )
    .unwrap();

    let operation = client.get_operation("operations/op-1").await.unwrap();
    assert_eq!(operation.state(), State::Succeeded);
    let violations = client.extract_violations(&operation).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy_name, "no-root");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /v1/operations/op-1 HTTP/1.1\r\n"));
}

#[tokio::test]
async fn unsuccessful_status_is_an_error() {
    let (endpoint, server) = serve_once(503, r#"{"error":"unavailable"}"#).await;
    let client =
        ValidationClient::new(endpoint, "my-project", StaticToken::new("s3cr3t"), TIMEOUT).unwrap();

    let error = client.operation("operations/op-1").await.unwrap_err();
    match error {
        Error::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, r#"{"error":"unavailable"}"#);
        }
        error => panic!("unexpected error: {error}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn credential_failure_fails_the_call() {
    struct NoCredentials;

    #[async_trait::async_trait]
    impl TokenSource for NoCredentials {
        async fn token(&self) -> anyhow::Result<String> {
            anyhow::bail!("not logged in")
        }
    }

    // Nothing listens here; the call must fail before connecting.
    let client =
        ValidationClient::new("http://127.0.0.1:9", "my-project", NoCredentials, TIMEOUT).unwrap();
    let error = client.operation("operations/op-1").await.unwrap_err();
    assert!(matches!(error, Error::Credentials(_)), "{error}");
    assert_eq!(
        error.to_string(),
        "failed to obtain an access token: not logged in"
    );
}

/// Accepts a single connection, answers it with the given response, and
/// returns the raw request that was received.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let rsp = format!(
            "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(rsp.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    });
    (format!("http://{addr}"), task)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|len| len.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        if buf.len() >= end + 4 + content_length {
            break;
        }
    }
    String::from_utf8(buf).unwrap()
}
