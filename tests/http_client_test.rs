//! HttpSearchClient against a stub HTTP server

use anyhow::Result;
use storefront_search::{ClientError, HttpSearchClient, QuerySignature, SearchApi, SearchRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request with `status` and `body`. Resolves to the
/// request line that was received.
async fn serve_once(status: &'static str, body: &'static str) -> Result<(String, JoinHandle<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}/api", listener.local_addr()?);

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buffer = [0u8; 1024];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buffer).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buffer[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        let request = String::from_utf8_lossy(&received).to_string();
        request.lines().next().unwrap_or_default().to_string()
    });

    Ok((base_url, server))
}

#[tokio::test]
async fn test_search_decodes_results() -> Result<()> {
    let body = r#"{"success":true,"products":[{"_id":"p1","name":"Charger","price":19.5}],"pagination":{"currentPage":1,"totalPages":2,"totalProducts":42,"hasNext":true,"hasPrev":false},"query":"char","filters":{}}"#;
    let (base_url, server) = serve_once("200 OK", body).await?;
    let client = HttpSearchClient::new(&base_url)?;

    let mut signature = QuerySignature::for_term("char");
    signature.category = Some("power".into());
    let response = client.search(SearchRequest::main(signature, 12)).await?;

    assert_eq!(response.products.len(), 1);
    assert_eq!(response.products[0].name, "Charger");
    assert_eq!(response.pagination.total_products, 42);
    assert_eq!(
        server.await?,
        "GET /api/search?q=char&page=1&limit=12&category=power HTTP/1.1"
    );
    Ok(())
}

#[tokio::test]
async fn test_suggest_decodes_suggestions() -> Result<()> {
    let body = r#"{"success":true,"suggestions":[{"_id":"s1","name":"chair"},{"_id":"s2","name":"charger"}]}"#;
    let (base_url, server) = serve_once("200 OK", body).await?;
    let client = HttpSearchClient::new(&base_url)?;

    let suggestions = client.suggest("ch".into()).await?;
    let names: Vec<_> = suggestions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["chair", "charger"]);
    assert_eq!(server.await?, "GET /api/search/suggest?q=ch HTTP/1.1");
    Ok(())
}

#[tokio::test]
async fn test_server_error_maps_to_status() -> Result<()> {
    let (base_url, server) = serve_once("503 Service Unavailable", "{}").await?;
    let client = HttpSearchClient::new(&base_url)?;

    let result = client.search(SearchRequest::main(QuerySignature::for_term("x"), 12)).await;
    assert!(matches!(result, Err(ClientError::Status { status: 503 })));
    server.await?;
    Ok(())
}

#[tokio::test]
async fn test_unsuccessful_body_is_rejected() -> Result<()> {
    let body = r#"{"success":false,"message":"query too long"}"#;
    let (base_url, server) = serve_once("200 OK", body).await?;
    let client = HttpSearchClient::new(&base_url)?;

    let result = client.search(SearchRequest::main(QuerySignature::for_term("x"), 12)).await;
    match result {
        Err(ClientError::Rejected { message }) => assert_eq!(message, "query too long"),
        other => panic!("expected rejection, got {:?}", other),
    }
    server.await?;
    Ok(())
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() -> Result<()> {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);

    let client = HttpSearchClient::new(&format!("http://{}/api/", address))?;
    let result = client.suggest("ch".into()).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));
    Ok(())
}
