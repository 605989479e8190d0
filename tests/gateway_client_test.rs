use pixo_backend::gateway::{
    CreateGatewayOrder, GatewayError, PaymentGateway, RazorpayClient, RazorpayConfig,
};

fn client_for(server: &mockito::ServerGuard) -> RazorpayClient {
    RazorpayClient::new(RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: "rzp_test_secret".to_string(),
        base_url: server.url(),
        timeout_secs: 5,
    })
    .expect("client init should succeed")
}

fn order_request() -> CreateGatewayOrder {
    CreateGatewayOrder {
        amount: 998,
        currency: "INR".to_string(),
        receipt: "order_local_1".to_string(),
    }
}

#[tokio::test]
async fn create_order_round_trips_the_gateway_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/orders")
        .match_header("authorization", mockito::Matcher::Regex("^Basic ".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"order_Gw123","entity":"order","amount":998,"currency":"INR","receipt":"order_local_1","status":"created"}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let order = client
        .create_order(order_request())
        .await
        .expect("creation should succeed");

    assert_eq!(order.gateway_order_id, "order_Gw123");
    assert_eq!(order.amount, 998);
    assert_eq!(order.currency, "INR");
    mock.assert_async().await;
}

#[tokio::test]
async fn gateway_rejection_is_surfaced_with_its_code() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/orders")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The amount exceeds the maximum allowed"}}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_order(order_request()).await.unwrap_err();

    match err {
        GatewayError::RejectedError {
            ref gateway_code, ..
        } => {
            assert_eq!(gateway_code.as_deref(), Some("BAD_REQUEST_ERROR"));
        }
        other => panic!("expected RejectedError, got {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn gateway_server_errors_are_retryable() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/orders")
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_order(order_request()).await.unwrap_err();

    assert!(matches!(err, GatewayError::UnavailableError { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_success_body_is_not_trusted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/orders")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_order(order_request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::UnavailableError { .. }));
}
