use std::time::Duration;

use jsonwebtoken::get_current_timestamp;
use serde_json::{json, Value};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{
    issue_token, mail_body, spawn_app, spawn_app_with, valid_token, SENDER, SENDGRID_API_KEY,
};

#[tokio::test]
async fn sendmail_without_token_is_rejected() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(None, &mail_body()).await;

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "No token sent" }));
}

#[tokio::test]
async fn sendmail_with_bare_scheme_counts_as_no_token() {
    let app = spawn_app().await;

    let response = app
        .post_sendmail_raw("Bearer", "application/json", "{}")
        .await;

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No token sent");
}

#[tokio::test]
async fn sendmail_with_garbage_token_is_rejected() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(Some("garbage"), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Invalid Token" }));
}

#[tokio::test]
async fn sendmail_with_expired_token_is_rejected() {
    let app = spawn_app().await;
    let token = issue_token(&json!({ "sub": "user-1", "exp": get_current_timestamp() - 60 }));

    let response = app.post_sendmail(Some(&token), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid Token");
}

#[tokio::test]
async fn sendmail_forwards_envelope_to_sendgrid() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("Authorization", format!("Bearer {SENDGRID_API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(Some(&valid_token()), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "message": "Email sent" }));

    let received = app.email_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        sent,
        json!({
            "personalizations": [{ "to": [{ "email": "a@b.com" }] }],
            "from": { "email": SENDER },
            "subject": "Hi",
            "content": [{ "type": "text/plain", "value": "Hello" }]
        })
    );
}

#[tokio::test]
async fn sendmail_token_without_exp_is_accepted() {
    let app = spawn_app().await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let token = issue_token(&json!({ "id": 99, "role": "service" }));
    let response = app.post_sendmail(Some(&token), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn sendmail_provider_rejection_is_500() {
    let app = spawn_app().await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "errors": [{ "message": "bad recipient" }] })),
        )
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(Some(&valid_token()), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Error sending email" }));
}

#[tokio::test]
async fn sendmail_provider_timeout_is_500() {
    let app = spawn_app_with(|config| config.sendgrid_timeout = Duration::from_millis(200)).await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(3)))
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(Some(&valid_token()), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Error sending email");
}

#[tokio::test]
async fn sendmail_passes_missing_fields_through() {
    let app = spawn_app().await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_sendmail(Some(&valid_token()), &json!({ "mailSubject": "Hi" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let received = app.email_server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["personalizations"], json!([{ "to": [] }]));
    assert_eq!(sent["subject"], "Hi");
    assert!(sent.get("content").is_none());
}

#[tokio::test]
async fn sendmail_malformed_json_is_400() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let authorization = format!("Bearer {}", valid_token());
    let response = app
        .api_client
        .post(format!("{}/sendmail", app.address))
        .header("Authorization", authorization)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute Request");

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Invalid request body" }));
}

#[tokio::test]
async fn strict_validation_rejects_bad_recipient_without_calling_provider() {
    let app = spawn_app_with(|config| config.strict_validation = true).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let body = json!({
        "mailRecipient": "not-an-address",
        "mailSubject": "Hi",
        "mailText": "Hello"
    });
    let response = app.post_sendmail(Some(&valid_token()), &body).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Invalid mail request" }));
}

#[tokio::test]
async fn strict_validation_allows_complete_request() {
    let app = spawn_app_with(|config| config.strict_validation = true).await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_sendmail(Some(&valid_token()), &mail_body()).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn sendmail_oversized_json_is_413() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let body = json!({ "mailRecipient": "a@b.com", "mailText": "x".repeat(120 * 1024) });
    let response = app.post_sendmail(Some(&valid_token()), &body).await;

    assert_eq!(response.status().as_u16(), 413);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Request body too large" }));
}

#[tokio::test]
async fn sendmail_non_json_body_counts_as_empty_request() {
    let app = spawn_app().await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let authorization = format!("Bearer {}", valid_token());
    let response = app
        .post_sendmail_raw(&authorization, "text/plain", "mailRecipient=a@b.com")
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let received = app.email_server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        sent,
        json!({
            "personalizations": [{ "to": [] }],
            "from": { "email": SENDER }
        })
    );
}

#[tokio::test]
async fn sendmail_checks_token_before_parsing_body() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(format!("{}/sendmail", app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute Request");

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No token sent");
}

#[tokio::test]
async fn sendmail_forwards_numeric_recipient_as_text() {
    let app = spawn_app().await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let body = json!({ "mailRecipient": 123, "mailSubject": "Hi", "mailText": "Hello" });
    let response = app.post_sendmail(Some(&valid_token()), &body).await;

    assert_eq!(response.status().as_u16(), 500);
    let received = app.email_server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["personalizations"], json!([{ "to": [{ "email": "123" }] }]));
}
