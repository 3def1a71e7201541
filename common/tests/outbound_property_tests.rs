// Tests for the outbound HTTP boundaries: the newsletter publish
// side-effect and the alert email transport.

use common::models::ContentKind;
use common::notify::{HttpMailer, Mailer};
use common::scheduler::{NewsletterWebhook, PublishListener, PublishedItem};
use proptest::prelude::*;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn published_item(title: &str, slug: &str) -> PublishedItem {
    PublishedItem {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: slug.to_string(),
        kind: ContentKind::Post,
    }
}

// The webhook payload always carries the identifying fields, whatever the
// content looks like.
#[test]
fn property_published_item_payload_shape() {
    proptest!(|(title in ".{0,64}", slug in "[a-z0-9-]{1,40}")| {
        let item = published_item(&title, &slug);
        let value = serde_json::to_value(&item).unwrap();

        prop_assert_eq!(value["title"].as_str(), Some(title.as_str()));
        prop_assert_eq!(value["slug"].as_str(), Some(slug.as_str()));
        prop_assert_eq!(value["kind"].as_str(), Some("post"));
        prop_assert!(value["id"].is_string());
    });
}

#[tokio::test]
async fn test_newsletter_webhook_posts_published_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/published"))
        .and(body_partial_json(serde_json::json!({"slug": "spring-lineup"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let listener = NewsletterWebhook::new(Some(format!("{}/hooks/published", server.uri())));
    let result = listener
        .notify_published(&published_item("Spring lineup", "spring-lineup"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_newsletter_webhook_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let listener = NewsletterWebhook::new(Some(server.uri()));
    let result = listener
        .notify_published(&published_item("Spring lineup", "spring-lineup"))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_newsletter_webhook_without_url_is_noop() {
    let listener = NewsletterWebhook::new(None);
    let result = listener
        .notify_published(&published_item("Spring lineup", "spring-lineup"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_mailer_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/send"))
        .and(body_partial_json(serde_json::json!({
            "to": "admin@example.com",
            "subject": "Scheduled publishing is falling behind",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = HttpMailer::new(
        Some(format!("{}/api/send", server.uri())),
        "alerts@pressroom.local".to_string(),
    );
    assert!(mailer.enabled());

    let result = mailer
        .send(
            "admin@example.com",
            "Scheduled publishing is falling behind",
            "2 scheduled item(s) are overdue",
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_mailer_surfaces_delivery_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mailer = HttpMailer::new(Some(server.uri()), "alerts@pressroom.local".to_string());
    let result = mailer.send("admin@example.com", "subject", "body").await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unconfigured_mailer_is_disabled() {
    let mailer = HttpMailer::new(None, "alerts@pressroom.local".to_string());
    assert!(!mailer.enabled());
    // Send degrades to a logged no-op rather than an error.
    assert!(mailer.send("admin@example.com", "s", "b").await.is_ok());
}
