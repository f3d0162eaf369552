
use std::sync::atomic::{AtomicUsize, Ordering};

use portfolio_contact_guard::{
    entities::{contact::NotificationKind, rate_limit::LimiterType},
    errors::{ContactError, EmailError},
    repositories::store::KeyValueStore,
    use_cases::contact::ContactSettings,
    utils::clock::Clock,
};
use test_utils::*;

fn failing_mailer(times: usize) -> MockMailer {
    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .times(times)
        .returning(|_| Err(EmailError::Request("connection reset".into())));
    mailer
}

#[tokio::test]
async fn valid_submission_is_dispatched_once() {
    assert_eq!(MESSAGE.chars().count(), 50);

    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .withf(|params| {
            params.from_name == "Jane Doe"
                && params.from_email == "jane@example.com"
                && params.reply_to == "jane@example.com"
                && params.subject == "Project inquiry"
                && params.message == MESSAGE
                && params.to_email == OWNER_EMAIL
        })
        .times(1)
        .returning(|_| Ok(()));

    let ctx = TestContext::new(mailer);
    let (token, rendered_at) = ctx.render().await;
    ctx.clock.advance(5_000);

    let outcome = ctx
        .handler
        .submit(CLIENT_IP, SESSION, valid_form(rendered_at, &token))
        .await
        .expect("submission should be accepted");

    assert_eq!(outcome.notification.kind, NotificationKind::Success);
    assert_eq!(outcome.notification.title, "Message Sent!");
    assert_eq!(outcome.notification.duration, 5_000);
    assert_ne!(outcome.csrf_token, token);

    let limit = ctx
        .handler
        .rate_limiter
        .check(CLIENT_IP, LimiterType::ContactForm)
        .await
        .unwrap();
    assert!(limit.allowed);
    assert_eq!(limit.remaining, 5);
}

#[tokio::test]
async fn filled_honeypot_is_rejected_silently() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;
    let mut form = ctx.aged_form(&token);
    form.honeypot = "http://spam.example".into();

    let err = ctx.handler.submit(CLIENT_IP, SESSION, form).await.unwrap_err();
    assert!(matches!(err, ContactError::SubmissionRejected));
    assert_eq!(err.to_string(), "Unable to send your message. Please try again later.");

    // Stop points before dispatch leave the token unconsumed.
    assert!(ctx.handler.csrf_manager.is_token_valid(SESSION, &token).await.unwrap());
}

#[tokio::test]
async fn form_submitted_half_a_second_after_render_is_rejected() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let (token, rendered_at) = ctx.render().await;
    ctx.clock.advance(500);

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, valid_form(rendered_at, &token))
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::SubmissionRejected));
}

#[tokio::test]
async fn spam_content_is_rejected() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;
    let mut form = ctx.aged_form(&token);
    form.message = "Click here to claim your free money today".into();

    let err = ctx.handler.submit(CLIENT_IP, SESSION, form).await.unwrap_err();
    assert!(matches!(err, ContactError::SubmissionRejected));
}

#[tokio::test]
async fn repeated_transport_failures_block_the_client() {
    let ctx = TestContext::new(failing_mailer(5));
    let (token, _) = ctx.render().await;

    for _ in 0..5 {
        let err = ctx
            .handler
            .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::Transport(_)));
        ctx.clock.advance(1_000);
    }

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .unwrap_err();

    match err {
        ContactError::RateLimited { message, reset_time, blocked } => {
            assert!(blocked);
            assert!(reset_time > ctx.clock.now_ms());
            assert!(message.contains("minute"));
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn block_lifts_after_its_duration() {
    let calls = AtomicUsize::new(0);
    let mut mailer = MockMailer::new();
    mailer.expect_send().times(6).returning(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) < 5 {
            Err(EmailError::Rejected { status: 500, body: "upstream down".into() })
        } else {
            Ok(())
        }
    });

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;
    for _ in 0..5 {
        let _ = ctx.handler.submit(CLIENT_IP, SESSION, ctx.aged_form(&token)).await;
    }

    ctx.clock.advance(60 * 60_000 + 1);

    let outcome = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn transport_failure_counts_against_the_limit() {
    let ctx = TestContext::new(failing_mailer(1));
    let (token, _) = ctx.render().await;

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to send your message. Please try again or contact me directly via email."
    );

    let limit = ctx
        .handler
        .rate_limiter
        .check(CLIENT_IP, LimiterType::ContactForm)
        .await
        .unwrap();
    assert_eq!(limit.remaining, 4);

    // Consumed even though delivery failed.
    assert!(!ctx.handler.csrf_manager.is_token_valid(SESSION, &token).await.unwrap());
}

#[tokio::test]
async fn field_errors_are_reported_in_form_order() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;
    let mut form = ctx.aged_form(&token);
    form.message = "too short".into();
    form.email = "jane @example.com".into();
    form.name = "J".into();

    let err = ctx.handler.submit(CLIENT_IP, SESSION, form).await.unwrap_err();
    let ContactError::ValidationError(details) = err else {
        panic!("expected validation error");
    };

    let fields: Vec<&str> = details.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "email", "message"]);
    assert_eq!(details[1].message, "Email cannot contain spaces");

    let limit = ctx
        .handler
        .rate_limiter
        .check(CLIENT_IP, LimiterType::ContactForm)
        .await
        .unwrap();
    assert_eq!(limit.remaining, 5);
}

#[tokio::test]
async fn replayed_token_is_refused_without_auto_refresh() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().times(1).returning(|_| Ok(()));

    let ctx = TestContext::with_settings(mailer, ContactSettings::new(OWNER_EMAIL, false));
    let (token, _) = ctx.render().await;

    ctx.handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .expect("first use should succeed");

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::InvalidCsrfToken));
}

#[tokio::test]
async fn unknown_token_is_refused_without_auto_refresh() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::with_settings(mailer, ContactSettings::new(OWNER_EMAIL, false));
    ctx.render().await;

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form("not-a-token"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::InvalidCsrfToken));
}

#[tokio::test]
async fn stale_token_is_replaced_when_auto_refresh_is_on() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().times(2).returning(|_| Ok(()));

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;

    ctx.handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .expect("first use should succeed");

    // The client resubmits with the consumed token.
    let outcome = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn tokens_do_not_cross_sessions() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::with_settings(mailer, ContactSettings::new(OWNER_EMAIL, false));
    let (token, _) = ctx.render().await;

    let err = ctx
        .handler
        .submit(CLIENT_IP, "another-session", ctx.aged_form(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::InvalidCsrfToken));
}

#[tokio::test]
async fn elapsed_guard_applies_after_token_check() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let mut settings = ContactSettings::new(OWNER_EMAIL, true);
    settings.min_elapsed_ms = 10_000;

    let ctx = TestContext::with_settings(mailer, settings);
    let (token, _) = ctx.render().await;

    let err = ctx
        .handler
        .submit(CLIENT_IP, SESSION, ctx.aged_form(&token))
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::SubmittedTooQuickly));
    assert!(ctx.handler.csrf_manager.is_token_valid(SESSION, &token).await.unwrap());
}

#[tokio::test]
async fn rate_limit_is_checked_before_anything_else() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    for _ in 0..5 {
        ctx.handler
            .rate_limiter
            .record_attempt(CLIENT_IP, LimiterType::ContactForm, false)
            .await
            .unwrap();
    }

    let mut form = ctx.aged_form("");
    form.honeypot = "bot".into();

    let err = ctx.handler.submit(CLIENT_IP, SESSION, form).await.unwrap_err();
    assert!(matches!(err, ContactError::RateLimited { blocked: true, .. }));

    // Other clients are unaffected.
    let mut form = ctx.aged_form("");
    form.honeypot = "bot".into();
    let err = ctx.handler.submit("198.51.100.1", SESSION, form).await.unwrap_err();
    assert!(matches!(err, ContactError::SubmissionRejected));
}

#[tokio::test]
async fn out_of_range_render_time_is_rejected_as_automated() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let (token, _) = ctx.render().await;

    for timestamp in [i64::MIN, i64::MAX, ctx.clock.now_ms() + 60_000] {
        let err = ctx
            .handler
            .submit(CLIENT_IP, SESSION, valid_form(timestamp, &token))
            .await
            .unwrap_err();
        assert!(matches!(err, ContactError::SubmissionRejected));
    }

    assert!(ctx.handler.csrf_manager.is_token_valid(SESSION, &token).await.unwrap());
}

#[tokio::test]
async fn form_renders_are_throttled_per_client() {
    let mut mailer = MockMailer::new();
    mailer.expect_send().never();

    let ctx = TestContext::new(mailer);
    let budget = LimiterType::Api.config().max_attempts;
    for n in 0..budget {
        ctx.handler
            .render_token(CLIENT_IP, &format!("session-{n}"))
            .await
            .expect("render within budget");
    }

    let err = ctx
        .handler
        .render_token(CLIENT_IP, "one-too-many")
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::RateLimited { .. }));
    assert!(ctx.store.get("csrf_tokens:one-too-many").await.unwrap().is_none());

    // Another client still renders.
    assert!(ctx.handler.render_token("198.51.100.1", "fresh").await.is_ok());
}
