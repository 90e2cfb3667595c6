//! Tests for the cancellation-aware retry guard.

use folio_core::Stage;
use folio_error::{ProviderError, ProviderErrorKind, ProviderResult};
use folio_retry::{RetryConfig, StageGuard, TimeoutConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast_guard(max_retries: u32) -> StageGuard {
    StageGuard::new(
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_base_delay_ms(1)
            .with_max_delay_ms(4)
            .with_jitter(false),
        TimeoutConfig::default()
            .with_beat_ms(50)
            .with_persona_ms(50)
            .with_image_ms(50),
    )
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let guard = fast_guard(3);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();

    let result: ProviderResult<&str> = guard
        .run(Stage::Beat, 1, &token, |_| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::new(ProviderErrorKind::from_status(503, "busy")))
                } else {
                    Ok("beat")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "beat");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let guard = fast_guard(2);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();

    let result: ProviderResult<()> = guard
        .run(Stage::Image, 1, &token, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::new(ProviderErrorKind::Offline("no route".into())))
            }
        })
        .await;

    assert!(matches!(result.unwrap_err().kind, ProviderErrorKind::Offline(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_credential_errors_are_not_retried() {
    let guard = fast_guard(3);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();

    let result: ProviderResult<()> = guard
        .run(Stage::Beat, 2, &token, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::new(ProviderErrorKind::from_status(401, "expired")))
            }
        })
        .await;

    assert!(result.unwrap_err().kind.is_fatal());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_token_skips_the_call() {
    let guard = fast_guard(3);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();
    token.cancel();

    let result: ProviderResult<()> = guard
        .run(Stage::Persona, 3, &token, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

    assert!(result.unwrap_err().kind.is_cancellation());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_call() {
    let guard = StageGuard::new(RetryConfig::default(), TimeoutConfig::default());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result: ProviderResult<()> = guard
        .run(Stage::Image, 4, &token, |_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

    assert!(result.unwrap_err().kind.is_cancellation());
}

#[tokio::test]
async fn test_stage_deadline_produces_timeout() {
    let guard = fast_guard(1);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();

    let result: ProviderResult<()> = guard
        .run(Stage::Beat, 5, &token, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        })
        .await;

    assert!(matches!(result.unwrap_err().kind, ProviderErrorKind::Timeout(_)));
    // Timeouts are transient, so the single retry runs too
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_provider_sees_stage_token() {
    let guard = fast_guard(0);
    let token = CancellationToken::new();

    let result: ProviderResult<bool> = guard
        .run(Stage::Beat, 6, &token, |cancel| async move { Ok(cancel.is_cancelled()) })
        .await;

    assert!(!result.unwrap());
}

#[tokio::test]
async fn test_error_kind_caps_retries_below_config() {
    let guard = fast_guard(10);
    let calls = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();

    let result: ProviderResult<()> = guard
        .run(Stage::Beat, 2, &token, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::new(ProviderErrorKind::MalformedResponse(
                    "no braces".into(),
                )))
            }
        })
        .await;

    assert!(result.unwrap_err().kind.is_malformed());
    // Malformed responses allow two retries whatever the configured budget
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
