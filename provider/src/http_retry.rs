use std::time::Duration;

use crate::error::ProviderError;

/// Bounded retry count for transient 429/5xx failures, mirroring the
/// teacher's `stream_responses` retry loop. This is lower-level
/// transient-HTTP-failure retry, not application-level turn retry (the
/// agentic loop never retries a turn once it is considered to have run).
const MAX_RETRIES: u32 = 4;

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(250u64.saturating_mul(1u64 << attempt.min(5)))
}

fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Sends a request, retrying transient failures (429 honoring `Retry-After`,
/// 5xx with exponential backoff) up to `MAX_RETRIES` times. `build_request`
/// is called fresh on every attempt since a sent `reqwest::Request` body
/// cannot always be cheaply replayed.
pub(crate) async fn send_with_retry<F>(
    provider_name: &str,
    mut build_request: F,
) -> Result<reqwest::Response, ProviderError>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        let response = build_request().send().await.map_err(|source| ProviderError::Http {
            provider: provider_name.to_string(),
            source,
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let retryable = status.as_u16() == 429 || status.is_server_error();
        let retry_after = parse_retry_after(&response);

        if !retryable || attempt >= MAX_RETRIES {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited {
                    provider: provider_name.to_string(),
                    retry_after_secs: retry_after,
                });
            }
            return Err(ProviderError::Upstream {
                provider: provider_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let delay = retry_after
            .map(Duration::from_secs)
            .unwrap_or_else(|| backoff_delay(attempt));
        tracing::debug!(
            provider = provider_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            status = status.as_u16(),
            "retrying after transient provider failure"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_is_bounded() {
        let d0 = backoff_delay(0);
        let d1 = backoff_delay(1);
        let d5 = backoff_delay(5);
        let d9 = backoff_delay(9);
        assert!(d1 > d0);
        assert_eq!(d5, d9, "delay should cap once attempt exceeds the shift bound");
    }
}
