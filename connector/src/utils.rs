use std::{fmt::Write, future::Future, time::Duration};

use hmac::{Hmac, Mac};
use rand::Rng;
use rust_decimal::Decimal;
use sha2::Sha256;
use tracing::warn;
use tradecore::venue::VenueError;

/// Total attempts for an operation that keeps failing transiently: the first
/// call plus two retries.
pub const MAX_ATTEMPTS: u32 = 3;

pub fn sign_hmac_sha256(secret: &str, s: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(s.as_bytes());
    let hash = mac.finalize().into_bytes();
    let mut tmp = String::with_capacity(hash.len() * 2);
    for c in hash {
        write!(&mut tmp, "{c:02x}").unwrap();
    }
    tmp
}

/// Fixed-point rendering of a decimal for venue query parameters. Trailing
/// zeros are stripped; scientific notation never appears, which the venue
/// parser would reject.
pub fn fmt_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Run `call` until it succeeds, a non-retriable error surfaces, or
/// [`MAX_ATTEMPTS`] is reached. Only [`VenueError::Transient`] is retried;
/// each retry waits `uniform(0, 0.5 * 2^attempt)` seconds and emits one
/// warning. The last transient error is returned after exhaustion.
pub async fn retry_transient<O, F, Fut>(op: &str, mut call: F) -> Result<O, VenueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<O, VenueError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retriable() && attempt < MAX_ATTEMPTS => {
                warn!(
                    op,
                    error = %error,
                    "transient venue error, retrying (attempt {attempt}/{MAX_ATTEMPTS})"
                );
                let cap = 0.5 * f64::from(1u32 << attempt);
                let delay = rand::rng().random_range(0.0..cap);
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }
            Err(error) => return Err(error),
        }
    }
}
