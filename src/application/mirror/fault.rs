use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::application::errors::MirrorSyncError;

static EXIT_STATUS_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"exit status \d+ - ").expect("Invalid exit status regex"));

/// Drop the `exit status N - ` prefixes git errors carry
pub fn strip_exit_status(message: &str) -> String {
    EXIT_STATUS_NOISE.replace_all(message, "").into_owned()
}

/// Run one sync body, turning a panic into a `Panicked` error for that sync
/// only.
pub async fn run_guarded<F, T>(body: F) -> Result<T, MirrorSyncError>
where
    F: Future<Output = Result<T, MirrorSyncError>>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(MirrorSyncError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
