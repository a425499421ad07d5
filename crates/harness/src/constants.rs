//! Timeouts and intervals shared by fixtures and tests.

use std::time::Duration;

pub const TIMEOUT_1MIN: Duration = Duration::from_secs(60);
pub const TIMEOUT_3MIN: Duration = Duration::from_secs(180);
pub const TIMEOUT_5MIN: Duration = Duration::from_secs(300);
pub const TIMEOUT_10MIN: Duration = Duration::from_secs(600);

/// Default sampling interval for phase and status polling.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Initial delay between recovery checks; doubles up to [`RECOVERY_BACKOFF_CAP`].
pub const RECOVERY_BACKOFF_INITIAL: Duration = Duration::from_secs(2);
pub const RECOVERY_BACKOFF_CAP: Duration = Duration::from_secs(30);
