pub mod builders;
pub mod monitor;
pub mod scripted;
pub mod timeline;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{as_jobs, scheduler};
pub use monitor::{MonitorCall, RecordingMonitor};
pub use scripted::{Script, ScriptedJob};
pub use timeline::Timeline;

static INIT: Once = Once::new();

/// Default deadline for a whole scheduling run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and shown only for failing tests
/// (or with `-- --nocapture`). The filter is read from `RUST_LOG`, e.g.
/// `RUST_LOG=parajob=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,parajob=info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
///
/// A hung scheduler shows up as a timeout instead of a stuck test binary.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
