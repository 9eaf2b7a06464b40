/// Default location of the balancer's configuration file.
pub(super) const DEFAULT_CONFIG_PATH: &str = "/etc/storage-balancer/storage-balancer.cfg";

/// Default pause between balancing passes in daemon mode (5 minutes).
pub(super) const DEFAULT_ITERATION_SLEEP_SECS: u64 = 300;

/// Delay before the first lock check after a move is issued.
pub(super) const DEFAULT_UNLOCK_INITIAL_DELAY_SECS: u64 = 10;

/// Interval between lock checks while a disk is being moved.
pub(super) const DEFAULT_UNLOCK_POLL_INTERVAL_SECS: u64 = 30;

/// Give up waiting for a moved disk to unlock after 2 hours.
pub(super) const DEFAULT_UNLOCK_TIMEOUT_SECS: u64 = 7200;

/// Upper bound accepted for UNLOCK_TIMEOUT (one week).
pub(super) const MAX_UNLOCK_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Default port of the read-only status endpoint (localhost only).
pub(super) const DEFAULT_STATUS_PORT: u16 = 7093;

/// Per-request timeout against the management API.
pub(super) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
