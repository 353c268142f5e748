//! Configuration for the monitor and the admin client.

use std::path::PathBuf;
use std::time::Duration;

/// Default socket of the configuration service.
pub const DEFAULT_CONFIG_SOCKET: &str = "/run/clustermon/cib.sock";

/// Default socket of the controller.
pub const DEFAULT_CONTROLLER_SOCKET: &str = "/run/clustermon/controller.sock";

/// Default admin reply timeout.
pub const DEFAULT_ADMIN_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default number of connection failures the monitor tolerates.
pub const DEFAULT_MAX_CONNECT_FAILURES: u32 = 30;

/// Where the cluster services listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Configuration service socket.
    pub config_service: PathBuf,
    /// Controller socket.
    pub controller: PathBuf,
}

impl Endpoints {
    /// Sets the configuration service socket.
    pub fn with_config_service(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_service = path.into();
        self
    }

    /// Sets the controller socket.
    pub fn with_controller(mut self, path: impl Into<PathBuf>) -> Self {
        self.controller = path.into();
        self
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            config_service: PathBuf::from(DEFAULT_CONFIG_SOCKET),
            controller: PathBuf::from(DEFAULT_CONTROLLER_SOCKET),
        }
    }
}

/// Sign-on retry policy.
///
/// Every attempt, the first included, is preceded by `delay`, so a service
/// that is still starting gets a moment before the first sign-on.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Pause before each attempt.
    pub delay: Duration,
}

impl RetryConfig {
    /// Creates a configuration retrying at a constant interval.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Creates a configuration with a single immediate attempt.
    pub fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Returns the pause before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt < self.max_attempts {
            self.delay
        } else {
            Duration::ZERO
        }
    }

    /// Returns true if another attempt is allowed after `attempt` (0-indexed).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

/// Configuration of the replica monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Identity used when signing on.
    pub identity: String,
    /// Log every received patchset.
    pub log_diffs: bool,
    /// Log the raw update payload.
    pub log_updates: bool,
    /// Connection retry policy.
    pub connect_retry: RetryConfig,
}

impl MonitorConfig {
    /// Creates a configuration with the given identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            log_diffs: false,
            log_updates: false,
            connect_retry: RetryConfig::fixed(
                DEFAULT_MAX_CONNECT_FAILURES + 1,
                Duration::from_secs(1),
            ),
        }
    }

    /// Enables or disables patchset logging.
    pub fn with_log_diffs(mut self, enabled: bool) -> Self {
        self.log_diffs = enabled;
        self
    }

    /// Enables or disables raw update logging.
    pub fn with_log_updates(mut self, enabled: bool) -> Self {
        self.log_updates = enabled;
        self
    }

    /// Sets how many failed connection attempts are tolerated before giving up.
    pub fn with_max_connect_failures(mut self, failures: u32) -> Self {
        self.connect_retry.max_attempts = failures.saturating_add(1);
        self
    }

    /// Sets the connection retry policy.
    pub fn with_connect_retry(mut self, retry: RetryConfig) -> Self {
        self.connect_retry = retry;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new("clustermon")
    }
}

/// Configuration of the admin client.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    /// System name used as request originator.
    pub identity: String,
    /// Inactivity timeout while waiting for replies.
    pub timeout: Duration,
    /// Connection retry policy.
    pub connect_retry: RetryConfig,
}

impl AdminConfig {
    /// Creates a configuration with the given identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            timeout: DEFAULT_ADMIN_TIMEOUT,
            connect_retry: RetryConfig::no_retry(),
        }
    }

    /// Sets the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the reply timeout from a user-supplied millisecond count.
    ///
    /// Values below one millisecond select the default.
    pub fn with_timeout_ms(mut self, millis: i64) -> Self {
        self.timeout = match u64::try_from(millis) {
            Ok(ms) if ms >= 1 => Duration::from_millis(ms),
            _ => DEFAULT_ADMIN_TIMEOUT,
        };
        self
    }

    /// Sets the connection retry policy.
    pub fn with_connect_retry(mut self, retry: RetryConfig) -> Self {
        self.connect_retry = retry;
        self
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self::new("clusteradm")
    }
}
