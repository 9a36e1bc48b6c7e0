//! Adapter configuration
//!
//! Connection parameters for the provider portal plus the scheduling knobs
//! of the driver loop.

use std::time::Duration;

/// Smallest accepted day backlog.
pub const MIN_HISTORY_DAYS: u32 = 30;
/// Largest accepted day backlog.
pub const MAX_HISTORY_DAYS: u32 = 1000;
/// Day backlog used when none is configured.
pub const DEFAULT_HISTORY_DAYS: u32 = 365;

/// Complete adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Portal endpoints and credentials
    pub portal: PortalConfig,
    /// Driver loop timing
    pub schedule: ScheduleConfig,
}

/// Provider portal endpoints, credentials and protocol constants.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Account login (an email address for this provider)
    pub username: String,
    /// Account password
    pub password: String,
    /// Water counter identifier, as shown in the portal URL
    pub counter_id: String,
    /// Host serving the login form
    pub login_host: String,
    /// Host serving the daily statistics endpoint
    pub data_host: String,
    /// TCP port for both hosts
    pub port: u16,
    /// Use HTTPS; disabled only by tests talking to a local server
    pub tls: bool,
    /// Path of the login form page (GET) and credential submission (POST)
    pub login_path: String,
    /// Path prefix of the daily statistics endpoint
    pub data_path: String,
    /// Cookie whose presence proves an authenticated session
    pub marker_cookie: String,
    /// User-Agent presented to the portal
    pub user_agent: String,
    /// How many days of history to backfill, clamped to [30, 1000] when set
    /// through [`PortalConfig::set_history_days`]
    pub(crate) history_days: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            counter_id: String::new(),
            login_host: "www.toutsurmoneau.fr".to_string(),
            data_host: "www.toutsurmoneau.fr".to_string(),
            port: 443,
            tls: true,
            login_path: "/mon-compte-en-ligne/je-me-connecte".to_string(),
            data_path: "/mon-compte-en-ligne/statJData".to_string(),
            marker_cookie: "eZSESSID".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/61.0.3163.100 Safari/537.36"
                .to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

impl PortalConfig {
    /// Configured day backlog, already clamped.
    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    /// Set the day backlog, clamping to the accepted range.
    pub fn set_history_days(&mut self, days: u32) {
        self.history_days = days.clamp(MIN_HISTORY_DAYS, MAX_HISTORY_DAYS);
    }
}

/// Timing of the driver loop.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Heartbeat interval of the driver loop
    pub heartbeat: Duration,
    /// Local hour of day for the daily catch-up pass
    pub catchup_hour: u32,
    /// Deadline for a single connect or request/response step
    pub step_deadline: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(20),
            catchup_hour: 5,
            step_deadline: Duration::from_secs(30),
        }
    }
}

impl AdapterConfig {
    /// Create a configuration with credentials and the counter to read.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        counter_id: impl Into<String>,
    ) -> Self {
        let portal = PortalConfig {
            username: username.into(),
            password: password.into(),
            counter_id: counter_id.into(),
            ..PortalConfig::default()
        };
        Self {
            portal,
            schedule: ScheduleConfig::default(),
        }
    }

    /// Set the day backlog (clamped to [30, 1000]).
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.portal.set_history_days(days);
        self
    }

    /// Set the local hour of the daily catch-up pass.
    pub fn with_catchup_hour(mut self, hour: u32) -> Self {
        self.schedule.catchup_hour = hour % 24;
        self
    }

    /// Point both portal hosts at a different endpoint.
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16, tls: bool) -> Self {
        let host = host.into();
        self.portal.login_host = host.clone();
        self.portal.data_host = host;
        self.portal.port = port;
        self.portal.tls = tls;
        self
    }

    /// Set the per-step deadline.
    pub fn with_step_deadline(mut self, deadline: Duration) -> Self {
        self.schedule.step_deadline = deadline;
        self
    }

    /// Set the heartbeat interval.
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.schedule.heartbeat = heartbeat;
        self
    }
}
