//! Portal fetch state machine
//!
//! One pass over the portal walks a fixed protocol: connect to the login
//! host, fetch the login page for its anti-forgery token, submit the
//! credentials, verify the session cookie, then fetch one month of daily
//! readings at a time until the day budget is spent. The machine is purely
//! synchronous: every external stimulus arrives as a [`PortalEvent`] and
//! every side effect leaves as a [`PortalAction`] for the driver to execute.

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::config::PortalConfig;
use crate::suez::cookies::CookieJar;
use crate::suez::http::{HttpRequest, HttpResponse, PortalHost, RequestBuilder};
use crate::suez::records::{self, ConsumptionRecord};
use crate::suez::window::RetrievalWindow;

/// Protocol position of the fetch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStep {
    /// No pass in progress
    Idle,
    /// Waiting for the login host connection
    Connecting,
    /// Connected, waiting for the login page
    TokenConnected,
    /// Credentials submitted, waiting for the session cookie
    LogConnected,
    /// Authenticated, waiting for the data host connection
    DataConnecting,
    /// Waiting for one month of daily readings
    GettingDataDays,
}

/// External stimuli consumed by the machine.
#[derive(Debug)]
pub enum PortalEvent {
    /// A scheduled pass is due
    Tick,
    /// The requested connection is up
    Connected,
    /// The requested connection could not be opened
    ConnectFailed,
    /// A complete response arrived
    Message(HttpResponse),
    /// The connection dropped or the step deadline expired
    Disconnected,
    /// The device sink refused an update
    SinkRejected,
}

/// A reading ready for the device sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkUpdate {
    /// Timestamped history entry
    Historical(ConsumptionRecord),
    /// Refresh of the live counter display
    Live(ConsumptionRecord),
}

/// Side effects the driver executes on behalf of the machine.
#[derive(Debug)]
pub enum PortalAction {
    Connect(PortalHost),
    Send(HttpRequest),
    Publish(Vec<SinkUpdate>),
    Finished { failed: bool },
}

/// The fetch session: step, cookies, token and retrieval window.
pub struct FetchSession {
    step: ConnectionStep,
    failed: bool,
    cookies: CookieJar,
    csrf_token: String,
    window: RetrievalWindow,
    builder: RequestBuilder,
    marker_cookie: String,
}

impl FetchSession {
    pub fn new(config: PortalConfig, now: DateTime<Local>) -> Self {
        let window = RetrievalWindow::new(now, config.history_days());
        let marker_cookie = config.marker_cookie.clone();
        Self {
            step: ConnectionStep::Idle,
            failed: false,
            cookies: CookieJar::new(),
            csrf_token: String::new(),
            window,
            builder: RequestBuilder::new(config),
            marker_cookie,
        }
    }

    pub fn step(&self) -> ConnectionStep {
        self.step
    }

    /// Whether the last pass ended in failure.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn days_remaining(&self) -> u32 {
        self.window.days_remaining()
    }

    /// Bump an exhausted day budget back to one before a catch-up pass.
    pub fn force_minimum_backlog(&mut self) {
        self.window.force_minimum_backlog();
    }

    /// Advance the machine by one event, returning the actions to execute.
    pub fn handle_event(&mut self, event: PortalEvent, now: DateTime<Local>) -> Vec<PortalAction> {
        use ConnectionStep::*;
        use PortalEvent::*;

        match (self.step, event) {
            (step, SinkRejected) if step != Idle => self.fail("device sink rejected a reading"),
            (Idle, Tick) => {
                self.failed = false;
                self.csrf_token.clear();
                self.window.recompute(now);
                let (year, month) = self.window.target();
                info!(
                    year,
                    month,
                    days_remaining = self.window.days_remaining(),
                    "starting portal fetch"
                );
                self.step = Connecting;
                vec![PortalAction::Connect(PortalHost::Login)]
            }
            (Connecting, Connected) => {
                debug!("login host reachable, fetching login page");
                self.cookies.reset();
                self.step = TokenConnected;
                vec![PortalAction::Send(self.builder.login_page())]
            }
            (TokenConnected, Message(response)) => {
                self.cookies.ingest(&response);
                match self.builder.extract_csrf_token(&response.body) {
                    Some(token) => self.csrf_token = token,
                    None => {
                        warn!("login page carried no anti-forgery token, submitting without one");
                        self.csrf_token.clear();
                    }
                }
                debug!("submitting credentials");
                let request = self.builder.login_submit(&self.csrf_token, &self.cookies);
                // The next Set-Cookie must be the post-login session.
                self.cookies.reset();
                self.step = LogConnected;
                vec![PortalAction::Send(request)]
            }
            (LogConnected, Message(response)) => {
                self.cookies.ingest(&response);
                self.check_session_marker()
            }
            (DataConnecting, Connected) => {
                let (year, month) = self.window.target();
                info!(year, month, "requesting daily readings");
                self.step = GettingDataDays;
                vec![PortalAction::Send(self.builder.day_data(
                    year,
                    month,
                    &self.cookies,
                ))]
            }
            (GettingDataDays, Message(response)) => {
                self.cookies.ingest(&response);
                self.ingest_day_rows(&response.body, now)
            }
            (Connecting | TokenConnected | LogConnected | DataConnecting | GettingDataDays,
                ConnectFailed | Disconnected) => {
                self.fail("connection lost")
            }
            (step, event) => {
                debug!(?step, ?event, "event ignored in this step");
                Vec::new()
            }
        }
    }

    /// The login response carries the session cookie only when the
    /// credentials were accepted.
    fn check_session_marker(&mut self) -> Vec<PortalAction> {
        if self.cookies.has(&self.marker_cookie) {
            debug!("session established");
            self.step = ConnectionStep::DataConnecting;
            vec![PortalAction::Connect(PortalHost::Data)]
        } else {
            self.fail("authentication failed, session cookie absent")
        }
    }

    fn ingest_day_rows(&mut self, payload: &str, now: DateTime<Local>) -> Vec<PortalAction> {
        let (year, month) = self.window.target();
        let parsed = match records::parse_day_rows(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, year, month, "rejecting daily readings payload");
                return self.fail("malformed daily readings payload");
            }
        };

        let mut updates = Vec::with_capacity(parsed.len() + 1);
        for record in parsed {
            updates.push(SinkUpdate::Historical(record.clone()));
            if self.window.take_live_update() {
                // Newest batch: the first record also refreshes the live
                // counter and does not count against the budget.
                updates.push(SinkUpdate::Live(record));
            } else {
                self.window.consume_day();
            }
        }
        info!(
            year,
            month,
            readings = updates.len(),
            days_remaining = self.window.days_remaining(),
            "ingested daily readings"
        );

        let mut actions = vec![PortalAction::Publish(updates)];
        if self.window.days_remaining() > 0 {
            self.window.recompute(now);
            // Loop back over the retained session for the next month.
            self.step = ConnectionStep::LogConnected;
            actions.extend(self.check_session_marker());
        } else {
            info!("history fetch complete");
            self.step = ConnectionStep::Idle;
            actions.push(PortalAction::Finished { failed: false });
        }
        actions
    }

    fn fail(&mut self, reason: &str) -> Vec<PortalAction> {
        let (year, month) = self.window.target();
        error!(step = ?self.step, year, month, "{reason}");
        self.step = ConnectionStep::Idle;
        self.failed = true;
        vec![PortalAction::Finished { failed: true }]
    }

    #[cfg(test)]
    pub(crate) fn set_window(&mut self, window: RetrievalWindow) {
        self.window = window;
    }
}
