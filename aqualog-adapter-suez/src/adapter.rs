//! Adapter driver
//!
//! Owns the state machine, the transport and the device sink. A heartbeat
//! interval polls the schedule; when a pass is due the driver feeds the
//! machine a Tick and then executes the actions it returns, translating
//! transport outcomes back into events until the machine reports Finished.
//! Every connect and request runs under the configured step deadline.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use tokio::time::{interval, timeout};
use tracing::{info, warn};

use crate::config::AdapterConfig;
use crate::schedule::Schedule;
use crate::sink::{DeviceSink, SinkError};
use crate::suez::session::{FetchSession, PortalAction, PortalEvent, SinkUpdate};
use crate::transport::PortalTransport;

/// Drives one portal fetch session against a transport and a sink.
pub struct Adapter<T, S> {
    config: AdapterConfig,
    session: FetchSession,
    transport: T,
    sink: S,
    schedule: Schedule,
}

impl<T: PortalTransport, S: DeviceSink> Adapter<T, S> {
    pub fn new(config: AdapterConfig, transport: T, sink: S) -> Self {
        let now = Local::now();
        let session = FetchSession::new(config.portal.clone(), now);
        let schedule = Schedule::new(now, config.schedule.catchup_hour);
        Self {
            config,
            session,
            transport,
            sink,
            schedule,
        }
    }

    /// Run forever: heartbeat, run due passes, reschedule.
    pub async fn run(mut self) {
        if let Err(err) = self.sink.ensure_device() {
            warn!(%err, "device registration failed, retrying in an hour");
            self.schedule.retry_soon(Local::now());
        }

        let mut heartbeat = interval(self.config.schedule.heartbeat);
        loop {
            heartbeat.tick().await;
            let now = Local::now();
            if self.schedule.due(now) {
                self.run_pass(now).await;
            }
        }
    }

    /// One full pass of the machine. Returns whether it failed.
    pub async fn run_pass(&mut self, now: DateTime<Local>) -> bool {
        // Book tomorrow's slot up front; a failure below moves it closer.
        self.schedule.catch_up_tomorrow(now);
        self.session.force_minimum_backlog();

        let failed = self.drive(now).await;
        if failed {
            let retry = self.schedule.retry_soon(Local::now());
            warn!(retry = %retry, "portal fetch failed");
        } else {
            info!(next = %self.schedule.next_connection(), "portal fetch finished");
        }
        failed
    }

    async fn drive(&mut self, now: DateTime<Local>) -> bool {
        let deadline = self.config.schedule.step_deadline;
        let mut pending: VecDeque<PortalAction> =
            self.session.handle_event(PortalEvent::Tick, now).into();

        while let Some(action) = pending.pop_front() {
            let followups = match action {
                PortalAction::Connect(host) => {
                    let event = match timeout(deadline, self.transport.connect(host)).await {
                        Ok(Ok(())) => PortalEvent::Connected,
                        Ok(Err(err)) => {
                            warn!(%err, "connect failed");
                            PortalEvent::ConnectFailed
                        }
                        Err(_) => {
                            warn!("connect deadline expired");
                            PortalEvent::ConnectFailed
                        }
                    };
                    self.session.handle_event(event, Local::now())
                }
                PortalAction::Send(request) => {
                    let event = match timeout(deadline, self.transport.send(request)).await {
                        Ok(Ok(response)) => PortalEvent::Message(response),
                        Ok(Err(err)) => {
                            warn!(%err, "request failed");
                            PortalEvent::Disconnected
                        }
                        Err(_) => {
                            warn!("request deadline expired");
                            PortalEvent::Disconnected
                        }
                    };
                    self.session.handle_event(event, Local::now())
                }
                PortalAction::Publish(updates) => match self.publish(&updates) {
                    Ok(()) => Vec::new(),
                    Err(err) => {
                        warn!(%err, "sink rejected an update");
                        pending.clear();
                        self.session
                            .handle_event(PortalEvent::SinkRejected, Local::now())
                    }
                },
                PortalAction::Finished { failed } => return failed,
            };
            for action in followups.into_iter().rev() {
                pending.push_front(action);
            }
        }

        // The machine always terminates a pass with Finished; a drained
        // queue without one means the pass went nowhere.
        true
    }

    fn publish(&mut self, updates: &[SinkUpdate]) -> Result<(), SinkError> {
        self.sink.ensure_device()?;
        for update in updates {
            match update {
                SinkUpdate::Historical(record) => self.sink.record_historical(record)?,
                SinkUpdate::Live(record) => self.sink.update_live(record)?,
            }
        }
        Ok(())
    }

    pub fn session(&self) -> &FetchSession {
        &self.session
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
