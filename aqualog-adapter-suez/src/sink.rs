//! Device sink
//!
//! Seam to the host automation platform. The adapter publishes two kinds of
//! updates: timestamped history entries and a refresh of the live counter
//! display. Any rejection is treated by the machine like a lost connection.

use thiserror::Error;
use tracing::info;

use crate::suez::records::ConsumptionRecord;

#[derive(Debug, Error)]
#[error("device sink rejected the update: {0}")]
pub struct SinkError(pub String);

/// Host-platform device the readings land in.
pub trait DeviceSink {
    /// Create the backing device if it does not exist yet.
    fn ensure_device(&mut self) -> Result<(), SinkError>;

    /// Append one day to the device history.
    fn record_historical(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError>;

    /// Refresh the live counter display.
    fn update_live(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError>;
}

/// Sink that renders readings as log lines, used by the CLI node.
#[derive(Debug, Default)]
pub struct LogSink {
    device_ready: bool,
}

impl DeviceSink for LogSink {
    fn ensure_device(&mut self) -> Result<(), SinkError> {
        if !self.device_ready {
            info!("registering water counter device");
            self.device_ready = true;
        }
        Ok(())
    }

    fn record_historical(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError> {
        info!(
            date = %record.date,
            usage_l = record.daily_usage_liters,
            index_l = record.cumulative_index_liters,
            "daily reading"
        );
        Ok(())
    }

    fn update_live(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError> {
        info!(
            date = %record.date,
            usage_l = record.daily_usage_liters,
            index_l = record.cumulative_index_liters,
            "live counter update"
        );
        Ok(())
    }
}

/// Capturing sink for driver tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    pub historical: Vec<ConsumptionRecord>,
    pub live: Vec<ConsumptionRecord>,
    /// Reject every update once this many have been accepted
    pub reject_after: Option<usize>,
}

#[cfg(test)]
impl MemorySink {
    fn accepted(&self) -> usize {
        self.historical.len() + self.live.len()
    }

    fn check_capacity(&self) -> Result<(), SinkError> {
        match self.reject_after {
            Some(limit) if self.accepted() >= limit => {
                Err(SinkError("capacity exhausted".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
impl DeviceSink for MemorySink {
    fn ensure_device(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn record_historical(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError> {
        self.check_capacity()?;
        self.historical.push(record.clone());
        Ok(())
    }

    fn update_live(&mut self, record: &ConsumptionRecord) -> Result<(), SinkError> {
        self.check_capacity()?;
        self.live.push(record.clone());
        Ok(())
    }
}
