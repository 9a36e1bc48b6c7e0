//! # Aqualog Suez adapter
//!
//! Fetches daily water-consumption history from the Suez "toutsurmoneau"
//! customer portal and republishes it into a home-automation device model.
//!
//! ## Architecture
//!
//! ```text
//! toutsurmoneau portal
//!       │ HTTPS (login form + statJData)
//!       ▼
//! ┌───────────────────────────────────┐
//! │    aqualog-adapter-suez           │
//! │  ┌───────────┐   ┌─────────────┐  │
//! │  │ Transport │◄─►│ FetchSession│  │
//! │  │ (reqwest) │   │ state machine│ │
//! │  └───────────┘   └──────┬──────┘  │
//! │        driver loop      │         │
//! └─────────────────────────┼─────────┘
//!                           ▼
//!                     DeviceSink
//!              (home-automation device)
//! ```
//!
//! The portal speaks a fixed protocol: fetch the login form for its
//! anti-forgery token, POST the credentials, prove the session with the
//! `eZSESSID` cookie, then request one month of daily readings at a time
//! until the configured day backlog is spent. [`suez::FetchSession`] walks
//! that protocol as a pure state machine; the [`Adapter`] driver executes
//! its actions over a [`PortalTransport`] and publishes the resulting
//! readings through a [`DeviceSink`].
//!
//! ## Usage
//!
//! ```no_run
//! use aqualog_adapter_suez::{Adapter, AdapterConfig, HttpsTransport, LogSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AdapterConfig::new("user@example.com", "secret", "123456")
//!         .with_history_days(365);
//!
//!     let transport = HttpsTransport::new(config.portal.clone())?;
//!     let adapter = Adapter::new(config, transport, LogSink::default());
//!     adapter.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod schedule;
pub mod sink;
pub mod suez;
pub mod transport;

pub use adapter::Adapter;
pub use config::{AdapterConfig, PortalConfig, ScheduleConfig};
pub use schedule::Schedule;
pub use sink::{DeviceSink, LogSink, SinkError};
pub use suez::{ConnectionStep, ConsumptionRecord, FetchSession, PortalEvent};
pub use transport::{HttpsTransport, PortalTransport, TransportError};
