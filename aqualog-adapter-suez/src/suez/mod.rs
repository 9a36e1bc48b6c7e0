//! Provider portal protocol
//!
//! Everything specific to the toutsurmoneau portal: the cookie jar, the
//! per-step request builder, the day-row parser, the retrieval window and
//! the fetch state machine tying them together.

pub mod cookies;
pub mod http;
pub mod records;
pub mod session;
pub mod window;

pub use cookies::CookieJar;
pub use http::{HttpRequest, HttpResponse, PortalHost, RequestBuilder, Verb};
pub use records::{ConsumptionRecord, ParseError};
pub use session::{ConnectionStep, FetchSession, PortalAction, PortalEvent, SinkUpdate};
pub use window::RetrievalWindow;
