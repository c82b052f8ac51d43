//! Audit trail consumer: records events into whichever `Store` the container
//! injects, timestamped by the injected `Clock`.

pub mod clock;
pub mod trail;

pub use clock::{Clock, SystemClock};
pub use trail::{record, recent, AuditEvent, AuditError};
