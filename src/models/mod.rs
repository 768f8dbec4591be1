pub mod change;
pub mod record;

pub use change::{ChangeEvent, ChangeKind};
pub use record::{Availability, ErrorKind, MonitoredUrl, ProductRecord};
