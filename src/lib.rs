pub mod argument;
pub mod blob;
pub mod bundle;
pub mod coerce;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod message;
pub mod method;
pub mod pattern;
pub mod schedule;
pub mod strcodec;
pub mod timetag;

pub use argument::{Argument, Midi, TypeTag};
pub use blob::{Blob, MAX_MSG_SIZE};
pub use bundle::{Bundle, Element};
pub use coerce::{can_coerce, can_coerce_spec, coerce, coerce_all};
pub use dispatcher::{Dispatcher, DispatcherConfig, Protocol};
pub use error::{Error, Result};
pub use message::{Message, Source};
pub use method::{handler_fn, Handler, HandlerResult, MethodTable, Registration, SharedMethodTable};
pub use pattern::{is_pattern, pattern_match};
pub use schedule::{ScheduleQueue, ScheduledEntry};
pub use timetag::{Timetag, IMMEDIATE};

// Re-export logging types
pub use logger::{LogMessage, Severity};
