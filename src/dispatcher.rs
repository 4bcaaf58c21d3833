//! Packet-level entry point: validates raw bytes as a message or bundle,
//! recurses through nested bundles, and drives the method table and the
//! schedule queue.

use std::rc::Rc;

use crate::argument::Argument;
use crate::blob::MAX_MSG_SIZE;
use crate::bundle::Bundle;
use crate::error::{Error, Result};
use crate::logger::{LogMessage, Severity};
use crate::message::Message;
use crate::method::MethodTable;
use crate::schedule::{ScheduleQueue, ScheduledEntry, DEFAULT_EPSILON_SECS, DEFAULT_MAX_DELAY_SECS};
use crate::strcodec;
use crate::timetag::Timetag;

/// Transport the packet arrived over. Introspection replies are a
/// UDP-only courtesy — over TCP/Unix a stream has no implicit reply address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
    Unix,
}

/// Tunables an OSC implementation conventionally hard-codes as preprocessor
/// macros, grouped into one settings struct instead of scattered free
/// functions or constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherConfig {
    pub max_msg_size: usize,
    pub introspection_enabled: bool,
    pub protocol: Protocol,
    /// Tolerance the schedule queue uses to flush same-instant bundles as one
    /// batch. See [`crate::schedule::ScheduleQueue::dispatch_queued`].
    pub schedule_epsilon_secs: f64,
    /// Clamp on the delay `next_event_delay` reports. See
    /// [`crate::schedule::ScheduleQueue::next_event_delay`].
    pub schedule_max_delay_secs: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            max_msg_size: MAX_MSG_SIZE,
            introspection_enabled: true,
            protocol: Protocol::Udp,
            schedule_epsilon_secs: DEFAULT_EPSILON_SECS,
            schedule_max_delay_secs: DEFAULT_MAX_DELAY_SECS,
        }
    }
}

/// Ties a method table and schedule queue together behind the single
/// `dispatch_data` entry point. Single-threaded, cooperative: no locks, no
/// interior mutability beyond the plain `&mut self` this type exposes.
///
/// `send` and `on_error` are the two hooks a transport wires up: `send`
/// receives serialised outbound packets (currently just introspection
/// replies) addressed to the `source` a message arrived from, and `on_error`
/// receives a [`LogMessage`] alongside every validation or dispatch failure.
/// Both default to doing nothing, matching a transport that hasn't been
/// plugged in yet.
pub struct Dispatcher {
    pub config: DispatcherConfig,
    pub methods: MethodTable,
    pub queue: ScheduleQueue,
    send: Box<dyn FnMut(&[u8], Option<&str>)>,
    on_error: Box<dyn FnMut(LogMessage)>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Dispatcher {
            config,
            methods: MethodTable::new(),
            queue: ScheduleQueue::with_limits(config.schedule_max_delay_secs, config.schedule_epsilon_secs),
            send: Box::new(|_, _| {}),
            on_error: Box::new(|_| {}),
        }
    }

    /// Installs the sink outbound packets are handed to (currently just
    /// introspection replies), addressed by whatever `source` token the
    /// reply is answering.
    pub fn set_send(&mut self, send: impl FnMut(&[u8], Option<&str>) + 'static) {
        self.send = Box::new(send);
    }

    /// Installs the callback invoked alongside every validation or dispatch
    /// failure from [`Dispatcher::dispatch_data`].
    pub fn set_on_error(&mut self, on_error: impl FnMut(LogMessage) + 'static) {
        self.on_error = Box::new(on_error);
    }

    /// Entry point for a raw packet received from the transport. Returns the
    /// number of bytes of `raw` consumed on success (mirroring
    /// `lop_server_dispatch_data`'s return convention), or a typed
    /// error if the leading string doesn't validate. On every error path,
    /// `on_error` is also invoked with a `LogMessage` describing the failure
    /// (carrying the path, if one was successfully decoded first).
    pub fn dispatch_data(&mut self, raw: &[u8], source: Option<&str>, now: Timetag) -> Result<usize> {
        if raw.is_empty() {
            self.report_error(Error::NoPath, None);
            return Err(Error::NoPath);
        }
        let lead_len = match strcodec::validate(raw) {
            Ok(n) => n,
            Err(e) => {
                self.report_error(e, None);
                return Err(e);
            }
        };
        let lead = match strcodec::decode(&raw[..lead_len]) {
            Ok(s) => s,
            Err(e) => {
                self.report_error(e, None);
                return Err(e);
            }
        };

        if lead == "#bundle" {
            match Bundle::deserialize(raw, self.config.max_msg_size) {
                Ok(bundle) => self.dispatch_bundle(&bundle, now),
                Err(e) => {
                    self.report_error(e, Some(&lead));
                    return Err(e);
                }
            }
        } else {
            match Message::deserialize(raw, self.config.max_msg_size) {
                Ok((path, message)) => self.dispatch_one(&path, Rc::new(message), source),
                Err(e) => {
                    self.report_error(e, Some(&lead));
                    return Err(e);
                }
            }
        }
        Ok(raw.len())
    }

    fn report_error(&mut self, err: Error, path: Option<&str>) {
        let mut log = LogMessage::new(Severity::Error, err.to_string());
        if let Some(p) = path {
            log = log.with_path(p);
        }
        (self.on_error)(log);
    }

    fn dispatch_bundle(&mut self, bundle: &Bundle, now: Timetag) {
        for (path, message) in bundle.flatten() {
            if message.timetag.is_due(now) {
                self.dispatch_one(&path, message, None);
            } else {
                self.queue.insert(ScheduledEntry {
                    timetag: message.timetag,
                    path,
                    message,
                });
            }
        }
    }

    fn dispatch_one(&mut self, path: &str, message: Rc<Message>, source: Option<&str>) {
        let claimed = self.methods.dispatch(path, &message);
        if !claimed
            && self.config.introspection_enabled
            && self.config.protocol == Protocol::Udp
            && path.ends_with('/')
        {
            let reply = self.build_introspection_reply(path, &message);
            match reply.serialize("#reply", self.config.max_msg_size) {
                Ok(buf) => (self.send)(&buf, source),
                Err(e) => self.report_error(e, Some(path)),
            }
        }
    }

    /// Drains and dispatches whatever in the schedule queue is due at `now`.
    pub fn tick(&mut self, now: Timetag) {
        loop {
            let due = self.queue.dispatch_queued(now);
            if due.is_empty() {
                break;
            }
            for entry in due {
                self.dispatch_one(&entry.path, entry.message, None);
            }
        }
    }

    /// Seconds until the next scheduled entry is due, for sizing a
    /// transport's wait loop.
    pub fn next_event_delay(&self, now: Timetag) -> f64 {
        self.queue.next_event_delay(now)
    }

    /// Builds the `#reply` message for an unclaimed introspection request at
    /// `path`: leading correlation id if the incoming typespec is
    /// exactly `"i"`, then the original path, then one argument per distinct
    /// child path segment known to the method table.
    fn build_introspection_reply(&self, path: &str, message: &Message) -> Message {
        let mut reply = Message::new();
        if message.typespec() == ",i" {
            if let Some(Argument::Int32(id)) = message.args().first() {
                reply.add_int32(*id);
            }
        }
        reply.add_string(path);

        let mut seen = Vec::new();
        for known in self.methods.known_paths() {
            if let Some(suffix) = known.strip_prefix(path) {
                let segment = suffix.split('/').next().unwrap_or("");
                if !segment.is_empty() && !seen.contains(&segment) {
                    seen.push(segment);
                    reply.add_string(segment);
                }
            }
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{handler_fn, HandlerResult};

    fn now_far_future() -> Timetag {
        Timetag::new(u32::MAX, 0)
    }

    #[test]
    fn dispatches_a_bare_message() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        let seen = Rc::new(std::cell::RefCell::new(false));
        let seen2 = seen.clone();
        d.methods.add(
            Some("/x".into()),
            None,
            handler_fn(move |_, _, _| {
                *seen2.borrow_mut() = true;
                HandlerResult::Claimed
            }),
        );
        let mut msg = Message::new();
        msg.add_int32(1);
        let buf = msg.serialize("/x", MAX_MSG_SIZE).unwrap();
        let consumed = d.dispatch_data(&buf, None, Timetag::now()).unwrap();
        assert_eq!(consumed, buf.len());
        assert!(*seen.borrow());
    }

    #[test]
    fn bundle_with_immediate_timetag_dispatches_inline() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        let seen = Rc::new(std::cell::RefCell::new(0));
        let seen2 = seen.clone();
        d.methods.add(
            Some("/y".into()),
            None,
            handler_fn(move |_, _, _| {
                *seen2.borrow_mut() += 1;
                HandlerResult::Claimed
            }),
        );
        let mut bundle = Bundle::new(crate::timetag::IMMEDIATE);
        let mut msg = Message::new();
        msg.add_int32(1);
        bundle.add_message("/y", Rc::new(msg));
        let buf = bundle.serialize(MAX_MSG_SIZE).unwrap();
        d.dispatch_data(&buf, None, Timetag::now()).unwrap();
        assert_eq!(*seen.borrow(), 1);
        assert!(d.queue.is_empty());
    }

    #[test]
    fn bundle_with_future_timetag_is_queued_not_dispatched() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        d.methods.add(
            Some("/z".into()),
            None,
            handler_fn(|_, _, _| panic!("should not fire yet")),
        );
        let mut bundle = Bundle::new(Timetag::new(1_000_000_000, 0));
        let mut msg = Message::new();
        msg.add_int32(1);
        bundle.add_message("/z", Rc::new(msg));
        let buf = bundle.serialize(MAX_MSG_SIZE).unwrap();
        d.dispatch_data(&buf, None, Timetag::new(1, 0)).unwrap();
        assert_eq!(d.queue.len(), 1);
    }

    #[test]
    fn queued_entry_dispatches_once_due() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        let seen = Rc::new(std::cell::RefCell::new(0));
        let seen2 = seen.clone();
        d.methods.add(
            Some("/z".into()),
            None,
            handler_fn(move |_, _, _| {
                *seen2.borrow_mut() += 1;
                HandlerResult::Claimed
            }),
        );
        let mut bundle = Bundle::new(Timetag::new(10, 0));
        let mut msg = Message::new();
        msg.add_int32(1);
        bundle.add_message("/z", Rc::new(msg));
        let buf = bundle.serialize(MAX_MSG_SIZE).unwrap();
        d.dispatch_data(&buf, None, Timetag::new(0, 0)).unwrap();
        assert_eq!(*seen.borrow(), 0);
        d.tick(Timetag::new(20, 0));
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn unclaimed_trailing_slash_path_builds_introspection_reply() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        d.methods.add(
            Some("/synth/freq".into()),
            None,
            handler_fn(|_, _, _| HandlerResult::Passed),
        );
        d.methods.add(
            Some("/synth/gain".into()),
            None,
            handler_fn(|_, _, _| HandlerResult::Passed),
        );
        let mut msg = Message::new();
        msg.add_int32(42);
        let reply = d.build_introspection_reply("/synth/", &msg);
        assert_eq!(reply.args()[0], Argument::Int32(42));
        assert_eq!(reply.args()[1], Argument::String("/synth/".into()));
        assert_eq!(reply.args()[2], Argument::String("freq".into()));
        assert_eq!(reply.args()[3], Argument::String("gain".into()));
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        let huge = vec![b'a'; MAX_MSG_SIZE * 2];
        assert!(d.dispatch_data(&huge, None, now_far_future()).is_err());
    }

    #[test]
    fn unclaimed_trailing_slash_request_sends_a_reply_to_its_source() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        d.methods.add(
            Some("/synth/freq".into()),
            None,
            handler_fn(|_, _, _| HandlerResult::Passed),
        );
        let sent = Rc::new(std::cell::RefCell::new(None));
        let sent2 = sent.clone();
        d.set_send(move |buf, source| {
            *sent2.borrow_mut() = Some((buf.to_vec(), source.map(str::to_string)));
        });
        let msg = Message::new();
        let buf = msg.serialize("/synth/", MAX_MSG_SIZE).unwrap();
        d.dispatch_data(&buf, Some("127.0.0.1:9000"), Timetag::now()).unwrap();

        let (sent_buf, sent_source) = sent.borrow().clone().expect("reply should have been sent");
        assert_eq!(sent_source.as_deref(), Some("127.0.0.1:9000"));
        let (path, decoded) = Message::deserialize(&sent_buf, MAX_MSG_SIZE).unwrap();
        assert_eq!(path, "#reply");
        assert_eq!(decoded.args()[0], Argument::String("/synth/".into()));
        assert_eq!(decoded.args()[1], Argument::String("freq".into()));
    }

    #[test]
    fn dispatch_data_reports_validation_failures_through_on_error() {
        let mut d = Dispatcher::new(DispatcherConfig::default());
        let errors = Rc::new(std::cell::RefCell::new(Vec::new()));
        let errors2 = errors.clone();
        d.set_on_error(move |log| errors2.borrow_mut().push(log));

        assert!(d.dispatch_data(&[], None, Timetag::now()).is_err());
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].level, Severity::Error);
        assert!(errors.borrow()[0].path.is_none());
    }
}
