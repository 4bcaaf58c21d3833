//! Method table: pattern-addressed handler registrations and the dispatch
//! algorithm that matches an incoming message against them.

use std::rc::Rc;

use crate::argument::{Argument, TypeTag};
use crate::coerce::{can_coerce_spec, coerce_all};
use crate::message::Message;
use crate::pattern::{is_pattern, pattern_match};

/// What a handler tells the dispatcher to do with the remaining
/// registrations for this incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    /// Stop trying further registrations for this message.
    Claimed,
    /// Keep trying the next matching registration.
    Passed,
}

/// A user-supplied callback invoked when a registration matches. Takes the
/// effective path (the registration's own path, or the incoming path if the
/// registration was path-wildcarded), the matched argument list (coerced if
/// necessary), and the message it arrived in.
pub trait Handler {
    fn call(&mut self, path: &str, args: &[Argument], message: &Message) -> HandlerResult;
}

impl<F> Handler for F
where
    F: FnMut(&str, &[Argument], &Message) -> HandlerResult,
{
    fn call(&mut self, path: &str, args: &[Argument], message: &Message) -> HandlerResult {
        self(path, args, message)
    }
}

/// One entry in the method table: an optional path (`None` matches any
/// path), an optional typespec (`None` matches any typespec), and the
/// handler to invoke.
pub struct Registration {
    pub path: Option<String>,
    pub typespec: Option<String>,
    handler: Box<dyn Handler>,
}

impl Registration {
    fn types(&self) -> Option<Vec<TypeTag>> {
        self.typespec
            .as_deref()
            .map(|t| t.chars().filter_map(|c| TypeTag::from_code(c).ok()).collect())
    }
}

/// `None` is used in place of a C `NULL` pointer throughout; two
/// registrations are a delete-match when both sides are `None` or both are
/// `Some` with equal contents. A `None` typespec only matches another
/// `None`, never acting as a wildcard-delete-everything.
fn null_equivalent(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// An ordered list of method registrations plus the dispatch algorithm that
/// walks it for each incoming message.
#[derive(Default)]
pub struct MethodTable {
    entries: Vec<Registration>,
}

impl MethodTable {
    pub fn new() -> Self {
        MethodTable { entries: Vec::new() }
    }

    /// Registers a handler. A `path` containing pattern metacharacters is
    /// rejected with `false` (registrations must be literal paths; patterns
    /// are only meaningful on the incoming side). `None` for either `path`
    /// or `typespec` registers a wildcard.
    pub fn add(
        &mut self,
        path: Option<String>,
        typespec: Option<String>,
        handler: Box<dyn Handler>,
    ) -> bool {
        if let Some(p) = &path {
            if is_pattern(p) {
                return false;
            }
        }
        self.entries.push(Registration { path, typespec, handler });
        true
    }

    /// Removes every registration whose typespec is null-equivalent to
    /// `typespec`, and whose path either is null-equivalent to `path` or, if
    /// `path` is itself a pattern, is matched by it (so `del("/a/*", None)`
    /// removes a literal registration at `/a/specific` the same way an
    /// incoming message at `/a/*` would have dispatched to it).
    pub fn del(&mut self, path: Option<&str>, typespec: Option<&str>) {
        self.entries.retain(|r| {
            let path_matches = null_equivalent(&r.path, &path.map(str::to_string))
                || match (path, &r.path) {
                    (Some(p), Some(registered)) => is_pattern(p) && pattern_match(p, registered),
                    _ => false,
                };
            !(path_matches && null_equivalent(&r.typespec, &typespec.map(str::to_string)))
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every distinct registered path, in first-seen order (used to build
    /// introspection replies).
    pub fn known_paths(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for r in &self.entries {
            if let Some(p) = &r.path {
                if !seen.contains(&p.as_str()) {
                    seen.push(p.as_str());
                }
            }
        }
        seen
    }

    /// Dispatches `message` arriving at `path`. Returns `true` if some
    /// registration claimed it.
    pub fn dispatch(&mut self, path: &str, message: &Message) -> bool {
        let types: Vec<TypeTag> = message.args().iter().map(Argument::type_tag).collect();
        let incoming_is_pattern = is_pattern(path);
        let mut claimed = false;

        for entry in &mut self.entries {
            let path_matches = match &entry.path {
                None => true,
                Some(registered) => {
                    registered == path || (incoming_is_pattern && pattern_match(path, registered))
                }
            };
            if !path_matches {
                continue;
            }

            let exact_types = match entry.typespec.as_deref() {
                None => true,
                Some(t) => t == message_typespec_body(&types),
            };

            let invoked = if exact_types {
                let effective_path = entry.path.as_deref().unwrap_or(path);
                Some((effective_path.to_string(), message.args().to_vec()))
            } else if let Some(registered_types) = entry.types() {
                if can_coerce_spec(&registered_types, &types) {
                    coerce_all(&registered_types, message.args())
                        .map(|coerced| (entry.path.clone().unwrap_or_else(|| path.to_string()), coerced))
                } else {
                    None
                }
            } else {
                None
            };

            if let Some((effective_path, args)) = invoked {
                let result = entry.handler.call(&effective_path, &args, message);
                if result == HandlerResult::Claimed {
                    claimed = true;
                    if !incoming_is_pattern {
                        return true;
                    }
                }
            }
        }
        claimed
    }
}

fn message_typespec_body(types: &[TypeTag]) -> String {
    types.iter().map(|t| t.code()).collect()
}

/// Wraps a plain closure as a boxed [`Handler`], for terser registration.
pub fn handler_fn<F>(f: F) -> Box<dyn Handler>
where
    F: FnMut(&str, &[Argument], &Message) -> HandlerResult + 'static,
{
    Box::new(f)
}

/// A shared, reference-counted handle to a table, for dispatchers that hand
/// the same table to multiple transports.
pub type SharedMethodTable = Rc<std::cell::RefCell<MethodTable>>;
