//! Per-resource response post-processing.

use serde_json::Value;

/// What happens after a hook has seen the enveloped response.
#[derive(Clone, Debug, PartialEq)]
pub enum HookOutcome {
    /// Send the (possibly rewritten) body as the default response.
    Send(Value),
    /// The hook answers the request itself.
    TakeOver { status: u16, body: Value },
}

/// Registered on the registry by resource name. Both methods default to passing the body through.
pub trait ResponseHook: Send + Sync {
    fn single(&self, envelope: Value) -> HookOutcome {
        HookOutcome::Send(envelope)
    }

    /// Runs on a collection. The default applies `single` to each envelope and
    /// takes over with the first envelope that does.
    fn collection(&self, envelopes: Vec<Value>) -> HookOutcome {
        let mut out = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            match self.single(envelope) {
                HookOutcome::Send(v) => out.push(v),
                takeover => return takeover,
            }
        }
        HookOutcome::Send(Value::Array(out))
    }
}
