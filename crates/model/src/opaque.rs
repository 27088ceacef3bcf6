use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific message kept verbatim in the conversation.
///
/// Assistant turns that requested tool calls must usually be replayed to the
/// provider exactly as they were received, otherwise the following tool
/// results cannot be matched with their requests. The provider wraps its own
/// wire message in an `OpaqueMessage`, and unwraps it again when it encodes
/// the next request. The orchestration loop only stores and forwards it.
///
/// Two opaque messages are equal when their ids are equal.
#[derive(Clone)]
pub struct OpaqueMessage {
    id: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueMessage {
    /// Wraps `value` under the given id.
    ///
    /// The id should be unique within one conversation.
    #[inline]
    pub fn new<ID: AsRef<str>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            value: Arc::new(value),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wrapped value if it has type `T`.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct WireMessage {
        content: String,
        tool_call_ids: Vec<String>,
    }

    #[test]
    fn test_unwrap_raw_value() {
        let wire = WireMessage {
            content: "Searching".to_owned(),
            tool_call_ids: vec!["call_1".to_owned()],
        };
        let opaque = OpaqueMessage::new("chatcmpl-1", wire.clone());
        assert_eq!(opaque.id(), "chatcmpl-1");
        assert_eq!(opaque.to_raw::<WireMessage>(), Some(&wire));
        assert!(opaque.to_raw::<String>().is_none());
    }

    #[test]
    fn test_identity_by_id() {
        let first = OpaqueMessage::new("msg:0", 1_u32);
        let same_id = OpaqueMessage::new("msg:0", "different payload");
        let second = OpaqueMessage::new("msg:1", 1_u32);
        assert_eq!(first, same_id);
        assert_ne!(first, second);

        let set: HashSet<_> = [first.clone(), first, same_id, second]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
