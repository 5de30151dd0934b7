//! Response values and the way they are rendered into log lines.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A handler return value that carries status and headers next to its body.
///
/// # Examples
///
/// ```rust
/// use logging_starter::{Loggable, ResponseEnvelope};
///
/// let response = ResponseEnvelope::new(201, vec![1, 2])
///     .header("location", "/items/1");
///
/// assert_eq!(
///     response.format_response().unwrap(),
///     r#"Status=201, Headers={"location": ["/items/1"]}, Body=[1,2]"#,
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope<B> {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: B,
}

impl<B> ResponseEnvelope<B> {
    pub fn new(status: u16, body: B) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Append a header value; repeated names accumulate.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }
}

/// A value an intercepted handler may return.
///
/// The default rendering serializes the whole value as JSON. Types that
/// expose status and headers override [`Loggable::format_response`]; types
/// that can be empty override [`Loggable::is_absent`].
///
/// Application types opt in with an empty impl:
///
/// ```rust
/// use logging_starter::Loggable;
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize)]
/// struct Item { id: u32 }
///
/// impl Loggable for Item {}
///
/// assert_eq!(Item { id: 1 }.format_response().unwrap(), r#"{"id":1}"#);
/// ```
pub trait Loggable: Serialize + fmt::Debug {
    fn format_response(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether the value stands for "no result".
    fn is_absent(&self) -> bool {
        false
    }
}

impl<B: Serialize + fmt::Debug> Loggable for ResponseEnvelope<B> {
    fn format_response(&self) -> serde_json::Result<String> {
        Ok(format!(
            "Status={}, Headers={:?}, Body={}",
            self.status,
            self.headers,
            serde_json::to_string(&self.body)?
        ))
    }
}

impl<T: Serialize + fmt::Debug> Loggable for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl Loggable for () {
    fn is_absent(&self) -> bool {
        true
    }
}

impl<T: Loggable + ?Sized> Loggable for Box<T> {
    fn format_response(&self) -> serde_json::Result<String> {
        (**self).format_response()
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

impl<T: Loggable + ?Sized> Loggable for Arc<T> {
    fn format_response(&self) -> serde_json::Result<String> {
        (**self).format_response()
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

macro_rules! loggable {
    ($($ty:ty),+ $(,)?) => {
        $(impl Loggable for $ty {})+
    };
}

loggable!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, Cow<'static, str>, serde_json::Value,
);

macro_rules! loggable_seq {
    ($($seq:ident),+) => {
        $(impl<T: Serialize + fmt::Debug> Loggable for $seq<T> {})+
    };
}

loggable_seq!(Vec, VecDeque, BTreeSet, HashSet);

impl<T: Serialize + fmt::Debug> Loggable for [T] {}

impl<K: Serialize + fmt::Debug, V: Serialize + fmt::Debug> Loggable for BTreeMap<K, V> {}
impl<K: Serialize + fmt::Debug, V: Serialize + fmt::Debug, S> Loggable for HashMap<K, V, S> {}

macro_rules! loggable_tuple {
    ($(($($name:ident),+))+) => {
        $(impl<$($name: Serialize + fmt::Debug),+> Loggable for ($($name,)+) {})+
    };
}

loggable_tuple! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
}

/// Render a response for the exit log line.
///
/// Serialization failures never escape: the returned text becomes
/// `Error serializing response: <message>`.
pub fn format_response<T: Loggable + ?Sized>(response: &T) -> String {
    response
        .format_response()
        .unwrap_or_else(|e| format!("Error serializing response: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Item {
        id: u32,
        name: &'static str,
    }

    impl Loggable for Item {}

    #[test]
    fn test_plain_value_is_serialized_directly() {
        let item = Item { id: 1, name: "x" };
        assert_eq!(format_response(&item), r#"{"id":1,"name":"x"}"#);
        assert_eq!(format_response(&vec![1u32, 2]), "[1,2]");
    }

    #[test]
    fn test_envelope_format() {
        let response = ResponseEnvelope::new(200, Item { id: 1, name: "x" })
            .header("content-type", "application/json")
            .header("x-trace", "a")
            .header("x-trace", "b");
        assert_eq!(
            format_response(&response),
            r#"Status=200, Headers={"content-type": ["application/json"], "x-trace": ["a", "b"]}, Body={"id":1,"name":"x"}"#
        );
    }

    #[test]
    fn test_serialization_failure_becomes_diagnostic() {
        // JSON object keys must be strings
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "v");
        let formatted = format_response(&map);
        assert!(formatted.starts_with("Error serializing response: "));
        assert!(formatted.contains("key must be a string"));
    }

    #[test]
    fn test_envelope_body_failure_becomes_diagnostic() {
        let mut map = BTreeMap::new();
        map.insert((1u8, 2u8), 3u8);
        let formatted = format_response(&ResponseEnvelope::new(500, map));
        assert!(formatted.starts_with("Error serializing response: "));
    }

    #[test]
    fn test_std_containers_and_wrappers() {
        let counts = HashMap::from([("open", 2u16)]);
        assert_eq!(format_response(&counts), r#"{"open":2}"#);
        assert_eq!(format_response(&(1u8, 'c', 0.5f64)), r#"[1,"c",0.5]"#);
        assert_eq!(format_response(&Arc::new(Item { id: 2, name: "y" })), r#"{"id":2,"name":"y"}"#);

        let boxed = Box::new(ResponseEnvelope::new(204, ()));
        assert_eq!(format_response(&boxed), "Status=204, Headers={}, Body=null");
        assert!(Box::new(None::<u8>).is_absent());
    }

    #[test]
    fn test_absence() {
        assert!(None::<u32>.is_absent());
        assert!(!Some(1u32).is_absent());
        assert!(().is_absent());
        assert!(!String::new().is_absent());
    }
}
