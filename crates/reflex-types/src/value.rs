//! Storage form of attribute values.
//!
//! Documents hold their attributes as plain JSON values. A [`Bag`] is a
//! mapping with unique string keys.

pub use serde_json::Value;

/// Keyed mapping of stored values.
pub type Bag = serde_json::Map<String, Value>;

/// Normalize a stored slot so that `null` reads as missing.
pub fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn falsy_values_stay_present() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some(&json!(0))), Some(&json!(0)));
        assert_eq!(present(Some(&json!(""))), Some(&json!("")));
        assert_eq!(present(Some(&json!(false))), Some(&json!(false)));
    }

    #[test]
    fn present_drops_null() {
        assert_eq!(present(Some(&Value::Null)), None);
        assert_eq!(present(Some(&json!("x"))), Some(&json!("x")));
    }

    proptest! {
        #[test]
        fn present_keeps_every_non_null_string(s in ".*") {
            let v = Value::String(s);
            prop_assert_eq!(present(Some(&v)), Some(&v));
        }
    }
}
