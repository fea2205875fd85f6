use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, ArrayValue, KeyValue, KeyValueList};
use opentelemetry_proto::tonic::resource::v1::Resource;
use otelview_core::ids::to_hex;
use otelview_core::model::{AttrValue, Attributes};

pub const SERVICE_NAME_KEY: &str = "service.name";
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Converts OTLP key/values into an attribute map. An empty collection yields `None`.
/// Byte values become lowercase hex strings; entries without a value are dropped.
pub fn decode_attributes(kvs: &[KeyValue]) -> Option<Attributes> {
    let map = decode_map(kvs);
    (!map.is_empty()).then_some(map)
}

fn decode_map(kvs: &[KeyValue]) -> Attributes {
    kvs.iter()
        .filter_map(|kv| {
            let value = decode_any_value(kv.value.as_ref()?)?;
            Some((kv.key.clone(), value))
        })
        .collect()
}

pub fn decode_any_value(value: &AnyValue) -> Option<AttrValue> {
    let decoded = match value.value.as_ref()? {
        Value::StringValue(s) => AttrValue::String(s.clone()),
        Value::BoolValue(b) => AttrValue::Bool(*b),
        Value::IntValue(i) => AttrValue::Int(*i),
        Value::DoubleValue(d) => AttrValue::Float(*d),
        Value::BytesValue(b) => AttrValue::String(to_hex(b)),
        Value::KvlistValue(list) => AttrValue::Map(decode_map(&list.values)),
        Value::ArrayValue(array) => {
            AttrValue::List(array.values.iter().filter_map(decode_any_value).collect())
        }
    };
    Some(decoded)
}

pub fn encode_attributes(attrs: &Attributes) -> Vec<KeyValue> {
    attrs
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: Some(encode_any_value(value)),
        })
        .collect()
}

pub fn encode_any_value(value: &AttrValue) -> AnyValue {
    let encoded = match value {
        AttrValue::String(s) => Value::StringValue(s.clone()),
        AttrValue::Int(i) => Value::IntValue(*i),
        AttrValue::Float(f) => Value::DoubleValue(*f),
        AttrValue::Bool(b) => Value::BoolValue(*b),
        AttrValue::Bytes(b) => Value::BytesValue(b.clone()),
        AttrValue::Map(m) => Value::KvlistValue(KeyValueList {
            values: encode_attributes(m),
        }),
        AttrValue::List(items) => Value::ArrayValue(ArrayValue {
            values: items.iter().map(encode_any_value).collect(),
        }),
    };
    AnyValue {
        value: Some(encoded),
    }
}

/// The resource's `service.name`, or `"unknown"` when it is missing or not a string.
pub fn service_name(resource: Option<&Resource>) -> String {
    resource
        .and_then(|r| r.attributes.iter().find(|kv| kv.key == SERVICE_NAME_KEY))
        .and_then(|kv| kv.value.as_ref())
        .and_then(|v| match v.value.as_ref() {
            Some(Value::StringValue(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Attributes {
        testkit::attrs(&[
            ("http.method", "GET".into()),
            ("http.status_code", 503i64.into()),
            ("ratio", 0.75f64.into()),
            ("retry", true.into()),
            (
                "peer",
                AttrValue::Map(testkit::attrs(&[
                    ("host", "db".into()),
                    ("ports", AttrValue::List(vec![5432i64.into(), "5433".into()])),
                    ("empty", AttrValue::Map(Attributes::new())),
                ])),
            ),
            ("tags", AttrValue::List(vec![])),
        ])
    }

    #[test]
    fn round_trip_preserves_values() {
        let original = sample();
        let decoded = decode_attributes(&encode_attributes(&original));
        assert_eq!(decoded, Some(original));
    }

    #[test]
    fn bytes_decode_to_hex_strings() {
        let original = testkit::attrs(&[("blob", AttrValue::Bytes(vec![0xca, 0xfe, 0x01]))]);
        let decoded = decode_attributes(&encode_attributes(&original)).unwrap();
        assert_eq!(decoded.get("blob"), Some(&AttrValue::String("cafe01".to_string())));

        let again = decode_attributes(&encode_attributes(&decoded)).unwrap();
        assert_eq!(again, decoded);
    }

    #[test]
    fn empty_collection_is_absent() {
        assert_eq!(decode_attributes(&[]), None);
        let unset = KeyValue {
            key: "k".to_string(),
            value: None,
        };
        assert_eq!(decode_attributes(&[unset]), None);
    }

    #[test]
    fn service_name_falls_back_to_unknown() {
        assert_eq!(service_name(Some(&testkit::resource("checkout"))), "checkout");
        assert_eq!(service_name(None), "unknown");
        let numeric = Resource {
            attributes: vec![testkit::kv(SERVICE_NAME_KEY, Value::IntValue(7))],
            ..Default::default()
        };
        assert_eq!(service_name(Some(&numeric)), "unknown");
    }
}
