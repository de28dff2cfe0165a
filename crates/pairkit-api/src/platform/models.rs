// Wire models for the pairing platform.
//
// Every response is wrapped as `{ "code": "...", "result": ... }`. The
// platform is loose with types: codes arrive as strings or numbers and
// device fields may be null, so decoding normalizes both to strings.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Generic `{code, result}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformResponse<T> {
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    pub result: Option<T>,
}

/// `result` of the product catalog endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductIdList {
    #[serde(rename = "pidList", default, deserialize_with = "null_as_default")]
    pub pid_list: Vec<String>,
}

/// `result` of the pairing token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenResult {
    #[serde(default, deserialize_with = "string_or_number")]
    pub token: String,
}

/// One device record as reported by the platform.
///
/// All fields default to the empty string; an empty `error_code` marks a
/// successfully paired device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub error_code: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub product_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub model_name: String,
}

/// `result` of the pairing status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PairingStatusResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: Vec<DeviceRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failed: Vec<DeviceRecord>,
}

/// Decoded pairing status poll. `result` is `None` when the platform
/// answered with an error code instead of a device list.
pub type PairingStatus = PlatformResponse<PairingStatusResult>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_record_tolerates_nulls_and_numbers() {
        let raw = r#"{"error_code": 4001, "device_id": null, "name": "Plug", "product_id": "p1"}"#;
        let record: DeviceRecord = serde_json::from_str(raw).expect("valid record");
        assert_eq!(record.error_code, "4001");
        assert_eq!(record.device_id, "");
        assert_eq!(record.name, "Plug");
        assert_eq!(record.model_name, "");
    }

    #[test]
    fn status_without_result_keeps_code() {
        let raw = r#"{"code": 6001, "result": null}"#;
        let status: PairingStatus = serde_json::from_str(raw).expect("valid status");
        assert_eq!(status.code, "6001");
        assert!(status.result.is_none());
    }

    #[test]
    fn status_lists_default_to_empty() {
        let raw = r#"{"code": "200", "result": {"success": null}}"#;
        let status: PairingStatus = serde_json::from_str(raw).expect("valid status");
        let result = status.result.expect("result present");
        assert!(result.success.is_empty());
        assert!(result.failed.is_empty());
    }

    #[test]
    fn envelope_result_is_optional_for_any_payload() {
        #[derive(Debug, Deserialize)]
        struct Opaque {
            value: u32,
        }

        let missing: PlatformResponse<Opaque> =
            serde_json::from_str(r#"{"code": "500"}"#).expect("valid envelope");
        assert_eq!(missing.code, "500");
        assert!(missing.result.is_none());

        let present: PlatformResponse<Opaque> =
            serde_json::from_str(r#"{"code": 200, "result": {"value": 3}}"#).expect("valid envelope");
        assert_eq!(present.result.map(|o| o.value), Some(3));
    }
}
