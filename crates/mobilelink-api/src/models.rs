// Wire models for the MobileLink JSON endpoints.
//
// Payloads are modeled with liberal `#[serde(default)]` because the vendor
// API is inconsistent about field presence across endpoint generations, and
// a `#[serde(flatten)]` catch-all so undocumented fields survive a
// serialize round-trip.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Apparatus `type` code for a standby generator -- the only kind this
/// client processes. Everything else is skipped without a detail fetch.
pub const GENERATOR_APPARATUS_TYPE: i64 = 0;

// ── Apparatus list ───────────────────────────────────────────────────

/// One registered unit from `/v5/Apparatus/list` (or the `/v2` fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apparatus {
    pub apparatus_id: i64,
    /// Unit kind; see [`GENERATOR_APPARATUS_TYPE`].
    #[serde(rename = "type", default)]
    pub apparatus_type: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub model_number: Option<String>,
    #[serde(default)]
    pub localized_address: Option<String>,
    #[serde(default)]
    pub preferred_dealer_name: Option<String>,
    #[serde(default)]
    pub preferred_dealer_email: Option<String>,
    #[serde(default)]
    pub preferred_dealer_phone: Option<String>,
    #[serde(default)]
    pub panel_id: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ── Apparatus detail ─────────────────────────────────────────────────

/// Detail record from `/v5/Apparatus/{id}` (or `/v1/Apparatus/details/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApparatusDetail {
    /// 1-based status code; decode with [`ApparatusStatus::from_code`].
    #[serde(default)]
    pub apparatus_status: Option<i64>,
    /// Raw connectivity string (`wifi`, `eth`, `lte`, `cdma`).
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub device_ssid: Option<String>,
    #[serde(default)]
    pub status_label: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    /// Timestamps arrive as strings; parse with [`parse_timestamp`].
    #[serde(default)]
    pub activation_date: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub connection_timestamp: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub weather: Option<Weather>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub current_alarm: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ApparatusDetail {
    /// Look up a property value by type code, trying `codes` in order.
    ///
    /// The code for a given metric differs between endpoint generations
    /// (engine hours is 71 on v5 but 70 on v2), so callers pass the known
    /// candidates newest-first -- see [`property_codes`] -- and get the
    /// first populated match, or `None` when no generation matched.
    pub fn property(&self, codes: &[i64]) -> Option<&PropertyValue> {
        codes.iter().find_map(|code| {
            self.properties
                .iter()
                .find(|prop| prop.code == *code)
                .and_then(|prop| prop.value.as_ref())
        })
    }
}

/// One `{type, value}` entry of the untyped detail property list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub code: i64,
    #[serde(default)]
    pub value: Option<PropertyValue>,
}

/// Property values arrive as numbers, numeric strings, or (rarely) nested
/// objects, depending on the endpoint generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl PropertyValue {
    /// Numeric view, coercing numeric strings the way the API mixes them.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
            Self::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Known property type codes, newest API generation first.
pub mod property_codes {
    pub const ENGINE_HOURS: &[i64] = &[71, 70];
    pub const PROTECTION_HOURS: &[i64] = &[32, 31];
    pub const BATTERY_VOLTAGE: &[i64] = &[70, 69];
    /// v5 only.
    pub const EXERCISE_MINUTES: &[i64] = &[95];
    /// v5 only; decode with [`FuelKind::from_code`](super::FuelKind::from_code).
    pub const FUEL_TYPE: &[i64] = &[88];
    /// v5 only; value is a nested object.
    pub const SIGNAL_STRENGTH: &[i64] = &[69];
}

/// Site weather block nested in the detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    #[serde(default)]
    pub temperature: Option<Temperature>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

// ── Typed projections of raw codes ───────────────────────────────────

/// Decoded `apparatusStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApparatusStatus {
    Ready,
    Running,
    Exercising,
    Warning,
    Stopped,
    CommunicationIssue,
    Unknown,
}

impl ApparatusStatus {
    /// Decode the 1-based wire code; anything out of range is `Unknown`.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::Ready,
            Some(2) => Self::Running,
            Some(3) => Self::Exercising,
            Some(4) => Self::Warning,
            Some(5) => Self::Stopped,
            Some(6) => Self::CommunicationIssue,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Exercising => "Exercising",
            Self::Warning => "Warning",
            Self::Stopped => "Stopped",
            Self::CommunicationIssue => "Communication Issue",
            Self::Unknown => "Unknown",
        }
    }
}

/// Decoded `deviceType` connectivity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityKind {
    Wifi,
    Ethernet,
    MobileData,
    Unknown,
}

impl ConnectivityKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("wifi") => Self::Wifi,
            Some("eth") => Self::Ethernet,
            Some("lte" | "cdma") => Self::MobileData,
            _ => Self::Unknown,
        }
    }
}

/// Decoded fuel-type property (code 88, v5 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelKind {
    NaturalGas,
    Propane,
    Unknown,
}

impl FuelKind {
    pub fn from_code(code: Option<f64>) -> Self {
        match code {
            Some(c) if (c - 1.0).abs() < f64::EPSILON => Self::NaturalGas,
            Some(c) if (c - 2.0).abs() < f64::EPSILON => Self::Propane,
            _ => Self::Unknown,
        }
    }
}

// ── Sign-in flow payloads ────────────────────────────────────────────

/// Subset of the `var SETTINGS = {...};` blob embedded in the sign-in page.
/// Both fields are required to continue the flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInConfig {
    #[serde(default)]
    pub csrf: Option<String>,
    #[serde(default, rename = "transId")]
    pub trans_id: Option<String>,
}

/// Identity-provider verdict on a submitted username/password.
/// `"200"` means accepted; anything else is a credentials failure.
#[derive(Debug, Clone, Deserialize)]
pub struct SelfAssertedResult {
    pub status: String,
}

// ── Result aggregation ───────────────────────────────────────────────

/// One generator with its detail record, as returned by
/// `ApiClient::fetch_device_data`. Built once per fetch cycle and replaced
/// wholesale on the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub apparatus: Apparatus,
    pub apparatus_detail: ApparatusDetail,
}

// ── Timestamps ───────────────────────────────────────────────────────

/// Vendor timestamp formats, with and without fractional seconds.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse a detail-record timestamp string, trying both vendor formats.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, Error> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, fmt) {
            return Ok(parsed);
        }
    }
    Err(Error::TimestampFormat {
        value: raw.to_owned(),
        tried: TIMESTAMP_FORMATS,
    })
}
