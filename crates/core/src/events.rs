//! Analytics event records as stored in the `events` table.

use serde::{Deserialize, Serialize};

/// Param key carrying the funnel step name.
pub const STEP_KEY: &str = "step";
/// Param key carrying the purchased product.
pub const PRODUCT_KEY: &str = "product";
/// Param key carrying the purchase amount.
pub const AMOUNT_KEY: &str = "amount";
/// Param key carrying the purchase currency.
pub const CURRENCY_KEY: &str = "currency";

/// Value half of an event param. Exactly one side is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamValue {
    pub int_value: Option<i32>,
    pub string_value: Option<String>,
}

/// One key/value entry of `event_params`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    pub key: String,
    pub value: ParamValue,
}

impl EventParam {
    /// Creates a param holding a string value.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParamValue {
                int_value: None,
                string_value: Some(value.into()),
            },
        }
    }

    /// Creates a param holding an integer value.
    pub fn int(key: impl Into<String>, value: i32) -> Self {
        Self {
            key: key.into(),
            value: ParamValue {
                int_value: Some(value),
                string_value: None,
            },
        }
    }

    /// Shorthand for a `step` param.
    pub fn step(name: impl Into<String>) -> Self {
        Self::string(STEP_KEY, name)
    }
}

/// A single user-interaction record.
///
/// Mirrors the typed columns the loader casts the parquet source into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Epoch milliseconds
    pub event_timestamp: i64,
    pub event_name: String,
    /// Ordered key/value params
    pub event_params: Vec<EventParam>,
    pub user_id: Option<String>,
    /// Pseudonymous device/user id
    pub user_pseudo_id: String,
    pub session_id: i64,
}

impl Event {
    /// Creates an event with no params.
    pub fn new(
        session_id: i64,
        user_pseudo_id: impl Into<String>,
        event_name: impl Into<String>,
        event_timestamp: i64,
    ) -> Self {
        Self {
            event_timestamp,
            event_name: event_name.into(),
            event_params: Vec::new(),
            user_id: None,
            user_pseudo_id: user_pseudo_id.into(),
            session_id,
        }
    }

    /// Appends a param, keeping insertion order.
    pub fn with_param(mut self, param: EventParam) -> Self {
        self.event_params.push(param);
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns the first string value stored under `key`.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.event_params
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| p.value.string_value.as_deref())
    }
}
