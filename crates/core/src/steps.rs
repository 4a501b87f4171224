//! Funnel step names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of funnel steps reported per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunnelStep {
    Landing,
    Checkout,
    LoginOptions,
    SignUp,
    Purchase,
}

impl FunnelStep {
    /// All steps in funnel order.
    pub const ALL: [FunnelStep; 5] = [
        Self::Landing,
        Self::Checkout,
        Self::LoginOptions,
        Self::SignUp,
        Self::Purchase,
    ];

    /// Step name as recorded in the `step` param.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Checkout => "checkout",
            Self::LoginOptions => "login-options",
            Self::SignUp => "sign-up",
            Self::Purchase => "purchase",
        }
    }

    /// Column name used for this step in per-week reports.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Checkout => "checkout",
            Self::LoginOptions => "login_options",
            Self::SignUp => "sign_up",
            Self::Purchase => "purchase",
        }
    }
}

impl fmt::Display for FunnelStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunnelStep {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s || step.column() == s)
            .ok_or_else(|| crate::Error::config(format!("unknown funnel step: {}", s)))
    }
}
