//! Subscription plans and the credit rules attached to them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Every plan starts with a free trial of this many days.
pub const TRIAL_DAYS: i64 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Lite,
    Pro,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Lite, Plan::Pro, Plan::Enterprise];

    /// Listings included per month, `None` when unlimited.
    #[must_use]
    pub fn monthly_credits(self) -> Option<i32> {
        match self {
            Plan::Lite => Some(20),
            Plan::Pro => Some(150),
            Plan::Enterprise => None,
        }
    }

    #[must_use]
    pub fn monthly_price_usd(self) -> u32 {
        match self {
            Plan::Lite => 19,
            Plan::Pro => 49,
            Plan::Enterprise => 149,
        }
    }

    #[must_use]
    pub fn tagline(self) -> &'static str {
        match self {
            Plan::Lite => "Para pequeños comercios",
            Plan::Pro => "Para crecimiento acelerado",
            Plan::Enterprise => "Para grandes volúmenes",
        }
    }

    #[must_use]
    pub fn is_unlimited(self) -> bool {
        self.monthly_credits().is_none()
    }

    /// Credit balance stored for a profile on this plan.
    ///
    /// Unlimited plans never get charged, so the stored balance is cosmetic;
    /// it is kept at zero.
    #[must_use]
    pub fn starting_credits(self) -> i32 {
        self.monthly_credits().unwrap_or(0)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Lite => "lite",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lite" => Ok(Plan::Lite),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(CoreError::InvalidPlan(other.to_string())),
        }
    }
}

/// Returns `true` when `email` belongs to one of the exempt domains.
///
/// Matching is on the full `@domain` suffix, case-insensitive, so
/// `x@notuhuragroup.com` does not match `uhuragroup.com`.
#[must_use]
pub fn is_exempt_email(email: Option<&str>, exempt_domains: &[String]) -> bool {
    let Some(email) = email else {
        return false;
    };
    let email = email.trim().to_ascii_lowercase();
    exempt_domains
        .iter()
        .any(|domain| email.ends_with(&format!("@{domain}")))
}
