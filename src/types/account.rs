//! Account-related types for the ledger transfer engine
//!
//! This module defines the Account row, its identifier, and the fixed set of
//! currencies an account can be denominated in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier (primary key of the accounts table)
pub type AccountId = i64;

/// Currencies supported by the ledger
///
/// Serialized in upper case (`"KRW"`, `"USD"`, `"EUR"`), which is also the
/// form accepted on the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Krw,
    Usd,
    Eur,
}

impl Currency {
    /// The ISO code of the currency
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Krw => "KRW",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    /// Parse a currency code, ignoring surrounding whitespace and ASCII case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KRW" => Ok(Currency::Krw),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unsupported currency '{}'", other)),
        }
    }
}

/// Account row
///
/// The balance is held in minor units of `currency`. It is only ever changed
/// through the ledger repository's in-transaction increment, never by
/// writing back a value read earlier by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    /// Principal that owns the account (opaque username)
    pub owner: String,

    /// Balance in minor units
    pub balance: i64,

    pub currency: Currency,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account row stamped with the current time
    pub fn new(id: AccountId, owner: impl Into<String>, currency: Currency, balance: i64) -> Self {
        Account {
            id,
            owner: owner.into(),
            balance,
            currency,
            created_at: Utc::now(),
        }
    }
}
