//! Lifecycle status enumerations for resources and holds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Status of a contended resource.
///
/// Resources are never deleted, only transitioned:
/// `Available -> Held -> (Committed | Available)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "resource_status", rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Free to be claimed.
    Available,
    /// Claimed by exactly one ACTIVE hold.
    Held,
    /// Sold; terminal.
    Committed,
}

impl ResourceStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Held => "held",
            Self::Committed => "committed",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "held" => Ok(Self::Held),
            "committed" => Ok(Self::Committed),
            other => Err(AppError::validation(format!("unknown resource status '{other}'"))),
        }
    }
}

/// Lifecycle status of a hold.
///
/// Only `Active` is mutable; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "hold_status", rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    /// Holding the resource until commit, release, or expiry.
    Active,
    /// Committed: the resource was sold to the holder.
    Completed,
    /// Reclaimed after its TTL elapsed.
    Expired,
    /// Released early by the holder.
    Cancelled,
}

impl HoldStatus {
    /// Check if the hold is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HoldStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!("unknown hold status '{other}'"))),
        }
    }
}
