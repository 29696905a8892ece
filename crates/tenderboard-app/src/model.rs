// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::*;

/// Lifecycle status of a tender as reported by the backend.
///
/// Values the dashboard does not know about are kept verbatim in
/// [`TenderStatus::Unknown`] so decoding never fails on a new server status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenderStatus {
    Bidding,
    New,
    Evaluated,
    Finished,
    Cancelled,
    Unknown(String),
}

impl TenderStatus {
    pub const KNOWN: [Self; 5] = [
        Self::Bidding,
        Self::New,
        Self::Evaluated,
        Self::Finished,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bidding => "bidding",
            Self::New => "new",
            Self::Evaluated => "evaluated",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Unknown(code) => code,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "bidding" => Self::Bidding,
            "new" => Self::New,
            "evaluated" => Self::Evaluated,
            "finished" => Self::Finished,
            "cancelled" => Self::Cancelled,
            other => Self::Unknown(other.to_owned()),
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Default for TenderStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl Serialize for TenderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TenderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: String = lenient(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenderUser {
    #[serde(deserialize_with = "lenient")]
    pub id: UserId,
    #[serde(deserialize_with = "lenient")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient")]
    pub last_name: String,
    #[serde(deserialize_with = "lenient")]
    pub email: String,
}

impl TenderUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_owned()
    }
}

/// A procurement tender exactly as the list endpoint returns it.
///
/// Timestamps stay as the ISO 8601 text received on the wire; see
/// [`crate::format`] for parsing and display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tender {
    #[serde(deserialize_with = "lenient")]
    pub id: TenderId,
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub terms: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient")]
    pub created_by: TenderUser,
    pub status: TenderStatus,
    #[serde(deserialize_with = "lenient")]
    pub close_reason: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub products: Vec<ProductId>,
    #[serde(deserialize_with = "lenient")]
    pub created_at: String,
    #[serde(deserialize_with = "lenient")]
    pub updated_at: String,
    #[serde(deserialize_with = "lenient")]
    pub products_count: i64,
    #[serde(deserialize_with = "lenient")]
    pub bids_count: i64,
}

impl Tender {
    pub fn terms_text(&self) -> Option<&str> {
        non_blank(self.terms.as_deref())
    }

    pub fn close_reason_text(&self) -> Option<&str> {
        non_blank(self.close_reason.as_deref())
    }
}

pub type TenderList = Vec<Tender>;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Null, missing, or wrongly typed values decode as `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field<V> {
        Value(Option<V>),
        Other(IgnoredAny),
    }

    Ok(match Field::<T>::deserialize(deserializer)? {
        Field::Value(value) => value.unwrap_or_default(),
        Field::Other(_) => T::default(),
    })
}
