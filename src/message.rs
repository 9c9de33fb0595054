//! Wire shapes for the aggregator's message interface.
//!
//! A request is a tagged union `{ "action": ..., "data": ... }`; each action
//! has its own response object.

use serde::{Deserialize, Serialize};

use crate::types::{ActivityEntry, Settings, TrackEvent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "data",
    rename_all = "camelCase",
    try_from = "RawMessage"
)]
pub enum Request {
    TrackActivity(TrackEvent),
    GetStats,
    ClearData,
    GetSettings,
}

/// Inbound envelope. Only the action decides whether a body is a message;
/// `data` is ignored by actions that take none.
#[derive(Deserialize)]
struct RawMessage {
    action: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl TryFrom<RawMessage> for Request {
    type Error = String;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        match raw.action.as_str() {
            // `saveActivity` is the older action name and is still accepted.
            "trackActivity" | "saveActivity" => Ok(Request::TrackActivity(TrackEvent::from_data(raw.data))),
            "getStats" => Ok(Request::GetStats),
            "clearData" => Ok(Request::ClearData),
            "getSettings" => Ok(Request::GetSettings),
            other => Err(format!("unknown action `{other}`")),
        }
    }
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::TrackActivity(_) => "trackActivity",
            Request::GetStats => "getStats",
            Request::ClearData => "clearData",
            Request::GetSettings => "getSettings",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub accepted: bool,
    pub total_activities: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_activities: usize,
    pub total_listings: usize,
    /// Newest first.
    pub recent_activities: Vec<ActivityEntry>,
    /// Epoch ms of the last accepted `trackActivity`; None until one lands.
    pub last_update: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Track(TrackResponse),
    Stats(StatsResponse),
    Clear(ClearResponse),
    Settings(Settings),
}
