use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Analysis Records ---
// Field names are camelCase on the wire to match the web client.

/// Analysis
///
/// Feedback produced for one uploaded solution. Owned by the user who uploaded it and kept
/// only in process memory.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Analysis {
    pub user_id: String,
    pub filename: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub problem: String,
    pub steps: Vec<SolutionStep>,
    pub misconceptions: Vec<Misconception>,
    pub summary: String,
    pub overall_feedback: String,
}

/// SolutionStep
///
/// One line of the student's working, with a verdict and, when wrong, the corrected line.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SolutionStep {
    pub step: u32,
    pub content: String,
    pub is_correct: bool,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

/// Misconception
///
/// A conceptual or procedural error, anchored to the step where it first appears.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Misconception {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub step: u32,
    pub impact: Impact,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Impact {
    Low,
    Medium,
    High,
}

// --- Response Payloads ---

/// UploadResponse
///
/// Returned by `POST /api/ai-analysis` once the analysis has been stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub success: bool,
    pub analysis_id: String,
    pub message: String,
}

/// AnalysisResponse
///
/// Returned by `GET /api/ai-analysis?id=...`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: Analysis,
}

/// AnalysisEntry
///
/// An analysis together with its id, used by the history and teacher listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct AnalysisEntry {
    pub id: String,
    pub analysis: Analysis,
}

/// ErrorResponse
///
/// Body of every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
