//! JSON request and response bodies for the HTTP surface.
//!
//! Timestamps are RFC 3339 strings and record ids are canonical 32-character lowercase hex.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRecordReq {
    pub title: String,
    pub original_text: String,
    /// Defaults to `doctor_note`.
    #[serde(default)]
    pub record_type: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRecordReq {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub record_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordRes {
    pub id: String,
    pub title: String,
    pub original_text: String,
    pub record_type: String,
    pub translated_text: Option<String>,
    pub lifestyle_suggestions: Option<String>,
    /// Condition the cached suggestions were generated for.
    pub suggestions_condition: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordSummaryRes {
    pub id: String,
    pub title: String,
    pub record_type: String,
    pub created_at: String,
    pub has_translation: bool,
    pub has_suggestions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub records: Vec<RecordSummaryRes>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRecordsQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    /// Defaults to 100.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Translate either free `text` or the stored text of `record_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TranslateReq {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsReq {
    pub condition: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExplainQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    pub message: String,
    /// Record whose text is passed to the model as context.
    #[serde(default)]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichmentRes {
    pub content: String,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicationRes {
    pub id: u64,
    pub name: String,
    pub url: Option<String>,
    pub uses: Option<String>,
    pub side_effects: Option<String>,
    pub discontinued: bool,
    pub discontinuation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Search and list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicationSummaryRes {
    pub id: u64,
    pub name: String,
    pub uses: Option<String>,
    pub discontinued: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListMedicationsRes {
    pub medications: Vec<MedicationSummaryRes>,
    /// Size of the filtered catalogue before paging.
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMedicationsQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    /// Defaults to 100.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub discontinued_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchMedicationsQuery {
    /// Matched against names and uses, ignoring case.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub skip: Option<usize>,
    /// Defaults to 50.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_discontinued: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateMedicationReq {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
    #[serde(default)]
    pub side_effects: Option<String>,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub discontinuation_reason: Option<String>,
}

/// Find medication mentions in free `text` or in the stored text of `record_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ExtractMedicationsReq {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MedicationMentionRes {
    pub name: String,
    pub uses: Option<String>,
    pub side_effects: Option<String>,
    pub discontinued: bool,
    pub discontinuation_reason: Option<String>,
    /// `DISCONTINUED` for discontinued medications.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractMedicationsRes {
    pub medications_found: Vec<MedicationMentionRes>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_req_defaults() {
        let req: TranslateReq = serde_json::from_str(r#"{"text": "WBC: 7.5"}"#).unwrap();
        assert_eq!(req.text.as_deref(), Some("WBC: 7.5"));
        assert_eq!(req.record_id, None);
        assert!(!req.force_refresh);
    }

    #[test]
    fn test_cached_response_omits_provider() {
        let res = EnrichmentRes {
            content: "plain".into(),
            cached: true,
            provider_used: None,
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json, serde_json::json!({"content": "plain", "cached": true}));
    }

    #[test]
    fn test_create_medication_req_defaults() {
        let req: CreateMedicationReq = serde_json::from_str(r#"{"name": "Metformin"}"#).unwrap();
        assert_eq!(req.name, "Metformin");
        assert!(!req.discontinued);
        assert_eq!(req.uses, None);
    }
}
