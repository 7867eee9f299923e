//! Typed view of the knowledge base's `structured_data` document.
//!
//! The document has two generations of sections: the ones written when the
//! knowledge base is first built from uploaded files, and the ones written
//! as conversations are archived into it. Every section is optional, every
//! list defaults to empty, and top-level keys this client does not know are
//! kept verbatim in [`KnowledgeBaseData::extra`] so an update round-trips
//! them unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemOverview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub core_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiStandards {
    #[serde(default)]
    pub primary_colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_library: Option<String>,
    #[serde(default)]
    pub layout_features: Vec<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownField {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: String,
    #[serde(default, alias = "usage", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechConventions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_style: Option<String>,
    #[serde(default)]
    pub known_fields: Vec<KnownField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedRequirement {
    pub conversation_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub prd_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureModule {
    pub module_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentStatus {
    #[serde(default)]
    pub total_requirements: u32,
    #[serde(default)]
    pub completed_features: Vec<String>,
    #[serde(default)]
    pub feature_count_by_module: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectOverview {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub current_status: CurrentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechArchitecture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conventions: Option<Map<String, Value>>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_overview: Option<SystemOverview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_standards: Option<UiStandards>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_conventions: Option<TechConventions>,
    #[serde(default)]
    pub pending_questions: Vec<PendingQuestion>,
    #[serde(default)]
    pub completed_requirements: Vec<CompletedRequirement>,
    #[serde(default)]
    pub raw_insights: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_overview: Option<ProjectOverview>,
    #[serde(default)]
    pub feature_modules: Vec<FeatureModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_architecture: Option<TechArchitecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_ux_standards: Option<UiStandards>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KnowledgeBaseData {
    /// True once conversations have been archived into the knowledge base.
    pub fn is_evolved(&self) -> bool {
        self.project_overview.is_some() || !self.feature_modules.is_empty()
    }

    /// Product description, preferring the evolved overview.
    pub fn description(&self) -> Option<&str> {
        self.project_overview
            .as_ref()
            .map(|o| o.description.as_str())
            .filter(|d| !d.is_empty())
            .or_else(|| {
                self.system_overview
                    .as_ref()
                    .and_then(|o| o.description.as_deref())
            })
    }

    /// UI standards, preferring the evolved section.
    pub fn ui(&self) -> Option<&UiStandards> {
        self.ui_ux_standards.as_ref().or(self.ui_standards.as_ref())
    }

    /// Module names, preferring the evolved feature modules.
    pub fn module_names(&self) -> Vec<&str> {
        if !self.feature_modules.is_empty() {
            return self
                .feature_modules
                .iter()
                .map(|m| m.module_name.as_str())
                .collect();
        }
        self.system_overview
            .as_ref()
            .map(|o| o.core_modules.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_document_decodes_with_missing_sections() {
        let data: KnowledgeBaseData = serde_json::from_value(json!({
            "system_overview": {
                "product_type": "SaaS",
                "core_modules": ["Billing", "Accounts"]
            },
            "pending_questions": [{ "question": "Which SSO providers?" }]
        }))
        .unwrap();

        assert!(!data.is_evolved());
        assert!(data.ui().is_none());
        assert_eq!(data.module_names(), vec!["Billing", "Accounts"]);
        assert_eq!(data.pending_questions.len(), 1);
    }

    #[test]
    fn evolved_sections_take_precedence() {
        let data: KnowledgeBaseData = serde_json::from_value(json!({
            "system_overview": { "description": "old", "core_modules": ["Legacy"] },
            "project_overview": {
                "description": "A PRD authoring tool",
                "current_status": { "total_requirements": 3 }
            },
            "feature_modules": [{ "module_name": "Chat", "features": [] }],
            "ui_ux_standards": { "component_library": "antd" }
        }))
        .unwrap();

        assert!(data.is_evolved());
        assert_eq!(data.description(), Some("A PRD authoring tool"));
        assert_eq!(data.module_names(), vec!["Chat"]);
        assert_eq!(
            data.ui().and_then(|u| u.component_library.as_deref()),
            Some("antd")
        );
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let input = json!({
            "raw_insights": ["prefers dark mode"],
            "competitor_notes": { "acme": "cheaper" }
        });
        let data: KnowledgeBaseData = serde_json::from_value(input).unwrap();
        assert!(data.extra.contains_key("competitor_notes"));

        let output = serde_json::to_value(&data).unwrap();
        assert_eq!(output["competitor_notes"]["acme"], "cheaper");
        assert_eq!(output["raw_insights"][0], "prefers dark mode");
    }
}
