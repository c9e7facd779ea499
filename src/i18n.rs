//! User-facing text in English and Chinese.
//!
//! Each locale has one table keyed by `MessageKey`. `Catalog::validate`
//! runs at startup and refuses a catalog with any missing or blank entry.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    pub fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.tag() == tag)
    }
}

macro_rules! message_keys {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        /// Every translatable string in the application.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MessageKey {
            $($variant),+
        }

        impl MessageKey {
            pub const ALL: &'static [MessageKey] = &[$(MessageKey::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }
        }
    };
}

message_keys! {
    Title => "title",
    GuestAccess => "guest_access",
    InvestigatorLogin => "investigator_login",
    GuestNotice => "guest_notice",
    InvestigatorNotice => "investigator_notice",
    PatientInfo => "patient_info",
    Name => "name",
    Gender => "gender",
    Male => "male",
    Female => "female",
    Other => "other",
    ClinicalIndicators => "clinical_indicators",
    StartAssessment => "start_assessment",
    WarningName => "warning_name",
    RiskProbability => "risk_probability",
    RiskLevel => "risk_level",
    RecordSaved => "record_saved",
    SaveFailed => "save_failed",
    FeatureImpact => "feature_impact",
    FeatureContribution => "feature_contribution",
    PredictionHistory => "prediction_history",
    FilterByName => "filter_by_name",
    All => "all",
    DeleteRecords => "delete_records",
    SelectRecords => "select_records",
    DeleteSelected => "delete_selected",
    DeleteSuccess => "delete_success",
    DeleteFailed => "delete_failed",
    DeleteNoneMatched => "delete_none_matched",
    DownloadHistory => "download_history",
    NoHistory => "no_history",
    HistoryFormatMismatch => "history_format_mismatch",
    HistoryRowsUnreadable => "history_rows_unreadable",
    Logout => "logout",
    LoggedInAs => "logged_in_as",
    Guest => "guest",
    Investigator => "investigator",
    DataManagement => "data_management",
    LoginPrompt => "login_prompt",
    SessionRequired => "session_required",
    Username => "username",
    Password => "password",
    EnterAsGuest => "enter_as_guest",
    LoginAsInvestigator => "login_as_investigator",
    InvalidCredentials => "invalid_credentials",
    LowRisk => "low_risk",
    MediumRisk => "medium_risk",
    HighRisk => "high_risk",
    ModelLoadFailed => "model_load_failed",
    InternalError => "internal_error",
}

const EN: &[(MessageKey, &str)] = &[
    (MessageKey::Title, "DR Risk Assessment System"),
    (MessageKey::GuestAccess, "Guest Access"),
    (MessageKey::InvestigatorLogin, "Investigator Login"),
    (MessageKey::GuestNotice, "Guest users can run risk assessments but cannot access history data."),
    (MessageKey::InvestigatorNotice, "Investigators can access all features, including data management."),
    (MessageKey::PatientInfo, "Patient Information"),
    (MessageKey::Name, "Name"),
    (MessageKey::Gender, "Gender"),
    (MessageKey::Male, "Male"),
    (MessageKey::Female, "Female"),
    (MessageKey::Other, "Other"),
    (MessageKey::ClinicalIndicators, "Enter Clinical Indicators"),
    (MessageKey::StartAssessment, "Start Assessment"),
    (MessageKey::WarningName, "Please enter patient name before assessment."),
    (MessageKey::RiskProbability, "DR Risk Probability"),
    (MessageKey::RiskLevel, "Risk Level"),
    (MessageKey::RecordSaved, "Prediction record saved."),
    (MessageKey::SaveFailed, "The prediction could not be saved to history."),
    (MessageKey::FeatureImpact, "Feature Impact Analysis"),
    (MessageKey::FeatureContribution, "Feature Contribution Ranking"),
    (MessageKey::PredictionHistory, "Prediction History"),
    (MessageKey::FilterByName, "Filter by patient name"),
    (MessageKey::All, "All"),
    (MessageKey::DeleteRecords, "Delete Records"),
    (MessageKey::SelectRecords, "Select records to delete (by index):"),
    (MessageKey::DeleteSelected, "Delete Selected Records"),
    (MessageKey::DeleteSuccess, "Selected records deleted successfully!"),
    (MessageKey::DeleteFailed, "Failed to delete records."),
    (MessageKey::DeleteNoneMatched, "None of the selected records exist any more."),
    (MessageKey::DownloadHistory, "Download History as CSV"),
    (MessageKey::NoHistory, "No prediction history yet."),
    (MessageKey::HistoryFormatMismatch, "The history file does not have the expected columns."),
    (MessageKey::HistoryRowsUnreadable, "Some history rows could not be read."),
    (MessageKey::Logout, "Logout"),
    (MessageKey::LoggedInAs, "Logged in as"),
    (MessageKey::Guest, "guest"),
    (MessageKey::Investigator, "investigator"),
    (MessageKey::DataManagement, "Data Management"),
    (MessageKey::LoginPrompt, "Please log in as an investigator to access this feature."),
    (MessageKey::SessionRequired, "Please choose guest access or log in first."),
    (MessageKey::Username, "Username"),
    (MessageKey::Password, "Password"),
    (MessageKey::EnterAsGuest, "Enter as Guest"),
    (MessageKey::LoginAsInvestigator, "Login as Investigator"),
    (MessageKey::InvalidCredentials, "Invalid username or password"),
    (MessageKey::LowRisk, "Low Risk"),
    (MessageKey::MediumRisk, "Medium Risk"),
    (MessageKey::HighRisk, "High Risk"),
    (MessageKey::ModelLoadFailed, "Model loading failed"),
    (MessageKey::InternalError, "An internal error occurred"),
];

const ZH: &[(MessageKey, &str)] = &[
    (MessageKey::Title, "糖尿病视网膜病变风险评估系统"),
    (MessageKey::GuestAccess, "访客入口"),
    (MessageKey::InvestigatorLogin, "调查人员登录"),
    (MessageKey::GuestNotice, "访客用户只能进行风险评估，无法访问历史数据。"),
    (MessageKey::InvestigatorNotice, "调查人员可以访问所有功能，包括数据管理。"),
    (MessageKey::PatientInfo, "患者信息"),
    (MessageKey::Name, "姓名"),
    (MessageKey::Gender, "性别"),
    (MessageKey::Male, "男"),
    (MessageKey::Female, "女"),
    (MessageKey::Other, "其他"),
    (MessageKey::ClinicalIndicators, "输入临床指标"),
    (MessageKey::StartAssessment, "开始评估"),
    (MessageKey::WarningName, "评估前请输入患者姓名"),
    (MessageKey::RiskProbability, "糖尿病视网膜病变风险概率"),
    (MessageKey::RiskLevel, "风险等级"),
    (MessageKey::RecordSaved, "预测记录已保存"),
    (MessageKey::SaveFailed, "预测记录保存失败"),
    (MessageKey::FeatureImpact, "特征影响分析"),
    (MessageKey::FeatureContribution, "特征贡献度排名"),
    (MessageKey::PredictionHistory, "预测历史"),
    (MessageKey::FilterByName, "按患者姓名筛选"),
    (MessageKey::All, "全部"),
    (MessageKey::DeleteRecords, "删除记录"),
    (MessageKey::SelectRecords, "选择要删除的记录（按索引）:"),
    (MessageKey::DeleteSelected, "删除选中的记录"),
    (MessageKey::DeleteSuccess, "选中的记录已删除"),
    (MessageKey::DeleteFailed, "删除记录失败"),
    (MessageKey::DeleteNoneMatched, "选中的记录已不存在"),
    (MessageKey::DownloadHistory, "下载历史记录"),
    (MessageKey::NoHistory, "暂无预测历史"),
    (MessageKey::HistoryFormatMismatch, "历史记录文件格式不符"),
    (MessageKey::HistoryRowsUnreadable, "部分历史记录无法读取"),
    (MessageKey::Logout, "退出登录"),
    (MessageKey::LoggedInAs, "登录身份"),
    (MessageKey::Guest, "访客"),
    (MessageKey::Investigator, "调查人员"),
    (MessageKey::DataManagement, "数据管理"),
    (MessageKey::LoginPrompt, "请以调查人员身份登录以访问此功能"),
    (MessageKey::SessionRequired, "请先以访客身份进入或登录"),
    (MessageKey::Username, "用户名"),
    (MessageKey::Password, "密码"),
    (MessageKey::EnterAsGuest, "以访客身份进入"),
    (MessageKey::LoginAsInvestigator, "以调查人员身份登录"),
    (MessageKey::InvalidCredentials, "用户名或密码错误"),
    (MessageKey::LowRisk, "低风险"),
    (MessageKey::MediumRisk, "中风险"),
    (MessageKey::HighRisk, "高风险"),
    (MessageKey::ModelLoadFailed, "模型加载失败"),
    (MessageKey::InternalError, "发生内部错误"),
];

#[derive(Debug, thiserror::Error)]
pub enum I18nError {
    #[error("Locale {locale} is missing translations for: {keys:?}")]
    MissingKeys {
        locale: &'static str,
        keys: Vec<&'static str>,
    },
}

/// Locale → key → text.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Locale, HashMap<MessageKey, &'static str>>,
}

impl Catalog {
    /// The compiled-in English and Chinese tables.
    pub fn builtin() -> Self {
        Self::from_tables(&[(Locale::En, EN), (Locale::Zh, ZH)])
    }

    pub fn from_tables(tables: &[(Locale, &[(MessageKey, &'static str)])]) -> Self {
        let tables = tables
            .iter()
            .map(|(locale, entries)| (*locale, entries.iter().copied().collect()))
            .collect();
        Self { tables }
    }

    /// Every locale must define a non-blank string for every key.
    pub fn validate(&self) -> Result<(), I18nError> {
        for locale in Locale::ALL {
            let table = self.tables.get(&locale);
            let missing: Vec<&'static str> = MessageKey::ALL
                .iter()
                .filter(|key| {
                    table
                        .and_then(|t| t.get(key))
                        .map_or(true, |text| text.trim().is_empty())
                })
                .map(|key| key.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(I18nError::MissingKeys {
                    locale: locale.tag(),
                    keys: missing,
                });
            }
        }
        Ok(())
    }

    /// Look up a string, falling back to the key name itself.
    pub fn text(&self, locale: Locale, key: MessageKey) -> &'static str {
        self.tables
            .get(&locale)
            .and_then(|t| t.get(&key))
            .copied()
            .unwrap_or_else(|| key.as_str())
    }

    /// Whole table for one locale, keyed by the string key name.
    pub fn table(&self, locale: Locale) -> BTreeMap<&'static str, &'static str> {
        MessageKey::ALL
            .iter()
            .map(|key| (key.as_str(), self.text(locale, *key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_complete() {
        Catalog::builtin().validate().unwrap();
    }

    #[test]
    fn builtin_tables_have_no_duplicate_keys() {
        for table in [EN, ZH] {
            let unique: std::collections::HashSet<_> = table.iter().map(|(k, _)| *k).collect();
            assert_eq!(unique.len(), table.len());
            assert_eq!(table.len(), MessageKey::ALL.len());
        }
    }

    #[test]
    fn validate_reports_missing_keys() {
        let partial: &[(MessageKey, &str)] = &[(MessageKey::Title, "Only a title")];
        let catalog = Catalog::from_tables(&[(Locale::En, EN), (Locale::Zh, partial)]);
        match catalog.validate() {
            Err(I18nError::MissingKeys { locale, keys }) => {
                assert_eq!(locale, "zh");
                assert!(keys.contains(&"high_risk"));
                assert!(!keys.contains(&"title"));
            }
            Ok(()) => panic!("incomplete catalog passed validation"),
        }
    }

    #[test]
    fn validate_rejects_blank_text() {
        let blank: Vec<(MessageKey, &str)> = EN
            .iter()
            .map(|(k, v)| if *k == MessageKey::Logout { (*k, "  ") } else { (*k, *v) })
            .collect();
        let catalog = Catalog::from_tables(&[(Locale::En, blank.as_slice()), (Locale::Zh, ZH)]);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn text_lookup_per_locale() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.text(Locale::En, MessageKey::MediumRisk), "Medium Risk");
        assert_eq!(catalog.text(Locale::Zh, MessageKey::MediumRisk), "中风险");
    }

    #[test]
    fn missing_entry_falls_back_to_key_name() {
        let catalog = Catalog::from_tables(&[(Locale::En, EN)]);
        assert_eq!(catalog.text(Locale::Zh, MessageKey::Logout), "logout");
    }

    #[test]
    fn locale_tags_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_tag(locale.tag()), Some(locale));
        }
        assert_eq!(Locale::from_tag("fr"), None);
        assert_eq!(serde_json::to_string(&Locale::Zh).unwrap(), "\"zh\"");
    }
}
