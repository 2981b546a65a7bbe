use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "invalid key alias config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Property keys the popup projection reads, by semantic role.
///
/// The datasets use Russian key names; every field defaults to them, so a
/// config only needs to name the keys that differ for a given dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyAliasConfig {
    pub city_type: String,
    pub city_name: String,
    /// "Other-number identifier" shown next to the title.
    pub onp: String,
    pub region: String,
    pub district: String,
    pub population: String,

    /// Total number of submissions.
    pub applied: String,
    /// Total number of awards.
    pub won: String,
    pub win_share: String,
    /// Attribute key of the combined `won / applied` row.
    pub summary_label: String,

    /// Periodic sub-keys are `{period}{suffix}`.
    pub period_applied_suffix: String,
    pub period_won_suffix: String,
    /// Known periods, in display order.
    pub periods: Vec<String>,
}

impl Default for KeyAliasConfig {
    fn default() -> Self {
        Self {
            city_type: "тип".to_string(),
            city_name: "нп".to_string(),
            onp: "онп".to_string(),
            region: "регион".to_string(),
            district: "федеральный округ".to_string(),
            population: "население".to_string(),
            applied: "подавался".to_string(),
            won: "победители".to_string(),
            win_share: "доля побед".to_string(),
            summary_label: "победил/подавался".to_string(),
            period_applied_suffix: "_подача".to_string(),
            period_won_suffix: "_победа".to_string(),
            periods: default_periods(),
        }
    }
}

impl KeyAliasConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn period_applied_key(&self, period: &str) -> String {
        format!("{period}{}", self.period_applied_suffix)
    }

    pub fn period_won_key(&self, period: &str) -> String {
        format!("{period}{}", self.period_won_suffix)
    }

    /// Keys shown in the popup header and location block.
    pub fn header_keys(&self) -> [&str; 6] {
        [
            self.city_type.as_str(),
            self.city_name.as_str(),
            self.onp.as_str(),
            self.region.as_str(),
            self.district.as_str(),
            self.population.as_str(),
        ]
    }
}

/// Contest rounds 2018-2025 (main plus two extra rounds per year), then the
/// four Far East rounds.
pub fn default_periods() -> Vec<String> {
    let mut out = Vec::with_capacity(28);
    for year in 2018..=2025 {
        out.push(year.to_string());
        out.push(format!("{year}_1"));
        out.push(format!("{year}_2"));
    }
    for round in 1..=4 {
        out.push(format!("дфо{round}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, KeyAliasConfig, default_periods};
    use pretty_assertions::assert_eq;

    #[test]
    fn default_periods_are_ordered() {
        let periods = default_periods();
        assert_eq!(periods.len(), 28);
        assert_eq!(&periods[..4], &["2018", "2018_1", "2018_2", "2019"]);
        assert_eq!(periods.last().map(String::as_str), Some("дфо4"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = KeyAliasConfig::from_json(r#"{"city_name": "name", "periods": ["2024"]}"#)
            .expect("parse");
        assert_eq!(cfg.city_name, "name");
        assert_eq!(cfg.city_type, "тип");
        assert_eq!(cfg.periods, vec!["2024".to_string()]);
        assert_eq!(cfg.period_won_key("2024"), "2024_победа");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = KeyAliasConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
