use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transposition::DEFAULT_TABLE_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    pub max_depth: Option<u32>,
    pub time_limit_ms: Option<u64>,
    pub table_capacity: Option<usize>,
    pub node_limit: Option<u64>,
}

impl SearchBudget {
    pub fn depth(max_depth: u32) -> Self {
        Self::default().with_max_depth(max_depth)
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_time_limit_ms(mut self, millis: u64) -> Self {
        self.time_limit_ms = Some(millis);
        self
    }

    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.table_capacity = Some(capacity);
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn capacity(&self) -> usize {
        self.table_capacity.unwrap_or(DEFAULT_TABLE_CAPACITY)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == Some(0) {
            return Err(ConfigError::Validation("max_depth must be at least 1".to_string()));
        }
        if self.time_limit_ms == Some(0) {
            return Err(ConfigError::Validation("time_limit_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Insane,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard, Difficulty::Insane];

    pub fn budget(self) -> SearchBudget {
        match self {
            Difficulty::Easy => SearchBudget::depth(1),
            Difficulty::Normal => SearchBudget::depth(5).with_time_limit_ms(3_000),
            Difficulty::Hard => SearchBudget::depth(20).with_time_limit_ms(3_000),
            Difficulty::Insane => SearchBudget::depth(24).with_time_limit_ms(10_000),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Insane => "insane",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownDifficulty(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_unbounded() {
        let budget = SearchBudget::default();
        assert_eq!(budget.max_depth, None);
        assert_eq!(budget.time_limit(), None);
        assert_eq!(budget.capacity(), DEFAULT_TABLE_CAPACITY);
        assert!(budget.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let budget = SearchBudget::depth(6)
            .with_time_limit_ms(250)
            .with_table_capacity(10)
            .with_node_limit(5_000);
        assert_eq!(budget.max_depth, Some(6));
        assert_eq!(budget.time_limit(), Some(Duration::from_millis(250)));
        assert_eq!(budget.capacity(), 10);
        assert_eq!(budget.node_limit, Some(5_000));
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        assert!(matches!(
            SearchBudget::depth(0).validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_budget_deserializes_partial_json() {
        let budget: SearchBudget = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(budget, SearchBudget::depth(3));
    }

    #[test]
    fn test_difficulty_parse_and_display() {
        for level in Difficulty::ALL {
            assert_eq!(level.to_string().parse::<Difficulty>().unwrap(), level);
        }
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(
            "brutal".parse::<Difficulty>(),
            Err(ConfigError::UnknownDifficulty("brutal".to_string()))
        );
    }

    #[test]
    fn test_difficulty_presets() {
        assert_eq!(Difficulty::Easy.budget().max_depth, Some(1));
        assert_eq!(Difficulty::Normal.budget().time_limit_ms, Some(3_000));
        assert_eq!(Difficulty::Insane.budget().max_depth, Some(24));
        for level in Difficulty::ALL {
            assert!(level.budget().validate().is_ok());
        }
    }
}
