//! 推論設定

use crate::ElError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reasoner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// 完備化パスの最大回数
    pub max_passes: usize,
    /// 1 クエリで生成できる個体の上限
    pub max_individuals: Option<usize>,
    /// クエリのタイムアウト（ミリ秒）
    pub timeout_ms: Option<u64>,
    /// Keep `⊤` in query results
    pub include_top: bool,
    /// Keep conjunctions in query results
    pub include_conjunctions: bool,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            max_passes: 10_000,
            max_individuals: None,
            timeout_ms: None,
            include_top: false,
            include_conjunctions: false,
        }
    }
}

impl ReasonerConfig {
    /// Reject limits no query could ever satisfy
    pub fn validate(&self) -> Result<(), ElError> {
        if self.max_passes == 0 {
            return Err(ElError::ConfigurationError(
                "max_passes must be at least 1".to_string(),
            ));
        }
        if self.max_individuals == Some(0) {
            return Err(ElError::ConfigurationError(
                "max_individuals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_max_individuals(mut self, max_individuals: usize) -> Self {
        self.max_individuals = Some(max_individuals);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_top(mut self, include_top: bool) -> Self {
        self.include_top = include_top;
        self
    }

    pub fn with_conjunctions(mut self, include_conjunctions: bool) -> Self {
        self.include_conjunctions = include_conjunctions;
        self
    }
}
