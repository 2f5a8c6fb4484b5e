//! Publishing strategies.

use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a run with pending changes is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Publish a new baseline resourcelist.
    #[default]
    Resourcelist,
    /// Discard the incremental chain and start a new changelist series.
    NewChangelist,
    /// Append to the existing changelist chain.
    IncChangelist,
}

impl Strategy {
    /// All strategies in code order.
    pub const ALL: [Strategy; 3] = [
        Strategy::Resourcelist,
        Strategy::NewChangelist,
        Strategy::IncChangelist,
    ];

    /// Returns the configuration name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Resourcelist => "resourcelist",
            Strategy::NewChangelist => "new_changelist",
            Strategy::IncChangelist => "inc_changelist",
        }
    }

    /// Converts to a numeric code.
    #[must_use]
    pub fn to_code(&self) -> u8 {
        match self {
            Strategy::Resourcelist => 0,
            Strategy::NewChangelist => 1,
            Strategy::IncChangelist => 2,
        }
    }

    /// Converts from a numeric code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.to_code() == code)
    }

    /// Returns true if this strategy publishes changelists.
    #[must_use]
    pub fn is_changelist(&self) -> bool {
        matches!(self, Strategy::NewChangelist | Strategy::IncChangelist)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| ConfigurationError::UnknownStrategy(s.to_string()))
    }
}
