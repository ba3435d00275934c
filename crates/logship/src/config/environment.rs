//! Deployment environment identifiers and the severity policy.
//!
//! The deployment environment is resolved once at startup and decides two
//! things: the default minimum severity for the whole pipeline, and whether
//! the remote batching sink is constructed at all. Neither is consulted
//! again on the hot logging path.
//!
//! # Severity policy
//!
//! | Environment | Threshold |
//! |-------------|-----------|
//! | development | debug     |
//! | test        | warn      |
//! | staging     | info      |
//! | production  | info      |
//! | (unknown)   | info      |

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::config::severity::Severity;

/// Deployment environment the process runs in.
///
/// Parsing never fails: unrecognized identifiers are preserved in
/// [`DeployEnv::Other`] and treated conservatively (info threshold, no
/// remote sink).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum DeployEnv {
    /// Local interactive development.
    #[default]
    Development,
    /// Automated test runs.
    Test,
    /// Pre-production deployment.
    Staging,
    /// Production deployment.
    Production,
    /// Anything else, lowercased as given.
    Other(String),
}

impl DeployEnv {
    /// Minimum severity admitted by the router in this environment.
    ///
    /// Pure and total: every environment, including unknown ones, resolves
    /// to a threshold.
    #[must_use]
    pub fn threshold(&self) -> Severity {
        match self {
            DeployEnv::Development => Severity::Debug,
            DeployEnv::Test => Severity::Warn,
            DeployEnv::Staging | DeployEnv::Production => Severity::Info,
            DeployEnv::Other(_) => Severity::Info,
        }
    }

    /// Whether records should be shipped to the remote index store.
    ///
    /// Only staging and production carry the remote sink; everywhere else
    /// the console is the sole destination.
    #[must_use]
    pub fn is_production_like(&self) -> bool {
        matches!(self, DeployEnv::Staging | DeployEnv::Production)
    }

    /// Environment name as written into configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            DeployEnv::Development => "development",
            DeployEnv::Test => "test",
            DeployEnv::Staging => "staging",
            DeployEnv::Production => "production",
            DeployEnv::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for DeployEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployEnv {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "development" | "dev" => DeployEnv::Development,
            "test" => DeployEnv::Test,
            "staging" => DeployEnv::Staging,
            "production" | "prod" => DeployEnv::Production,
            other => DeployEnv::Other(other.to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        assert_eq!(DeployEnv::Development.threshold(), Severity::Debug);
        assert_eq!(DeployEnv::Test.threshold(), Severity::Warn);
        assert_eq!(DeployEnv::Staging.threshold(), Severity::Info);
        assert_eq!(DeployEnv::Production.threshold(), Severity::Info);
    }

    #[test]
    fn test_unknown_environment_defaults_to_info() {
        let env: DeployEnv = "qa-cluster-7".parse().unwrap();
        assert_eq!(env, DeployEnv::Other("qa-cluster-7".to_string()));
        assert_eq!(env.threshold(), Severity::Info);
        assert!(!env.is_production_like());
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!(
            "PRODUCTION".parse::<DeployEnv>().unwrap(),
            DeployEnv::Production
        );
        assert_eq!("prod".parse::<DeployEnv>().unwrap(), DeployEnv::Production);
        assert_eq!("dev".parse::<DeployEnv>().unwrap(), DeployEnv::Development);
    }

    #[test]
    fn test_production_like() {
        assert!(DeployEnv::Production.is_production_like());
        assert!(DeployEnv::Staging.is_production_like());
        assert!(!DeployEnv::Development.is_production_like());
        assert!(!DeployEnv::Test.is_production_like());
    }
}
