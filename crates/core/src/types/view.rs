//! Local view selection.

use serde::{Deserialize, Serialize};

/// Which dashboard view is active.
///
/// Purely local state: switching views never triggers a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewSelector {
    /// The product catalog.
    #[default]
    Explore,
    /// Ranked recommendations for the current identity.
    Recommendations,
    /// The behavioral profile of the current identity.
    Profile,
}

impl ViewSelector {
    /// All views, in tab order.
    pub const ALL: [Self; 3] = [Self::Explore, Self::Recommendations, Self::Profile];

    /// Tab title (e.g. "Explore").
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Explore => "Explore",
            Self::Recommendations => "Recommendations",
            Self::Profile => "Profile",
        }
    }
}

impl std::fmt::Display for ViewSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explore => write!(f, "explore"),
            Self::Recommendations => write!(f, "recommendations"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

impl std::str::FromStr for ViewSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explore" => Ok(Self::Explore),
            "recommendations" => Ok(Self::Recommendations),
            "profile" => Ok(Self::Profile),
            _ => Err(format!("invalid view: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_is_explore() {
        assert_eq!(ViewSelector::default(), ViewSelector::Explore);
    }

    #[test]
    fn test_parse_every_view() {
        for view in ViewSelector::ALL {
            assert_eq!(view.to_string().parse::<ViewSelector>().unwrap(), view);
        }
        assert!("settings".parse::<ViewSelector>().is_err());
    }

    #[test]
    fn test_titles() {
        assert_eq!(ViewSelector::Recommendations.title(), "Recommendations");
    }
}
