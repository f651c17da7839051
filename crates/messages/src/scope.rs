use serde::{Deserialize, Serialize};

/// Audience of a message: an individual user, a group, or one of five
/// deployment-defined custom scopes. The set is closed; adapters map their
/// platform notions onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    User,
    Group,
    #[serde(rename = "customized_1")]
    Customized1,
    #[serde(rename = "customized_2")]
    Customized2,
    #[serde(rename = "customized_3")]
    Customized3,
    #[serde(rename = "customized_4")]
    Customized4,
    #[serde(rename = "customized_5")]
    Customized5,
}

impl MessageScope {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Customized1 => "customized_1",
            Self::Customized2 => "customized_2",
            Self::Customized3 => "customized_3",
            Self::Customized4 => "customized_4",
            Self::Customized5 => "customized_5",
        }
    }
}

impl std::fmt::Display for MessageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
