use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    Short,
    Long,
}

impl TemplateVariant {
    pub const ALL: [TemplateVariant; 2] = [TemplateVariant::Short, TemplateVariant::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateVariant {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            other => Err(DomainError::UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TemplateVariant;
    use crate::errors::DomainError;

    #[test]
    fn parses_known_variants_case_insensitively() {
        assert_eq!(" Long ".parse::<TemplateVariant>(), Ok(TemplateVariant::Long));
        assert_eq!("short".parse::<TemplateVariant>(), Ok(TemplateVariant::Short));
    }

    #[test]
    fn rejects_unknown_variant() {
        assert_eq!(
            "medium".parse::<TemplateVariant>(),
            Err(DomainError::UnknownVariant("medium".to_string()))
        );
    }
}
