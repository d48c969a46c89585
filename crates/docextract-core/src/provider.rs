use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;

/// Identity of an extraction backend. The set is closed: every name the
/// dispatcher accepts maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
    /// In-process PDF text layer parsing.
    Local,
    /// Azure Document Intelligence, `prebuilt-read` model.
    Azure,
    /// Adobe PDF Services Extract API.
    Adobe,
    /// Amazon Textract `DetectDocumentText`.
    Amazon,
    /// Google Document AI, general processor.
    Google,
    /// Google Document AI, bank/brokerage statement processor.
    GoogleStatement,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Local,
        Provider::Azure,
        Provider::Adobe,
        Provider::Amazon,
        Provider::Google,
        Provider::GoogleStatement,
    ];

    /// Canonical name used on the command line and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Azure => "azure",
            Provider::Adobe => "adobe",
            Provider::Amazon => "amazon",
            Provider::Google => "google",
            Provider::GoogleStatement => "google-statement",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let provider = match normalized.as_str() {
            "local" | "simpleparse" => Provider::Local,
            "azure" => Provider::Azure,
            "adobe" => Provider::Adobe,
            "amazon" | "textract" => Provider::Amazon,
            "google" => Provider::Google,
            "google-statement" | "googlestatement" => Provider::GoogleStatement,
            _ => return Err(ExtractError::InvalidProvider(s.to_string())),
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for p in Provider::ALL {
            assert_eq!(p.name().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn aliases_and_case() {
        assert_eq!("simpleParse".parse::<Provider>().unwrap(), Provider::Local);
        assert_eq!("AZURE".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!(
            "google_statement".parse::<Provider>().unwrap(),
            Provider::GoogleStatement
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "dropbox".parse::<Provider>().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidProvider(ref n) if n == "dropbox"));
    }
}
