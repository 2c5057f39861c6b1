//! Outcome of a destructive-action confirmation prompt.

use serde::Deserialize;

/// What the operator chose on a confirmation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_form_values() {
        let confirmed: Confirmation = serde_json::from_str(r#""confirmed""#).expect("decode");
        let cancelled: Confirmation = serde_json::from_str(r#""cancelled""#).expect("decode");
        assert!(confirmed.is_confirmed());
        assert!(!cancelled.is_confirmed());
    }
}
