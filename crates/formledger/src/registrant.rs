//! The registrant record persisted by the record store.

use serde::{Deserialize, Serialize};

/// One successful registration, in registrations-file column order.
///
/// Field renames match the file header so the same type reads and writes
/// rows. The password is stored as submitted.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registrant {
    /// Chosen user name.
    #[serde(rename = "User Name")]
    pub username: String,

    /// Password as entered on the form.
    #[serde(rename = "Password")]
    pub password: String,

    /// Contact email.
    #[serde(rename = "Email")]
    pub email: String,

    /// Contact phone number.
    #[serde(rename = "Phone No.")]
    pub phone: String,

    /// Gender as entered.
    #[serde(rename = "Gender")]
    pub gender: String,

    /// Date of birth, unparsed.
    #[serde(rename = "Date of Birth")]
    pub dob: String,
}

impl std::fmt::Debug for Registrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrant")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("dob", &self.dob)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Registrant {
        Registrant {
            username: "alice".to_string(),
            password: "p1".to_string(),
            email: "a@x.com".to_string(),
            phone: "555".to_string(),
            gender: "F".to_string(),
            dob: "2000-01-01".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug_str = format!("{:?}", alice());
        assert!(debug_str.contains("alice"));
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("p1"));
    }

    #[test]
    fn test_serialize_uses_header_names() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["User Name"], "alice");
        assert_eq!(json["Phone No."], "555");
        assert_eq!(json["Date of Birth"], "2000-01-01");
    }
}
