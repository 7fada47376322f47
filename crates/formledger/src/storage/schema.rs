//! Layout of the registrations file.

/// Header row of the registrations file, in column order.
pub const REGISTRATION_HEADER: [&str; 6] = [
    "User Name",
    "Password",
    "Email",
    "Phone No.",
    "Gender",
    "Date of Birth",
];

/// Record terminator used for every row written.
pub const ROW_TERMINATOR: u8 = b'\n';

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registrant;

    #[test]
    fn test_header_matches_registrant_fields() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(Registrant::default()).unwrap();
        let bytes = writer.into_inner().unwrap();
        let first_line = String::from_utf8(bytes).unwrap();
        let first_line = first_line.lines().next().unwrap().to_string();

        assert_eq!(first_line, REGISTRATION_HEADER.join(","));
    }
}
