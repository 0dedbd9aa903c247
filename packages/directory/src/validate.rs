//! Pure roster-row validation.
//!
//! No I/O: every rule here runs against an already-parsed
//! [`ProfessionalRow`], so rosters can be checked before a single
//! request goes out. Name, email, and trade are required; the email
//! must look like an address; experience, when given, must fit a
//! plausible working lifetime.

use std::sync::LazyLock;

use regex::Regex;

use crate::ProfessionalRow;

/// Upper bound for the `experiencia` column, in years.
pub const MAX_EXPERIENCE_YEARS: u32 = 70;

/// Shape check only; deliverability is the platform's problem.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

/// Whether the text has the shape of an email address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Checks one row against the intake rules.
///
/// Returns every violation found, in a fixed order; an empty result
/// means the row may be uploaded.
#[must_use]
pub fn validate_row(row: &ProfessionalRow) -> Vec<String> {
    let mut problems = Vec::new();

    if row.name.trim().is_empty() {
        problems.push("nombre is required".to_owned());
    }
    if row.email.trim().is_empty() {
        problems.push("email is required".to_owned());
    } else if !is_valid_email(row.email.trim()) {
        problems.push(format!("email '{}' is not a valid address", row.email));
    }
    if row.trade.trim().is_empty() {
        problems.push("rubro is required".to_owned());
    }
    if let Some(years) = row.years_experience
        && years > MAX_EXPERIENCE_YEARS
    {
        problems.push(format!(
            "experiencia of {years} years is out of range (0-{MAX_EXPERIENCE_YEARS})"
        ));
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ProfessionalRow {
        ProfessionalRow {
            name: "Juan Pérez".to_owned(),
            email: "juan@example.com".to_owned(),
            phone: Some("3491-555123".to_owned()),
            trade: "Electricista".to_owned(),
            years_experience: Some(12),
            license_number: Some("EL-204".to_owned()),
        }
    }

    #[test]
    fn accepts_complete_row() {
        assert!(validate_row(&row()).is_empty());
    }

    #[test]
    fn accepts_row_without_optional_fields() {
        let row = ProfessionalRow {
            phone: None,
            years_experience: None,
            license_number: None,
            ..row()
        };
        assert!(validate_row(&row).is_empty());
    }

    #[test]
    fn rejects_missing_required_fields() {
        let row = ProfessionalRow {
            name: "   ".to_owned(),
            email: String::new(),
            trade: String::new(),
            ..row()
        };

        let problems = validate_row(&row);

        assert_eq!(
            problems,
            vec![
                "nombre is required".to_owned(),
                "email is required".to_owned(),
                "rubro is required".to_owned(),
            ]
        );
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["sin-arroba.com", "doble@@example.com", "a@b", "juan@"] {
            let row = ProfessionalRow {
                email: email.to_owned(),
                ..row()
            };
            assert_eq!(validate_row(&row).len(), 1, "email: {email}");
        }
    }

    #[test]
    fn accepts_plus_and_dots_in_email() {
        assert!(is_valid_email("juan.perez+obras@sub.example.com"));
    }

    #[test]
    fn rejects_out_of_range_experience() {
        let row = ProfessionalRow {
            years_experience: Some(MAX_EXPERIENCE_YEARS + 1),
            ..row()
        };

        let problems = validate_row(&row);

        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("out of range"));
    }

    #[test]
    fn boundary_experience_is_accepted() {
        let row = ProfessionalRow {
            years_experience: Some(MAX_EXPERIENCE_YEARS),
            ..row()
        };
        assert!(validate_row(&row).is_empty());
    }
}
