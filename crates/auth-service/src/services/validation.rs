//! Input validation and normalization for registration and login.

use crate::config::MAX_PASSWORD_LENGTH;
use crate::errors::AuthError;

const ORG_NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=100;
const PERSON_NAME_LENGTH: std::ops::RangeInclusive<usize> = 1..=50;
const MAX_PHONE_LENGTH: usize = 32;

/// Registration fields after trimming and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub organization_name: String,
    pub slug: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Lowercase and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic structural check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let (local, domain) = match (parts.first(), parts.get(1)) {
        (Some(l), Some(d)) => (*l, *d),
        _ => return false,
    };

    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }

    domain_parts.iter().all(|p| !p.is_empty())
}

/// URL-friendly slug: lowercase, runs of non-alphanumerics collapsed to `-`,
/// leading and trailing `-` trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Check password length in bytes against `min_length..=72`.
pub fn validate_password(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.len() < min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

fn validate_length(
    field: &str,
    value: &str,
    range: std::ops::RangeInclusive<usize>,
) -> Result<String, AuthError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if !range.contains(&len) {
        return Err(AuthError::Validation(format!(
            "{field} must be between {} and {} characters",
            range.start(),
            range.end()
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize registration fields (the password is checked separately).
pub fn validate_registration(
    organization_name: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    phone: Option<&str>,
) -> Result<ValidatedRegistration, AuthError> {
    let organization_name =
        validate_length("Organization name", organization_name, ORG_NAME_LENGTH)?;
    let slug = slugify(&organization_name);
    if slug.is_empty() {
        return Err(AuthError::Validation(
            "Organization name must contain at least one letter or digit".to_string(),
        ));
    }

    let first_name = validate_length("First name", first_name, PERSON_NAME_LENGTH)?;
    let last_name = validate_length("Last name", last_name, PERSON_NAME_LENGTH)?;

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email format".to_string()));
    }

    let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if p.chars().count() > MAX_PHONE_LENGTH => {
            return Err(AuthError::Validation(format!(
                "Phone must be at most {MAX_PHONE_LENGTH} characters"
            )));
        }
        other => other.map(ToString::to_string),
    };

    Ok(ValidatedRegistration {
        organization_name,
        slug,
        first_name,
        last_name,
        email,
        phone,
    })
}
