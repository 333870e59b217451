//! Field-level input checks shared by the entity constructors.

use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 30;
pub const USERNAME_MIN_CHARS: usize = 2;

/// Trims `value` and rejects it when nothing is left.
pub fn required_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn title(value: &str) -> Result<String, DomainError> {
    let title = required_text("title", value)?;
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(title)
}

pub fn username(value: &str) -> Result<String, DomainError> {
    let username = required_text("username", value)?;
    if username.chars().count() < USERNAME_MIN_CHARS {
        return Err(DomainError::validation(
            "username",
            format!("must be at least {USERNAME_MIN_CHARS} characters"),
        ));
    }
    Ok(username)
}

/// Optional references such as image keys: blank collapses to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn email(value: &str) -> Result<String, DomainError> {
    let email = required_text("email", value)?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email", "is not a valid address"));
    }
    Ok(email)
}

pub fn pet_age(age: u32) -> Result<u32, DomainError> {
    if age == 0 {
        return Err(DomainError::validation("age", "must be a positive number"));
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_counts_characters_not_bytes() {
        assert!(title(&"é".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(title(&"a".repeat(TITLE_MAX_CHARS + 1)).is_err());
        assert_eq!(title("  Staring problem  ").as_deref(), Ok("Staring problem"));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            required_text("text", " \n\t"),
            Err(DomainError::validation("text", "must not be empty"))
        );
    }

    #[test]
    fn username_needs_two_characters() {
        assert!(username("x").is_err());
        assert_eq!(username(" jo ").as_deref(), Ok("jo"));
    }

    #[test]
    fn email_shapes() {
        assert_eq!(email(" Owner@Example.com ").as_deref(), Ok("owner@example.com"));
        for bad in ["", "owner", "@example.com", "owner@", "owner@example", "a b@example.com"] {
            assert!(email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" cat.png ")).as_deref(), Some("cat.png"));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn zero_age_is_rejected() {
        assert!(pet_age(0).is_err());
        assert_eq!(pet_age(3), Ok(3));
    }
}
