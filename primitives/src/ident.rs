//! Identifier sanitisation (spec 4.1, Design Notes 9). Every string
//! identifier that gets interpolated into an event query or a Gno source
//! template must pass through here first, to prevent query/template
//! injection (spec 8, scenario 6).

use crate::error::Error;

/// `[A-Za-z0-9._-/]` — deliberately conservative; IBC identifiers never
/// need anything outside this class.
pub fn validate_identifier(id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::Protocol("empty identifier".into()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/');
    if id.chars().all(allowed) {
        Ok(())
    } else {
        Err(Error::Protocol(format!("identifier {id:?} contains disallowed characters")))
    }
}

pub fn validate_all<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<(), Error> {
    for id in ids {
        validate_identifier(id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_ibc_identifiers() {
        assert!(validate_identifier("07-tendermint-0").is_ok());
        assert!(validate_identifier("transfer/channel-0").is_ok());
        assert!(validate_identifier("connection-12").is_ok());
    }

    #[test]
    fn rejects_injection_attempt() {
        // spec 8 scenario 6
        assert!(validate_identifier("07-tendermint-0' OR 1=1 --").is_err());
    }

    #[test]
    fn rejects_empty_identifier() {
        assert!(validate_identifier("").is_err());
    }
}
