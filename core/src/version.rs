use semver::Version;

/// Parses engine versions the way the RDS API reports them. RDS version
/// strings are frequently partial (`"12"`, `"5.7"`, `"10.4.13"`); missing
/// components are padded with zeroes before handing off to semver.
pub fn parse_lenient(version: &str) -> Result<Version, semver::Error> {
    let trimmed = version.trim();
    let dots = trimmed.chars().filter(|c| *c == '.').count();
    match dots {
        0 => Version::parse(&format!("{trimmed}.0.0")),
        1 => Version::parse(&format!("{trimmed}.0")),
        _ => Version::parse(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_partial_versions() {
        assert_eq!(parse_lenient("12").unwrap(), Version::new(12, 0, 0));
        assert_eq!(parse_lenient("5.7").unwrap(), Version::new(5, 7, 0));
        assert_eq!(parse_lenient("10.4.13").unwrap(), Version::new(10, 4, 13));
    }

    #[test]
    fn compares_across_majors() {
        assert!(parse_lenient("12.7").unwrap() > parse_lenient("12").unwrap());
        assert!(parse_lenient("10.21").unwrap() < parse_lenient("12.2").unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_lenient("banana").is_err());
        assert!(parse_lenient("").is_err());
    }
}
