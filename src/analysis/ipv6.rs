//! IPv6 address grammar shared by the query literal pass and the analyzer
//!
//! Alternatives are ordered longest shape first because the regex engine
//! picks the first alternative that matches at a position, not the longest.

use regex::Regex;
use std::sync::OnceLock;

const H16: &str = "[0-9a-fA-F]{1,4}";
const IPV4: &str = r"((25[0-5]|(2[0-4]|1?[0-9])?[0-9])\.){3}(25[0-5]|(2[0-4]|1?[0-9])?[0-9])";
const CIDR_SUFFIX: &str = "(/(12[0-8]|1[0-1][0-9]|[1-9][0-9]|[0-9]))?";

/// Alternation of every supported address shape
pub fn ipv6_pattern() -> String {
    let shapes = [
        // 1:2:3:4:5:6:7:8
        format!("({H16}:){{7}}{H16}"),
        // ::ffff:10.0.0.1, ::10.0.0.1
        format!("::(ffff(:0{{1,4}})?:)?{IPV4}"),
        // 64:ff9b::10.0.0.1
        format!("({H16}:){{1,4}}:{IPV4}"),
        // fe80::1%eth0
        format!("fe80:(:[0-9a-fA-F]{{0,4}}){{0,4}}%[0-9a-zA-Z]+"),
        // compressed forms, most trailing groups first
        format!("{H16}:(:{H16}){{1,6}}"),
        format!("({H16}:){{1,2}}(:{H16}){{1,5}}"),
        format!("({H16}:){{1,3}}(:{H16}){{1,4}}"),
        format!("({H16}:){{1,4}}(:{H16}){{1,3}}"),
        format!("({H16}:){{1,5}}(:{H16}){{1,2}}"),
        format!("({H16}:){{1,6}}:{H16}"),
        // ::2:3:4:5:6:7:8, ::
        format!(":((:{H16}){{1,7}}|:)"),
        // 1::, 1:2:3:4:5:6:7::
        format!("({H16}:){{1,7}}:"),
    ];

    format!("({})", shapes.join("|"))
}

/// Address with an optional `/prefix` suffix
pub fn ipv6_with_cidr_pattern() -> String {
    format!("{}{}", ipv6_pattern(), CIDR_SUFFIX)
}

/// Compiled address-with-CIDR matcher
pub fn ipv6_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&ipv6_with_cidr_pattern()).unwrap_or_else(|e| panic!("invalid IPv6 grammar: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whole_match(input: &str) -> Option<&str> {
        ipv6_regex().find(input).map(|m| m.as_str())
    }

    #[test]
    fn test_full_address() {
        assert_eq!(
            whole_match("2a02:5180:0:2669:ffff:ffff:ffff:ffff"),
            Some("2a02:5180:0:2669:ffff:ffff:ffff:ffff")
        );
    }

    #[test]
    fn test_compressed_addresses() {
        assert_eq!(whole_match("2001:db8::1"), Some("2001:db8::1"));
        assert_eq!(whole_match("2001:db8::1:2"), Some("2001:db8::1:2"));
        assert_eq!(whole_match("fe80::"), Some("fe80::"));
        assert_eq!(whole_match("::1"), Some("::1"));
        assert_eq!(whole_match("::"), Some("::"));
    }

    #[test]
    fn test_embedded_ipv4_and_zone() {
        assert_eq!(whole_match("::ffff:10.0.0.1"), Some("::ffff:10.0.0.1"));
        assert_eq!(whole_match("fe80::1%eth0"), Some("fe80::1%eth0"));
    }

    #[test]
    fn test_cidr_suffix() {
        assert_eq!(whole_match("2001:db8::/64"), Some("2001:db8::/64"));
        assert_eq!(whole_match("2001:db8::/128"), Some("2001:db8::/128"));
    }

    #[test]
    fn test_plain_words_do_not_match() {
        assert_eq!(whole_match("title:word"), None);
        assert_eq!(whole_match("2a02\\:5180\\:0"), None);
    }
}
