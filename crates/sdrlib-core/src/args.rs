//! Device address grammar.
//!
//! A device address is a flat list of `key=value` pairs, for example
//! `redpitaya=192.168.1.100:1001,label='Red Pitaya Transceiver Server'`.
//! Pairs are separated by a space or a comma; a value wrapped in single
//! quotes may itself contain spaces and commas.
//!
//! [`DeviceArgs`] keeps keys unique and preserves first-insertion order so
//! that serialization is deterministic and `parse(serialize(args)) == args`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const QUOTE: char = '\'';
const PAIR_DELIM: char = '=';
const PAIRS_DELIM: char = ',';
const ARGS_DELIM: char = ' ';

/// Sentinel returned by [`DeviceArgs::to_pretty_string`] for an empty address.
pub const EMPTY_ADDRESS: &str = "Empty Device Address";

/// An ordered, key-unique mapping parsed from a device address string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceArgs {
    entries: Vec<(String, String)>,
}

impl DeviceArgs {
    /// Create an empty address.
    pub fn new() -> Self {
        DeviceArgs {
            entries: Vec::new(),
        }
    }

    /// Parse an address string.
    ///
    /// An empty or all-whitespace string yields an empty address. A token
    /// without `=`, an empty key, or an unbalanced quote is reported as
    /// [`Error::MalformedAddress`]. When a key repeats, the later value wins.
    ///
    /// # Example
    ///
    /// ```
    /// use sdrlib_core::DeviceArgs;
    ///
    /// let args = DeviceArgs::parse("redpitaya=10.0.0.2:1001 label='My Board'").unwrap();
    /// assert_eq!(args.get("redpitaya"), Some("10.0.0.2:1001"));
    /// assert_eq!(args.get("label"), Some("My Board"));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut args = DeviceArgs::new();
        for token in split_tokens(text)? {
            let (key, value) = parse_pair(token)?;
            args.insert(key, value)?;
        }
        Ok(args)
    }

    /// Look up the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build an address from `(key, value)` pairs, in order.
    ///
    /// Fails on the first key [`insert`](Self::insert) would reject.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut args = DeviceArgs::new();
        for (key, value) in pairs {
            args.insert(key, value)?;
        }
        Ok(args)
    }

    /// Insert or overwrite a pair.
    ///
    /// Overwriting keeps the key at its original position. Returns the
    /// previous value, if any. A key that is empty or contains `=`, `,`, a
    /// space or a quote could not be parsed back, and is rejected with
    /// [`Error::MalformedAddress`].
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>> {
        let key = key.into();
        check_key(&key)?;
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Ok(Some(std::mem::replace(existing, value))),
            None => {
                self.entries.push((key, value));
                Ok(None)
            }
        }
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the address has no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Multi-line, human-readable form.
    ///
    /// One-way: the output is meant for display and is not re-parsed.
    pub fn to_pretty_string(&self) -> String {
        if self.is_empty() {
            return EMPTY_ADDRESS.to_string();
        }

        let mut out = String::from("Device Address:\n");
        for (key, value) in self.iter() {
            out.push_str(&format!("    {key}: {value}\n"));
        }
        out
    }
}

/// Canonical serialized form: pairs joined with `,`, values containing a
/// space or comma wrapped in single quotes.
impl fmt::Display for DeviceArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "{PAIRS_DELIM}")?;
            }
            if value.contains([PAIRS_DELIM, ARGS_DELIM]) {
                write!(f, "{key}{PAIR_DELIM}{QUOTE}{value}{QUOTE}")?;
            } else {
                write!(f, "{key}{PAIR_DELIM}{value}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DeviceArgs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceArgs::parse(s)
    }
}

/// Split on unquoted delimiters, dropping empty tokens.
fn split_tokens(text: &str) -> Result<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut in_quote = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            QUOTE => in_quote = !in_quote,
            ARGS_DELIM | PAIRS_DELIM if !in_quote => {
                if i > start {
                    tokens.push(&text[start..i]);
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if in_quote {
        return Err(Error::MalformedAddress(format!(
            "unbalanced quote in '{text}'"
        )));
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    Ok(tokens)
}

/// Keys are never quoted, so they may not contain any delimiter.
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::MalformedAddress("empty key".to_string()));
    }
    if key.contains([QUOTE, PAIR_DELIM, PAIRS_DELIM, ARGS_DELIM]) {
        return Err(Error::MalformedAddress(format!(
            "key '{key}' contains a delimiter or quote"
        )));
    }
    Ok(())
}

fn parse_pair(token: &str) -> Result<(&str, &str)> {
    let (key, value) = token.split_once(PAIR_DELIM).ok_or_else(|| {
        Error::MalformedAddress(format!("token '{token}' has no '{PAIR_DELIM}'"))
    })?;

    check_key(key)?;

    let value = match value
        .strip_prefix(QUOTE)
        .and_then(|v| v.strip_suffix(QUOTE))
    {
        Some(inner) if !inner.contains(QUOTE) => inner,
        Some(_) => {
            return Err(Error::MalformedAddress(format!(
                "value '{value}' has a stray quote"
            )));
        }
        None if value.contains(QUOTE) => {
            return Err(Error::MalformedAddress(format!(
                "value '{value}' is not fully quoted"
            )));
        }
        None => value,
    };

    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_string_is_empty_address() {
        assert!(DeviceArgs::parse("").unwrap().is_empty());
        assert!(DeviceArgs::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn parse_space_separated_pairs() {
        let args = DeviceArgs::parse("rtl=0 redpitaya=10.0.0.2:1001").unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.get("rtl"), Some("0"));
        assert_eq!(args.get("redpitaya"), Some("10.0.0.2:1001"));
    }

    #[test]
    fn parse_comma_separated_pairs() {
        let args =
            DeviceArgs::parse("redpitaya=192.168.1.100:1001,label='Red Pitaya Transceiver Server'")
                .unwrap();
        assert_eq!(args.get("redpitaya"), Some("192.168.1.100:1001"));
        assert_eq!(args.get("label"), Some("Red Pitaya Transceiver Server"));
    }

    #[test]
    fn parse_preserves_insertion_order() {
        let args = DeviceArgs::parse("zeta=1 alpha=2 mid=3").unwrap();
        let keys: Vec<&str> = args.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_key_last_wins() {
        let args = DeviceArgs::parse("a=1 a=2").unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("a"), Some("2"));
    }

    #[test]
    fn duplicate_key_keeps_first_position() {
        let args = DeviceArgs::parse("a=1 b=2 a=3").unwrap();
        let pairs: Vec<(&str, &str)> = args.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn value_may_contain_pair_delimiter() {
        let args = DeviceArgs::parse("filter=key=value").unwrap();
        assert_eq!(args.get("filter"), Some("key=value"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let args = DeviceArgs::parse("fake=").unwrap();
        assert_eq!(args.get("fake"), Some(""));
    }

    #[test]
    fn token_without_equals_is_malformed() {
        let err = DeviceArgs::parse("a=1 bogus").unwrap_err();
        assert!(matches!(err, Error::MalformedAddress(_)));
    }

    #[test]
    fn empty_key_is_malformed() {
        assert!(matches!(
            DeviceArgs::parse("=value"),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn unbalanced_quote_is_malformed() {
        assert!(matches!(
            DeviceArgs::parse("label='Red Pitaya"),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn partially_quoted_value_is_malformed() {
        assert!(matches!(
            DeviceArgs::parse("label=Red'Pitaya Board'"),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn serialize_joins_with_commas() {
        let args = DeviceArgs::from_pairs([("redpitaya", "10.0.0.2:1001"), ("fake", "1")]).unwrap();
        assert_eq!(args.to_string(), "redpitaya=10.0.0.2:1001,fake=1");
    }

    #[test]
    fn serialize_quotes_values_with_space_or_comma() {
        let args =
            DeviceArgs::from_pairs([("label", "Red Pitaya"), ("list", "a,b"), ("plain", "x")])
                .unwrap();
        assert_eq!(args.to_string(), "label='Red Pitaya',list='a,b',plain=x");
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let original = DeviceArgs::from_pairs([
            ("redpitaya", "192.168.1.100:1001"),
            ("label", "Red Pitaya Transceiver Server"),
            ("channels", "0,1"),
            ("empty", ""),
            ("expr", "a=b"),
        ])
        .unwrap();

        let reparsed = DeviceArgs::parse(&original.to_string()).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn value_with_space_survives_round_trip() {
        let mut args = DeviceArgs::new();
        args.insert("label", "Lab bench receiver").unwrap();
        let reparsed: DeviceArgs = args.to_string().parse().unwrap();
        assert_eq!(reparsed.get("label"), Some("Lab bench receiver"));
    }

    #[test]
    fn keys_that_cannot_round_trip_are_rejected() {
        for key in ["serial number", "a=b", "", "list,of", "it's"] {
            let mut args = DeviceArgs::new();
            assert!(
                matches!(args.insert(key, "42"), Err(Error::MalformedAddress(_))),
                "key {key:?} was accepted"
            );
            assert!(args.is_empty());
        }

        assert!(matches!(
            DeviceArgs::from_pairs([("serial", "1"), ("serial number", "42")]),
            Err(Error::MalformedAddress(_))
        ));
    }

    #[test]
    fn pairs_round_trip_through_serialization() {
        let original = DeviceArgs::from_pairs([
            ("serial", "42 A"),
            ("driver", "redpitaya"),
            ("args", "a=b,c=d"),
        ])
        .unwrap();
        let reparsed = DeviceArgs::parse(&original.to_string()).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn insert_and_remove() {
        let mut args = DeviceArgs::new();
        assert_eq!(args.insert("a", "1").unwrap(), None);
        assert_eq!(args.insert("a", "2").unwrap(), Some("1".to_string()));
        assert!(args.contains_key("a"));
        assert_eq!(args.remove("a"), Some("2".to_string()));
        assert!(!args.contains_key("a"));
        assert_eq!(args.remove("a"), None);
    }

    #[test]
    fn pretty_string_empty_sentinel() {
        assert_eq!(DeviceArgs::new().to_pretty_string(), EMPTY_ADDRESS);
    }

    #[test]
    fn pretty_string_lists_entries() {
        let args = DeviceArgs::parse("redpitaya=10.0.0.2:1001 label='Bench'").unwrap();
        assert_eq!(
            args.to_pretty_string(),
            "Device Address:\n    redpitaya: 10.0.0.2:1001\n    label: Bench\n"
        );
    }
}
