//! Bidirectional mapping between closed enums and their wire tokens

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// An enum with a fixed, fully enumerable set of members
pub trait CodecEnum: Copy + Ord + fmt::Debug + 'static {
    /// Human readable name used in construction errors
    const NAME: &'static str;

    /// Every member of the enum
    const ALL: &'static [Self];
}

/// Immutable value <-> token table for one enum type.
///
/// Both directions are ordered maps, so lookups are O(log n). Token matching
/// is exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct EnumCodec<E: CodecEnum> {
    tokens: BTreeMap<E, &'static str>,
    values: BTreeMap<&'static str, E>,
}

impl<E: CodecEnum> EnumCodec<E> {
    /// Build a codec from one `(value, token)` pair per enum member.
    ///
    /// Fails if a value or token appears twice, or if any member of
    /// `E::ALL` is left without a token.
    pub fn new(pairs: &[(E, &'static str)]) -> Result<Self> {
        let mut tokens = BTreeMap::new();
        let mut values = BTreeMap::new();

        for &(value, token) in pairs {
            if tokens.insert(value, token).is_some() {
                return Err(Error::DuplicateValue {
                    enum_name: E::NAME,
                    value: format!("{:?}", value),
                });
            }
            if values.insert(token, value).is_some() {
                return Err(Error::DuplicateToken {
                    enum_name: E::NAME,
                    token,
                });
            }
        }

        if let Some(missing) = E::ALL.iter().find(|v| !tokens.contains_key(*v)) {
            return Err(Error::MissingToken {
                enum_name: E::NAME,
                value: format!("{:?}", missing),
            });
        }

        Ok(Self { tokens, values })
    }

    /// Look up the value for an exact token
    pub fn decode(&self, token: &str) -> Option<E> {
        self.values.get(token).copied()
    }

    /// Canonical token for a value
    pub fn encode(&self, value: E) -> &'static str {
        // totality is checked in new()
        self.tokens[&value]
    }

    /// All tokens in value order
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tokens.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Fruit {
        Apple,
        Pear,
        Plum,
    }

    impl CodecEnum for Fruit {
        const NAME: &'static str = "fruit";
        const ALL: &'static [Self] = &[Fruit::Apple, Fruit::Pear, Fruit::Plum];
    }

    fn fruit_codec() -> EnumCodec<Fruit> {
        EnumCodec::new(&[
            (Fruit::Plum, "plum"),
            (Fruit::Apple, "apple"),
            (Fruit::Pear, "pear"),
        ])
        .unwrap()
    }

    #[test]
    fn test_decode_exact_match() {
        let codec = fruit_codec();
        assert_eq!(codec.decode("pear"), Some(Fruit::Pear));
        assert_eq!(codec.decode("Pear"), None);
        assert_eq!(codec.decode("pear "), None);
        assert_eq!(codec.decode(""), None);
    }

    #[test]
    fn test_encode_every_member() {
        let codec = fruit_codec();
        for &fruit in Fruit::ALL {
            assert_eq!(codec.decode(codec.encode(fruit)), Some(fruit));
        }
    }

    #[test]
    fn test_tokens_follow_value_order() {
        let codec = fruit_codec();
        let tokens: Vec<_> = codec.tokens().collect();
        assert_eq!(tokens, vec!["apple", "pear", "plum"]);
    }

    #[test]
    fn test_missing_member_fails() {
        let err = EnumCodec::new(&[(Fruit::Apple, "apple"), (Fruit::Pear, "pear")]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingToken {
                enum_name: "fruit",
                value: "Plum".into()
            }
        );
    }

    #[test]
    fn test_duplicate_token_fails() {
        let err = EnumCodec::new(&[
            (Fruit::Apple, "apple"),
            (Fruit::Pear, "apple"),
            (Fruit::Plum, "plum"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateToken { token: "apple", .. }));
    }

    #[test]
    fn test_duplicate_value_fails() {
        let err = EnumCodec::new(&[
            (Fruit::Apple, "apple"),
            (Fruit::Apple, "green-apple"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateValue { .. }));
    }
}
