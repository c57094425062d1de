//! # Endpoint Access Codec
//!
//! Fixed-length base-36 codec mapping each health endpoint to a
//! {get, head, visible} flag triple. A seven character configuration string
//! carries the exposure policy for the whole endpoint surface; the routing
//! layer consumes the decoded map to decide which endpoints it mounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VitalsError};

/// Endpoints enumerate in this fixed order; the encoded string is positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthEndpoint {
    Default,
    Live,
    Ready,
    Health,
    Dependencies,
    Metrics,
    Version,
}

impl HealthEndpoint {
    pub const ALL: [HealthEndpoint; 7] = [
        HealthEndpoint::Default,
        HealthEndpoint::Live,
        HealthEndpoint::Ready,
        HealthEndpoint::Health,
        HealthEndpoint::Dependencies,
        HealthEndpoint::Metrics,
        HealthEndpoint::Version,
    ];
}

/// Exposure flags for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndpointAccess {
    /// GET requests are served
    pub get: bool,
    /// HEAD requests are served
    pub head: bool,
    /// Endpoint is listed in generated API documentation
    pub visible: bool,
}

impl EndpointAccess {
    pub const fn new(get: bool, head: bool, visible: bool) -> Self {
        Self { get, head, visible }
    }
}

/// Map from endpoint to its exposure flags, as decoded from configuration.
pub type EndpointAccessMap = BTreeMap<HealthEndpoint, EndpointAccess>;

/// Default exposure policy: everything enabled except metrics and version
/// documentation visibility.
pub const DEFAULT_ACCESS_STRING: &str = "6666644";

const ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The seven legal flag triples, indexed by their encoded digit. Visible
/// without either verb (F,F,T) is not servable and has no digit.
const ACCESS_TABLE: [EndpointAccess; 7] = [
    EndpointAccess::new(false, false, false),
    EndpointAccess::new(true, false, false),
    EndpointAccess::new(false, true, false),
    EndpointAccess::new(true, true, false),
    EndpointAccess::new(true, false, true),
    EndpointAccess::new(false, true, true),
    EndpointAccess::new(true, true, true),
];

/// Decode an encoded access string into a full endpoint map.
///
/// Normalization: shorter inputs are right-padded with '0', longer inputs are
/// truncated to seven characters. Characters are upper-cased before lookup.
/// Any character outside the base-36 alphabet, or any base-36 digit above 6,
/// fails with [`VitalsError::InvalidAccessEncoding`].
pub fn decode(encoded: &str) -> Result<EndpointAccessMap> {
    let normalized: Vec<char> = encoded
        .chars()
        .chain(std::iter::repeat('0'))
        .take(HealthEndpoint::ALL.len())
        .collect();

    let mut map = EndpointAccessMap::new();
    for (position, (endpoint, ch)) in HealthEndpoint::ALL.iter().zip(normalized).enumerate() {
        let upper = ch.to_ascii_uppercase();
        let index = ALPHABET.find(upper).ok_or_else(|| {
            VitalsError::InvalidAccessEncoding {
                reason: format!("unknown symbol '{ch}' at position {position}"),
            }
        })?;
        let access = ACCESS_TABLE.get(index).copied().ok_or_else(|| {
            VitalsError::InvalidAccessEncoding {
                reason: format!("digit '{upper}' at position {position} is outside 0-6"),
            }
        })?;
        map.insert(*endpoint, access);
    }
    Ok(map)
}

/// Encode an endpoint map back into its configuration string.
///
/// Exact inverse of [`decode`]: each endpoint's triple must match one of the
/// seven table entries. Endpoints absent from the map encode as all-false.
pub fn encode(map: &EndpointAccessMap) -> Result<String> {
    let mut encoded = String::with_capacity(HealthEndpoint::ALL.len());
    for endpoint in &HealthEndpoint::ALL {
        let access = map.get(endpoint).copied().unwrap_or_default();
        let index = ACCESS_TABLE
            .iter()
            .position(|candidate| *candidate == access)
            .ok_or(VitalsError::InvalidAccessCombination {
                get: access.get,
                head: access.head,
                visible: access.visible,
            })?;
        // Table indices are 0-6, so the digit is always a single ASCII char.
        encoded.push(char::from(b'0' + index as u8));
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_decodes_to_all_flags_false() {
        let map = decode("").unwrap();
        assert_eq!(map.len(), 7);
        assert!(map.values().all(|a| !a.get && !a.head && !a.visible));
        assert_eq!(encode(&map).unwrap(), "0000000");
    }

    #[test]
    fn short_input_is_right_padded() {
        let map = decode("1").unwrap();
        assert_eq!(
            map[&HealthEndpoint::Default],
            EndpointAccess::new(true, false, false)
        );
        assert_eq!(map[&HealthEndpoint::Live], EndpointAccess::default());
        assert_eq!(encode(&map).unwrap(), "1000000");
    }

    #[test]
    fn long_input_is_truncated() {
        let map = decode(&"1".repeat(18)).unwrap();
        assert_eq!(encode(&map).unwrap(), "1111111");
    }

    #[test]
    fn default_string_enables_everything_but_doc_visibility_of_tail() {
        let map = decode(DEFAULT_ACCESS_STRING).unwrap();
        assert_eq!(
            map[&HealthEndpoint::Default],
            EndpointAccess::new(true, true, true)
        );
        assert_eq!(
            map[&HealthEndpoint::Metrics],
            EndpointAccess::new(true, false, true)
        );
        assert_eq!(
            map[&HealthEndpoint::Version],
            EndpointAccess::new(true, false, true)
        );
    }

    #[test]
    fn letters_upper_case_to_out_of_range_digits() {
        // 'x' upper-cases to 'X', a legal base-36 digit (33) outside 0-6.
        assert!(matches!(
            decode("x"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
        assert!(matches!(
            decode("X"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
    }

    #[test]
    fn valid_base36_digits_above_six_are_rejected() {
        assert!(matches!(
            decode("7"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
        assert!(matches!(
            decode("6666647"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
        assert!(matches!(
            decode("A"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        assert!(matches!(
            decode("!"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
        assert!(matches!(
            decode("66 6644"),
            Err(VitalsError::InvalidAccessEncoding { .. })
        ));
    }

    #[test]
    fn visible_without_a_verb_cannot_encode() {
        let mut map = decode("0000000").unwrap();
        map.insert(
            HealthEndpoint::Health,
            EndpointAccess::new(false, false, true),
        );
        assert!(matches!(
            encode(&map),
            Err(VitalsError::InvalidAccessCombination { .. })
        ));
    }

    proptest! {
        #[test]
        fn round_trip_law(digits in proptest::collection::vec(0u32..=6, 7)) {
            let encoded: String = digits
                .iter()
                .map(|d| char::from_digit(*d, 36).unwrap())
                .collect();
            let map = decode(&encoded).unwrap();
            prop_assert_eq!(encode(&map).unwrap(), encoded);
            prop_assert_eq!(decode(&encode(&map).unwrap()).unwrap(), map);
        }
    }
}
