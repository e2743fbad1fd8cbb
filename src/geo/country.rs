//! Call sign to country resolution.
//!
//! Countries are resolved by longest prefix match against a built-in table
//! of common amateur prefixes. The table can be extended (or overridden)
//! from a `prefix,country` CSV file.

use crate::error::AnalyticsResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Country reported for call signs no prefix matches.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Portable/mobile suffixes that never identify a country.
const OPERATING_SUFFIXES: &[&str] = &["P", "M", "MM", "AM", "QRP", "A", "B"];

const BUILTIN_PREFIXES: &[(&str, &str)] = &[
    // North America
    ("K", "United States"),
    ("W", "United States"),
    ("N", "United States"),
    ("AA", "United States"),
    ("AB", "United States"),
    ("AC", "United States"),
    ("AD", "United States"),
    ("AE", "United States"),
    ("AF", "United States"),
    ("AG", "United States"),
    ("AI", "United States"),
    ("AJ", "United States"),
    ("AK", "United States"),
    ("KL7", "Alaska"),
    ("KH6", "Hawaii"),
    ("KP4", "Puerto Rico"),
    ("VE", "Canada"),
    ("VA", "Canada"),
    ("VO", "Canada"),
    ("VY", "Canada"),
    ("XE", "Mexico"),
    ("CO", "Cuba"),
    ("OX", "Greenland"),
    // British Isles
    ("G", "England"),
    ("M", "England"),
    ("2E", "England"),
    ("GM", "Scotland"),
    ("MM", "Scotland"),
    ("2M", "Scotland"),
    ("GW", "Wales"),
    ("MW", "Wales"),
    ("2W", "Wales"),
    ("GI", "Northern Ireland"),
    ("MI", "Northern Ireland"),
    ("2I", "Northern Ireland"),
    ("GD", "Isle of Man"),
    ("MD", "Isle of Man"),
    ("GJ", "Jersey"),
    ("MJ", "Jersey"),
    ("GU", "Guernsey"),
    ("MU", "Guernsey"),
    ("EI", "Ireland"),
    ("EJ", "Ireland"),
    // Europe
    ("F", "France"),
    ("DL", "Germany"),
    ("DA", "Germany"),
    ("DB", "Germany"),
    ("DC", "Germany"),
    ("DD", "Germany"),
    ("DF", "Germany"),
    ("DG", "Germany"),
    ("DH", "Germany"),
    ("DJ", "Germany"),
    ("DK", "Germany"),
    ("DM", "Germany"),
    ("DO", "Germany"),
    ("I", "Italy"),
    ("EA", "Spain"),
    ("EB", "Spain"),
    ("EC", "Spain"),
    ("EA8", "Canary Islands"),
    ("CT", "Portugal"),
    ("PA", "Netherlands"),
    ("PB", "Netherlands"),
    ("PD", "Netherlands"),
    ("PE", "Netherlands"),
    ("PH", "Netherlands"),
    ("ON", "Belgium"),
    ("OO", "Belgium"),
    ("OQ", "Belgium"),
    ("OR", "Belgium"),
    ("OT", "Belgium"),
    ("LX", "Luxembourg"),
    ("OZ", "Denmark"),
    ("SM", "Sweden"),
    ("SA", "Sweden"),
    ("SE", "Sweden"),
    ("SK", "Sweden"),
    ("LA", "Norway"),
    ("LB", "Norway"),
    ("LC", "Norway"),
    ("OH", "Finland"),
    ("OF", "Finland"),
    ("OG", "Finland"),
    ("TF", "Iceland"),
    ("SP", "Poland"),
    ("SN", "Poland"),
    ("SO", "Poland"),
    ("SQ", "Poland"),
    ("SR", "Poland"),
    ("3Z", "Poland"),
    ("OK", "Czech Republic"),
    ("OL", "Czech Republic"),
    ("OM", "Slovakia"),
    ("HA", "Hungary"),
    ("HG", "Hungary"),
    ("OE", "Austria"),
    ("HB", "Switzerland"),
    ("HB0", "Liechtenstein"),
    ("YO", "Romania"),
    ("YP", "Romania"),
    ("YQ", "Romania"),
    ("YR", "Romania"),
    ("LZ", "Bulgaria"),
    ("SV", "Greece"),
    ("SW", "Greece"),
    ("SX", "Greece"),
    ("SY", "Greece"),
    ("SZ", "Greece"),
    ("9A", "Croatia"),
    ("S5", "Slovenia"),
    ("YU", "Serbia"),
    ("ES", "Estonia"),
    ("YL", "Latvia"),
    ("LY", "Lithuania"),
    ("UR", "Ukraine"),
    ("US", "Ukraine"),
    ("UT", "Ukraine"),
    ("UX", "Ukraine"),
    ("UY", "Ukraine"),
    ("UZ", "Ukraine"),
    ("EM", "Ukraine"),
    ("EN", "Ukraine"),
    ("EO", "Ukraine"),
    ("R", "Russia"),
    ("UA", "Russia"),
    ("UB", "Russia"),
    ("UC", "Russia"),
    ("UD", "Russia"),
    ("UE", "Russia"),
    ("UF", "Russia"),
    ("UG", "Russia"),
    ("UH", "Russia"),
    ("UI", "Russia"),
    ("TA", "Turkey"),
    ("TC", "Turkey"),
    // Asia and Oceania
    ("JA", "Japan"),
    ("JE", "Japan"),
    ("JF", "Japan"),
    ("JG", "Japan"),
    ("JH", "Japan"),
    ("JI", "Japan"),
    ("JJ", "Japan"),
    ("JK", "Japan"),
    ("JL", "Japan"),
    ("JM", "Japan"),
    ("JN", "Japan"),
    ("JO", "Japan"),
    ("JP", "Japan"),
    ("JQ", "Japan"),
    ("JR", "Japan"),
    ("JS", "Japan"),
    ("7J", "Japan"),
    ("7K", "Japan"),
    ("7L", "Japan"),
    ("7M", "Japan"),
    ("7N", "Japan"),
    ("HL", "South Korea"),
    ("DS", "South Korea"),
    ("BY", "China"),
    ("BA", "China"),
    ("BD", "China"),
    ("BG", "China"),
    ("BH", "China"),
    ("BV", "Taiwan"),
    ("VU", "India"),
    ("4X", "Israel"),
    ("4Z", "Israel"),
    ("A6", "United Arab Emirates"),
    ("HS", "Thailand"),
    ("9M2", "West Malaysia"),
    ("9V", "Singapore"),
    ("DU", "Philippines"),
    ("YB", "Indonesia"),
    ("VK", "Australia"),
    ("ZL", "New Zealand"),
    // Africa and South America
    ("ZS", "South Africa"),
    ("PY", "Brazil"),
    ("PP", "Brazil"),
    ("PQ", "Brazil"),
    ("PR", "Brazil"),
    ("PS", "Brazil"),
    ("PT", "Brazil"),
    ("PU", "Brazil"),
    ("LU", "Argentina"),
    ("CE", "Chile"),
    ("CX", "Uruguay"),
    ("OA", "Peru"),
    ("HK", "Colombia"),
    ("YV", "Venezuela"),
];

#[derive(Debug, Deserialize)]
struct PrefixRow {
    prefix: String,
    country: String,
}

/// Longest-prefix call sign to country table.
#[derive(Debug, Clone)]
pub struct CountryLookup {
    prefixes: HashMap<String, String>,
    max_len: usize,
}

impl CountryLookup {
    /// The built-in prefix table.
    pub fn builtin() -> Self {
        let mut lookup = Self {
            prefixes: HashMap::new(),
            max_len: 0,
        };
        for (prefix, country) in BUILTIN_PREFIXES {
            lookup.insert(prefix, country);
        }
        lookup
    }

    /// The built-in table extended with entries from a `prefix,country` CSV file.
    ///
    /// File entries replace built-in ones with the same prefix.
    pub fn with_prefix_file(path: &Path) -> AnalyticsResult<Self> {
        let mut lookup = Self::builtin();
        let mut reader = csv::Reader::from_path(path)?;
        let mut added = 0usize;

        for row in reader.deserialize::<PrefixRow>() {
            let row = row?;
            lookup.insert(&row.prefix, &row.country);
            added += 1;
        }

        debug!("Loaded {} country prefixes from {}", added, path.display());
        Ok(lookup)
    }

    fn insert(&mut self, prefix: &str, country: &str) {
        let prefix = prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() {
            return;
        }
        self.max_len = self.max_len.max(prefix.len());
        self.prefixes.insert(prefix, country.trim().to_string());
    }

    /// Resolve a call sign to a country name, or [`UNKNOWN_COUNTRY`].
    pub fn country_for(&self, call_sign: &str) -> String {
        let call = identifying_part(call_sign);
        let longest = self.max_len.min(call.len());

        (1..=longest)
            .rev()
            .find_map(|len| call.get(..len).and_then(|p| self.prefixes.get(p)))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }
}

/// Pick the segment of a compound call sign (`EA8/G4ABC/P`) that carries the prefix.
fn identifying_part(call_sign: &str) -> String {
    let upper = call_sign.trim().to_ascii_uppercase();
    let segments: Vec<&str> = upper
        .split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !OPERATING_SUFFIXES.contains(s))
        .filter(|s| !(s.len() == 1 && s.chars().all(|c| c.is_ascii_digit())))
        .collect();

    match segments.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        many => many
            .iter()
            .min_by_key(|s| s.len())
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}
