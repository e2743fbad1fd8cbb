//! Maidenhead locator decoding and great-circle distances.

/// Mean Earth radius in km (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.009;

/// Centre of a Maidenhead grid square, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GridLocation {
    /// Decode a 2, 4 or 6 character locator (`IO`, `IO91`, `IO91wm`).
    ///
    /// Longer locators are truncated to 6 characters. Returns `None` for
    /// anything that is not a well-formed locator.
    pub fn parse(locator: &str) -> Option<Self> {
        let chars: Vec<char> = locator.trim().chars().take(6).collect();
        if !matches!(chars.len(), 2 | 4 | 6) {
            return None;
        }

        let field_lon = field_index(chars[0])?;
        let field_lat = field_index(chars[1])?;
        let mut lon = field_lon * 20.0 - 180.0;
        let mut lat = field_lat * 10.0 - 90.0;
        let (mut cell_lon, mut cell_lat) = (20.0, 10.0);

        if chars.len() >= 4 {
            lon += chars[2].to_digit(10)? as f64 * 2.0;
            lat += chars[3].to_digit(10)? as f64;
            cell_lon = 2.0;
            cell_lat = 1.0;
        }

        if chars.len() == 6 {
            lon += subsquare_index(chars[4])? * (2.0 / 24.0);
            lat += subsquare_index(chars[5])? * (1.0 / 24.0);
            cell_lon = 2.0 / 24.0;
            cell_lat = 1.0 / 24.0;
        }

        Some(Self {
            lat: lat + cell_lat / 2.0,
            lon: lon + cell_lon / 2.0,
        })
    }

    /// Great-circle distance to `other` in km (haversine).
    pub fn distance_km(&self, other: &GridLocation) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat1 - lat2;
        let dlon = self.lon.to_radians() - other.lon.to_radians();

        2.0 * EARTH_RADIUS_KM
            * f64::asin(f64::sqrt(
                f64::powi(f64::sin(dlat / 2.0), 2)
                    + f64::cos(lat1) * f64::cos(lat2) * f64::powi(f64::sin(dlon / 2.0), 2),
            ))
    }
}

fn field_index(c: char) -> Option<f64> {
    let c = c.to_ascii_uppercase();
    ('A'..='R')
        .contains(&c)
        .then(|| (c as u8 - b'A') as f64)
}

fn subsquare_index(c: char) -> Option<f64> {
    let c = c.to_ascii_lowercase();
    ('a'..='x')
        .contains(&c)
        .then(|| (c as u8 - b'a') as f64)
}

/// Distance between the centres of two locators, if both decode.
pub fn grid_distance_km(from: &str, to: &str) -> Option<f64> {
    let from = GridLocation::parse(from)?;
    let to = GridLocation::parse(to)?;
    Some(from.distance_km(&to))
}
