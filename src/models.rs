//! Core data models for the orbital ephemeris.
//!
//! A [`Dataset`] is the typed form of one OEM document. Sections that were
//! absent from the document are `None` rather than empty defaults, so the
//! query layer can tell "section missing" apart from "nothing loaded".

use serde::Serialize;
use std::collections::BTreeMap;

/// A scalar with its unit string, as carried by the `units` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub value: f64,
    pub units: String,
}

impl Measure {
    pub fn new(value: f64, units: impl Into<String>) -> Self {
        Self {
            value,
            units: units.into(),
        }
    }
}

/// One epoch sample: position and velocity at a timestamp.
///
/// Components that were missing or unparsable in the document are `None`;
/// the record itself is still kept so it can be listed and looked up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    #[serde(rename = "EPOCH")]
    pub epoch: String,
    #[serde(rename = "X")]
    pub x: Option<Measure>,
    #[serde(rename = "Y")]
    pub y: Option<Measure>,
    #[serde(rename = "Z")]
    pub z: Option<Measure>,
    #[serde(rename = "X_DOT")]
    pub x_dot: Option<Measure>,
    #[serde(rename = "Y_DOT")]
    pub y_dot: Option<Measure>,
    #[serde(rename = "Z_DOT")]
    pub z_dot: Option<Measure>,
}

impl StateVector {
    /// Position triple, or `None` if any component is missing.
    pub fn position(&self) -> Option<(&Measure, &Measure, &Measure)> {
        Some((self.x.as_ref()?, self.y.as_ref()?, self.z.as_ref()?))
    }

    /// Velocity triple, or `None` if any component is missing.
    pub fn velocity(&self) -> Option<(&Measure, &Measure, &Measure)> {
        Some((
            self.x_dot.as_ref()?,
            self.y_dot.as_ref()?,
            self.z_dot.as_ref()?,
        ))
    }
}

/// The OEM `header` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    #[serde(rename = "CREATION_DATE", skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(rename = "ORIGINATOR", skip_serializing_if = "Option::is_none")]
    pub originator: Option<String>,
    #[serde(rename = "COMMENT", skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    /// Any other child elements, keyed by element name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// The OEM segment `metadata` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(rename = "OBJECT_NAME", skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(rename = "OBJECT_ID", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(rename = "CENTER_NAME", skip_serializing_if = "Option::is_none")]
    pub center_name: Option<String>,
    #[serde(rename = "REF_FRAME", skip_serializing_if = "Option::is_none")]
    pub ref_frame: Option<String>,
    #[serde(rename = "TIME_SYSTEM", skip_serializing_if = "Option::is_none")]
    pub time_system: Option<String>,
    #[serde(rename = "START_TIME", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "STOP_TIME", skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<String>,
    #[serde(rename = "COMMENT", skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// A fully parsed ephemeris document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub header: Option<Header>,
    pub metadata: Option<Metadata>,
    /// `data.COMMENT` lines, in document order.
    pub comments: Option<Vec<String>>,
    /// `data.stateVector` records, in document order.
    #[serde(rename = "stateVector")]
    pub state_vectors: Option<Vec<StateVector>>,
}

impl Dataset {
    /// Number of state vectors, zero when the section is missing.
    pub fn epoch_count(&self) -> usize {
        self.state_vectors.as_ref().map_or(0, Vec::len)
    }
}

/// Sub-point of a state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Altitude units, copied from the position units.
    pub units: String,
}

/// Reverse-geocoding outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoLookup {
    /// Raw provider payload for the matched place.
    Place(serde_json::Value),
    /// No place matched, which is what happens over open water.
    Ocean,
}

/// Text returned in place of a geocode payload when no place matched.
pub const OCEAN_SENTINEL: &str = "The ISS must be over an ocean...";

impl Serialize for GeoLookup {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GeoLookup::Place(value) => value.serialize(serializer),
            GeoLookup::Ocean => serializer.serialize_str(OCEAN_SENTINEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Measure,
}

/// Combined answer for `/epochs/{epoch}/location` and `/now`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationResult {
    #[serde(rename = "Epoch")]
    pub epoch: String,
    #[serde(rename = "Location")]
    pub location: Location,
    pub geo: GeoLookup,
    /// Instantaneous speed in the velocity's units.
    pub speed: Measure,
}
