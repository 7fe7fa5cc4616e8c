use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;

/// Stable identifier of a browsed record, assigned by the server.
pub type RecordKey = String;

/// One source reference inside a flow: where to look and why.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// An ordered sequence of locations describing one data or control path.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flow {
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// The browsed domain entity (an issue or a security hotspot).
///
/// `key` is immutable for the lifetime of the record. `status` and
/// `resolution` are the only fields the client mutates, and always by
/// replacing the whole record after a server round trip. The client never
/// interprets their values.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub key: RecordKey,
    pub status: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Secondary locations of the record itself, stepped through when no
    /// flow is selected.
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Record {
    /// Locations to step through for a given flow selection. `None` selects
    /// the record's own location list.
    pub fn flow_locations(&self, flow: Option<usize>) -> &[Location] {
        match flow {
            Some(index) => self
                .flows
                .get(index)
                .map(|f| f.locations.as_slice())
                .unwrap_or_default(),
            None => &self.locations,
        }
    }
}
