use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Primary fuel of a facility.
///
/// Labels that do not match a known fuel (e.g. "Cogeneration", "Storage")
/// collapse into [`PrimaryFuel::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimaryFuel {
    Coal,
    Gas,
    Oil,
    Hydro,
    Nuclear,
    Wind,
    Solar,
    Biomass,
    Geothermal,
    Waste,
    Other,
}

impl PrimaryFuel {
    pub const ALL: [PrimaryFuel; 11] = [
        PrimaryFuel::Coal,
        PrimaryFuel::Gas,
        PrimaryFuel::Oil,
        PrimaryFuel::Hydro,
        PrimaryFuel::Nuclear,
        PrimaryFuel::Wind,
        PrimaryFuel::Solar,
        PrimaryFuel::Biomass,
        PrimaryFuel::Geothermal,
        PrimaryFuel::Waste,
        PrimaryFuel::Other,
    ];

    /// Map a free-form label onto a fuel, falling back to `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|fuel| fuel.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(PrimaryFuel::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryFuel::Coal => "Coal",
            PrimaryFuel::Gas => "Gas",
            PrimaryFuel::Oil => "Oil",
            PrimaryFuel::Hydro => "Hydro",
            PrimaryFuel::Nuclear => "Nuclear",
            PrimaryFuel::Wind => "Wind",
            PrimaryFuel::Solar => "Solar",
            PrimaryFuel::Biomass => "Biomass",
            PrimaryFuel::Geothermal => "Geothermal",
            PrimaryFuel::Waste => "Waste",
            PrimaryFuel::Other => "Other",
        }
    }

    /// Legend colour used for single-facility markers.
    pub fn color(&self) -> &'static str {
        match self {
            PrimaryFuel::Coal => "#000000",
            PrimaryFuel::Gas => "#FFA500",
            PrimaryFuel::Oil => "#8B4513",
            PrimaryFuel::Hydro => "#1E90FF",
            PrimaryFuel::Nuclear => "#800080",
            PrimaryFuel::Wind => "#00BFFF",
            PrimaryFuel::Solar => "#FFD700",
            PrimaryFuel::Biomass => "#228B22",
            PrimaryFuel::Geothermal => "#FF4500",
            PrimaryFuel::Waste => "#A52A2A",
            PrimaryFuel::Other => "#808080",
        }
    }

    /// Known labels, i.e. everything except `Other`.
    pub fn known_labels() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .into_iter()
            .filter(|fuel| *fuel != PrimaryFuel::Other)
            .map(|fuel| fuel.as_str())
    }
}

impl fmt::Display for PrimaryFuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PrimaryFuel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// A missing or null fuel on the wire is treated as `Other`.
impl<'de> Deserialize<'de> for PrimaryFuel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(PrimaryFuel::from_label)
            .unwrap_or(PrimaryFuel::Other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(PrimaryFuel::from_label("hydro"), PrimaryFuel::Hydro);
        assert_eq!(PrimaryFuel::from_label(" GAS "), PrimaryFuel::Gas);
    }

    #[test]
    fn test_unknown_labels_fall_back_to_other() {
        assert_eq!(PrimaryFuel::from_label("Cogeneration"), PrimaryFuel::Other);
        assert_eq!(PrimaryFuel::from_label(""), PrimaryFuel::Other);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&PrimaryFuel::Nuclear).unwrap();
        assert_eq!(json, "\"Nuclear\"");
        let fuel: PrimaryFuel = serde_json::from_str("\"Wave and Tidal\"").unwrap();
        assert_eq!(fuel, PrimaryFuel::Other);
        let fuel: PrimaryFuel = serde_json::from_str("null").unwrap();
        assert_eq!(fuel, PrimaryFuel::Other);
    }

    #[test]
    fn test_known_labels_exclude_other() {
        let labels: Vec<_> = PrimaryFuel::known_labels().collect();
        assert_eq!(labels.len(), 10);
        assert!(!labels.contains(&"Other"));
    }
}
