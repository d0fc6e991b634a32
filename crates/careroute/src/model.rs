//! Spatial records: points, patients, hospitals and assignments

use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Coordinate;

/// Capacity used when a hospital has no (or a non-positive) declared capacity
pub const UNLIMITED_CAPACITY: u64 = 1_000_000_000;

/// Whether a point is a patient or a hospital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Patient,
    Hospital,
}

/// A labeled spatial point, the unit of graph construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub kind: PointKind,
}

impl Point {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, kind: PointKind) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            kind,
        }
    }

    pub fn patient(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, lat, lon, PointKind::Patient)
    }

    pub fn hospital(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, lat, lon, PointKind::Hospital)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    pub fn distance_km(&self, other: &Point) -> f64 {
        self.coordinate().distance_km(&other.coordinate())
    }
}

/// Patient acuity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum Severity {
    Grave,
    Moderate,
    Mild,
    #[default]
    Unknown,
}

impl Severity {
    /// Interpret a free-text severity label ("grave", "Crítico", "moderado", "leve", ...)
    pub fn parse(label: &str) -> Self {
        let s = label.trim().to_lowercase();
        if s.is_empty() {
            return Severity::Unknown;
        }
        if s.starts_with('g') || s.contains("crit") || s.contains("crít") {
            Severity::Grave
        } else if s.starts_with('m') && !s.starts_with("mild") {
            Severity::Moderate
        } else if s.starts_with("mild") || s.starts_with("leve") {
            Severity::Mild
        } else {
            Severity::Unknown
        }
    }

    /// Greedy processing rank, 0 is the most severe
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Grave => 0,
            Severity::Moderate => 1,
            Severity::Mild | Severity::Unknown => 2,
        }
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        Severity::parse(&label)
    }
}

/// A null severity is unknown
impl From<Option<String>> for Severity {
    fn from(label: Option<String>) -> Self {
        label.map(Severity::from).unwrap_or_default()
    }
}

/// A patient record as served by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub severity: Severity,
    /// Free-text diagnosis used to infer the required specialty
    #[serde(default, alias = "disease")]
    pub diagnosis: Option<String>,
    #[serde(default, alias = "department")]
    pub region: Option<String>,
}

impl Patient {
    pub fn new(code: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            code: code.into(),
            lat,
            lon,
            severity: Severity::Unknown,
            diagnosis: None,
            region: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.diagnosis = Some(diagnosis.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn point(&self) -> Point {
        Point::patient(self.code.clone(), self.lat, self.lon)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// A hospital record as served by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Declared capacity; `None` or a non-positive value means unlimited
    #[serde(default)]
    pub capacity: Option<i64>,
    /// Free-text, comma separated specialty list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub specialties: String,
    #[serde(default, alias = "department")]
    pub region: Option<String>,
}

impl Hospital {
    pub fn new(code: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            code: code.into(),
            name: None,
            lat,
            lon,
            capacity: None,
            specialties: String::new(),
            region: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_specialties(mut self, specialties: impl Into<String>) -> Self {
        self.specialties = specialties.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Capacity with the "unlimited" sentinel applied
    pub fn effective_capacity(&self) -> u64 {
        match self.capacity {
            Some(c) if c > 0 => c as u64,
            _ => UNLIMITED_CAPACITY,
        }
    }

    /// Parsed specialty set, in declaration order
    pub fn specialty_list(&self) -> Vec<&str> {
        self.specialties
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn offers_specialty(&self, specialty: &str) -> bool {
        let wanted = specialty.trim().to_lowercase();
        self.specialty_list()
            .iter()
            .any(|s| s.to_lowercase() == wanted)
    }

    pub fn point(&self) -> Point {
        Point::hospital(self.code.clone(), self.lat, self.lon)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Result of assigning one patient; shared by every strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub patient_id: String,
    pub hospital_id: Option<String>,
    pub distance_km: Option<f64>,
}

impl Assignment {
    pub fn assigned(
        patient_id: impl Into<String>,
        hospital_id: impl Into<String>,
        distance_km: f64,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            hospital_id: Some(hospital_id.into()),
            distance_km: Some(distance_km),
        }
    }

    pub fn unassigned(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            hospital_id: None,
            distance_km: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.hospital_id.is_some()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
