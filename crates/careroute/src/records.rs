//! Record store: where patients and hospitals come from

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{Hospital, Patient};
use crate::{EngineError, Result};

/// Narrowing applied to list queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    /// Exact region match
    pub region: Option<String>,
    /// Maximum number of records returned
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, region: Option<&str>) -> bool {
        match &self.region {
            Some(wanted) => region == Some(wanted.as_str()),
            None => true,
        }
    }

    fn apply<'a, T: Clone + 'a>(
        &self,
        records: impl Iterator<Item = &'a T>,
        region: impl Fn(&T) -> Option<&str>,
    ) -> Vec<T> {
        records
            .filter(|r| self.matches(region(*r)))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Read access to patients and hospitals
pub trait RecordStore {
    fn find_patient_by_code(&self, code: &str) -> Result<Option<Patient>>;

    fn list_hospitals(&self, filter: &RecordFilter) -> Result<Vec<Hospital>>;

    fn list_patients(&self, filter: &RecordFilter) -> Result<Vec<Patient>>;
}

/// On-disk dataset shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
}

/// Store holding a whole dataset in memory, in file order
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    patients: Vec<Patient>,
    hospitals: Vec<Hospital>,
}

impl InMemoryRecordStore {
    pub fn new(patients: Vec<Patient>, hospitals: Vec<Hospital>) -> Self {
        Self {
            patients,
            hospitals,
        }
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self::new(dataset.patients, dataset.hospitals)
    }

    /// Parse a JSON dataset `{"patients": [...], "hospitals": [...]}`
    pub fn from_json_str(content: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(content)?;
        let store = Self::from_dataset(dataset);
        store.validate()?;
        Ok(store)
    }

    /// Load a JSON dataset file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded {} patients and {} hospitals from {}",
            store.patients.len(),
            store.hospitals.len(),
            path.as_ref().display()
        );
        Ok(store)
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn hospitals(&self) -> &[Hospital] {
        &self.hospitals
    }

    fn validate(&self) -> Result<()> {
        let coordinates = self
            .patients
            .iter()
            .map(|p| (&p.code, p.lat, p.lon))
            .chain(self.hospitals.iter().map(|h| (&h.code, h.lat, h.lon)));

        for (code, lat, lon) in coordinates {
            if code.trim().is_empty() {
                return Err(EngineError::Dataset("record with an empty code".to_string()));
            }
            if !(lat.is_finite() && lon.is_finite()) || lat.abs() > 90.0 || lon.abs() > 180.0 {
                return Err(EngineError::Dataset(format!(
                    "{code} has invalid coordinates ({lat}, {lon})"
                )));
            }
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_patient_by_code(&self, code: &str) -> Result<Option<Patient>> {
        Ok(self.patients.iter().find(|p| p.code == code).cloned())
    }

    fn list_hospitals(&self, filter: &RecordFilter) -> Result<Vec<Hospital>> {
        Ok(filter.apply(self.hospitals.iter(), |h| h.region.as_deref()))
    }

    fn list_patients(&self, filter: &RecordFilter) -> Result<Vec<Patient>> {
        Ok(filter.apply(self.patients.iter(), |p| p.region.as_deref()))
    }
}
