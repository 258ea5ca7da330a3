use csv::StringRecord;
use serde::{Deserialize, Deserializer};

use crate::workflows::engagement::{EngagementState, GhostRisk};
use crate::workflows::pipeline::{
    Candidate, CandidateField, CandidateStatus, CandidateUpdate, RoundRecord, StoreError,
    UnknownStatus,
};

pub const EMAIL_COLUMN: &str = "Email";
pub const STATUS_COLUMN: &str = "Status";

/// Header order used for a brand new sheet.
pub const STANDARD_COLUMNS: [&str; 13] = [
    "Name",
    "Email",
    "Role",
    "Status",
    "Applied_Date",
    "L1_Date",
    "L1_Time",
    "L1_Result",
    "L2_Date",
    "L2_Time",
    "L2_Result",
    "Ghost_Risk",
    "Engagement",
];

/// Raw header + rows view of the candidate sheet. Columns the workflows do not know
/// about are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    headers: StringRecord,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn empty() -> Self {
        Self {
            headers: STANDARD_COLUMNS.iter().copied().collect(),
            rows: Vec::new(),
        }
    }

    /// Parse CSV bytes. Blank input yields an empty sheet with the standard header.
    pub fn parse(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader.headers()?.clone();
        let width = headers.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    }

    /// Index of `name`, appending it to the header (and padding every row) when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push_field(name);
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    pub fn find_row(&self, email: &str) -> Option<usize> {
        let column = self.column(EMAIL_COLUMN)?;
        let email = email.trim();
        self.rows
            .iter()
            .position(|row| row[column].eq_ignore_ascii_case(email))
    }

    /// Decode every row with an email and a known status, in sheet order.
    pub fn candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let mut candidates = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let record = StringRecord::from(row.clone());
            let parsed: CandidateRow = record.deserialize(Some(&self.headers))?;
            if parsed.email.is_empty() {
                continue;
            }
            match parsed.into_candidate() {
                Ok(candidate) => candidates.push(candidate),
                Err(UnknownStatus(status)) => {
                    tracing::warn!(row = index + 2, %status, "skipping row with unknown status");
                }
            }
        }
        Ok(candidates)
    }

    pub fn apply_update(&mut self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        let row = self
            .find_row(email)
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;

        let status_column = self.ensure_column(STATUS_COLUMN);
        self.rows[row][status_column] = update.status.label().to_string();
        for (field, value) in &update.fields {
            let column = self.ensure_column(field.column());
            self.rows[row][column] = value.clone();
        }
        Ok(())
    }

    pub fn append(&mut self, candidate: &Candidate) -> Result<(), StoreError> {
        if self.find_row(&candidate.email).is_some() {
            return Err(StoreError::Conflict(candidate.email.clone()));
        }
        for column in STANDARD_COLUMNS {
            self.ensure_column(column);
        }

        let mut row = vec![String::new(); self.headers.len()];
        for (column, value) in candidate_cells(candidate) {
            if let Some(index) = self.column(column) {
                row[index] = value;
            }
        }
        self.rows.push(row);
        Ok(())
    }
}

fn candidate_cells(candidate: &Candidate) -> Vec<(&'static str, String)> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        ("Name", candidate.name.clone()),
        (EMAIL_COLUMN, candidate.email.clone()),
        ("Role", candidate.role.clone()),
        (STATUS_COLUMN, candidate.status.label().to_string()),
        (CandidateField::AppliedDate.column(), optional(&candidate.applied_date)),
        (CandidateField::L1Date.column(), optional(&candidate.l1.date)),
        (CandidateField::L1Time.column(), optional(&candidate.l1.time)),
        (CandidateField::L1Result.column(), optional(&candidate.l1.result)),
        (CandidateField::L2Date.column(), optional(&candidate.l2.date)),
        (CandidateField::L2Time.column(), optional(&candidate.l2.time)),
        (CandidateField::L2Result.column(), optional(&candidate.l2.result)),
        (CandidateField::GhostRisk.column(), candidate.ghost_risk.to_string()),
        (
            CandidateField::Engagement.column(),
            candidate.engagement.column_value().to_string(),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Role", default)]
    role: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(
        rename = "Applied_Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    applied_date: Option<String>,
    #[serde(rename = "L1_Date", default, deserialize_with = "empty_string_as_none")]
    l1_date: Option<String>,
    #[serde(rename = "L1_Time", default, deserialize_with = "empty_string_as_none")]
    l1_time: Option<String>,
    #[serde(rename = "L1_Result", default, deserialize_with = "empty_string_as_none")]
    l1_result: Option<String>,
    #[serde(rename = "L2_Date", default, deserialize_with = "empty_string_as_none")]
    l2_date: Option<String>,
    #[serde(rename = "L2_Time", default, deserialize_with = "empty_string_as_none")]
    l2_time: Option<String>,
    #[serde(rename = "L2_Result", default, deserialize_with = "empty_string_as_none")]
    l2_result: Option<String>,
    #[serde(rename = "Ghost_Risk", default)]
    ghost_risk: String,
    #[serde(rename = "Engagement", default)]
    engagement: String,
}

impl CandidateRow {
    fn into_candidate(self) -> Result<Candidate, UnknownStatus> {
        let status = if self.status.is_empty() {
            CandidateStatus::Screening
        } else {
            self.status.parse()?
        };

        Ok(Candidate {
            email: self.email,
            name: self.name,
            role: self.role,
            status,
            applied_date: self.applied_date,
            l1: RoundRecord {
                date: self.l1_date,
                time: self.l1_time,
                result: self.l1_result,
            },
            l2: RoundRecord {
                date: self.l2_date,
                time: self.l2_time,
                result: self.l2_result,
            },
            ghost_risk: GhostRisk::parse_or_default(&self.ghost_risk),
            engagement: EngagementState::parse_or_default(&self.engagement),
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
