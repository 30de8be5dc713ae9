use csv::StringRecord;

use super::normalizer::normalize_header;

/// Columns understood by the credential import format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportColumn {
    Type,
    LicenseNumber,
    State,
    IssueDate,
    ExpiryDate,
    RenewalLink,
    Notes,
    IsResidentState,
}

impl ImportColumn {
    pub const REQUIRED: [Self; 5] = [
        Self::Type,
        Self::LicenseNumber,
        Self::State,
        Self::IssueDate,
        Self::ExpiryDate,
    ];

    pub const OPTIONAL: [Self; 3] = [Self::RenewalLink, Self::Notes, Self::IsResidentState];

    pub const fn header(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::LicenseNumber => "licenseNumber",
            Self::State => "state",
            Self::IssueDate => "issueDate",
            Self::ExpiryDate => "expiryDate",
            Self::RenewalLink => "renewalLink",
            Self::Notes => "notes",
            Self::IsResidentState => "isResidentState",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Type => 0,
            Self::LicenseNumber => 1,
            Self::State => 2,
            Self::IssueDate => 3,
            Self::ExpiryDate => 4,
            Self::RenewalLink => 5,
            Self::Notes => 6,
            Self::IsResidentState => 7,
        }
    }
}

/// Position of every known column in the header row.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMap {
    positions: [Option<usize>; 8],
    width: usize,
}

impl ColumnMap {
    /// Locate columns by header name; `Err` lists every missing required header.
    pub(crate) fn from_headers(headers: &StringRecord) -> Result<Self, Vec<&'static str>> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = [None; 8];

        for column in ImportColumn::REQUIRED
            .into_iter()
            .chain(ImportColumn::OPTIONAL)
        {
            let key = column.header().to_ascii_lowercase();
            positions[column.slot()] = normalized.iter().position(|header| header == &key);
        }

        let missing: Vec<&'static str> = ImportColumn::REQUIRED
            .into_iter()
            .filter(|column| positions[column.slot()].is_none())
            .map(ImportColumn::header)
            .collect();

        if missing.is_empty() {
            Ok(Self {
                positions,
                width: headers.len(),
            })
        } else {
            Err(missing)
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn get<'r>(&self, record: &'r StringRecord, column: ImportColumn) -> Option<&'r str> {
        self.positions[column.slot()].and_then(|index| record.get(index))
    }
}
