use csv::StringRecord;

/// One data row as read from the payload, numbered from 1. Blank lines are
/// not data rows and do not take a number.
#[derive(Debug)]
pub(crate) struct RawRow {
    pub(crate) row_number: usize,
    pub(crate) cells: Result<StringRecord, String>,
}

#[derive(Debug)]
pub(crate) struct RawTable {
    pub(crate) headers: StringRecord,
    pub(crate) rows: Vec<RawRow>,
}

/// Tokenize comma-delimited text with a header row. Quoted fields may hold
/// commas and `""` escapes. Rows keep their own width so the caller can reject
/// mismatches one row at a time.
pub(crate) fn read_table(raw: &str) -> Result<RawTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let row_number = index + 1;
        match record {
            Ok(cells) => rows.push(RawRow {
                row_number,
                cells: Ok(cells),
            }),
            Err(err) => {
                let fatal = err.is_io_error();
                rows.push(RawRow {
                    row_number,
                    cells: Err(err.to_string()),
                });
                if fatal {
                    break;
                }
            }
        }
    }

    Ok(RawTable { headers, rows })
}
