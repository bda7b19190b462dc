//! Pre-upload validation.
//!
//! Files are checked for extension, size and required header columns before
//! anything is sent. Only [`UploadGate::check`] can produce a
//! [`ValidatedUpload`], so an invalid file cannot reach a scoring session.

use scorelens_core::config::UploadConfig;
use scorelens_core::{ErrorKind, ErrorRecord, UploadFile};

/// Reasons a file is refused before upload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{file_name}' is not a CSV file (expected a .csv extension)")]
    NotCsv { file_name: String },

    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("file is empty")]
    Empty,

    #[error("header row is not valid UTF-8 text")]
    UnreadableHeader,

    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}

impl ValidationError {
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord::new(ErrorKind::ClientValidation, self.to_string())
    }
}

/// A file that passed the upload gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    file: UploadFile,
    columns: Vec<String>,
}

impl ValidatedUpload {
    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    /// Header columns as read from the file.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn into_file(self) -> UploadFile {
        self.file
    }
}

/// Extension, size and header-schema checks applied before upload.
#[derive(Debug, Clone)]
pub struct UploadGate {
    required_columns: Vec<String>,
    max_bytes: u64,
}

impl UploadGate {
    pub fn new(required_columns: Vec<String>, max_bytes: u64) -> Self {
        Self {
            required_columns,
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.required_columns.clone(), config.max_bytes)
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    pub fn check(&self, file: UploadFile) -> Result<ValidatedUpload, ValidationError> {
        let is_csv = std::path::Path::new(&file.name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ValidationError::NotCsv {
                file_name: file.name.clone(),
            });
        }

        if file.len() > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size: file.len(),
                limit: self.max_bytes,
            });
        }

        if file.is_empty() {
            return Err(ValidationError::Empty);
        }

        let columns = read_header(&file.bytes)?;
        let missing: Vec<String> = self
            .required_columns
            .iter()
            .filter(|required| !columns.iter().any(|c| c == *required))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingColumns { columns: missing });
        }

        tracing::debug!(file = %file.name, columns = columns.len(), "upload passed validation");
        Ok(ValidatedUpload { file, columns })
    }
}

/// Parse the first line of a CSV file into trimmed column names.
fn read_header(bytes: &[u8]) -> Result<Vec<String>, ValidationError> {
    let end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let line = std::str::from_utf8(&bytes[..end]).map_err(|_| ValidationError::UnreadableHeader)?;
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    Ok(split_header(line))
}

fn split_header(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorelens_core::config::DEFAULT_REQUIRED_COLUMNS;

    fn gate() -> UploadGate {
        UploadGate::from_config(&UploadConfig::default())
    }

    fn csv(header: &str) -> UploadFile {
        UploadFile::new("ledger.csv", format!("{header}\n1,2,3\n"))
    }

    #[test]
    fn accepts_file_with_all_required_columns() {
        let header = format!("BELNR,{}", DEFAULT_REQUIRED_COLUMNS.join(","));
        let upload = gate().check(csv(&header)).unwrap();
        assert_eq!(upload.columns().len(), 9);
        assert_eq!(upload.file().name, "ledger.csv");
    }

    #[test]
    fn lists_exactly_the_missing_columns() {
        let header = "BELNR,PRCTR,BSCHL,WAERS,BUKRS,DMBTR,WRBTR";
        let err = gate().check(csv(header)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns {
                columns: vec!["HKONT".into(), "KTOSL".into()]
            }
        );
        assert_eq!(err.to_string(), "Missing required columns: HKONT, KTOSL");
        assert_eq!(err.to_record().kind, ErrorKind::ClientValidation);
    }

    #[test]
    fn rejects_wrong_extension() {
        let file = UploadFile::new("ledger.xlsx", "PRCTR\n");
        assert!(matches!(gate().check(file), Err(ValidationError::NotCsv { .. })));
        let upper = UploadFile::new("LEDGER.CSV", DEFAULT_REQUIRED_COLUMNS.join(","));
        assert!(gate().check(upper).is_ok());
    }

    #[test]
    fn rejects_oversized_file() {
        let small = UploadGate::new(vec![], 4);
        let err = small.check(UploadFile::new("a.csv", "A,B,C\n")).unwrap_err();
        assert_eq!(err, ValidationError::TooLarge { size: 6, limit: 4 });
    }

    #[test]
    fn rejects_empty_file() {
        let err = gate().check(UploadFile::new("a.csv", "")).unwrap_err();
        assert_eq!(err, ValidationError::Empty);
    }

    #[test]
    fn header_handles_bom_quotes_and_crlf() {
        let line = "\u{feff}\"PRCTR\", BSCHL ,\"a,b\",\"say \"\"hi\"\"\"\r\nx";
        let cols = read_header(line.as_bytes()).unwrap();
        assert_eq!(cols, vec!["PRCTR", "BSCHL", "a,b", "say \"hi\""]);
    }

    #[test]
    fn invalid_utf8_header() {
        let file = UploadFile::new("a.csv", vec![0xff, 0xfe, b',', b'\n']);
        assert_eq!(gate().check(file).unwrap_err(), ValidationError::UnreadableHeader);
    }
}
