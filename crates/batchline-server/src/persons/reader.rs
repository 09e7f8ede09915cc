//! Delimited-text reader for person rows

use csv::{ErrorKind, StringRecord};
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::model::PersonRow;
use crate::batch::{ItemError, ItemReader, ItemReaderFactory};

/// Number of fields every data line must have
const EXPECTED_FIELDS: usize = 2;

/// Opens `CsvPersonReader`s over one input file
#[derive(Debug, Clone)]
pub struct CsvPersonReaderFactory {
    path: PathBuf,
    delimiter: u8,
    lines_to_skip: usize,
}

impl CsvPersonReaderFactory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            lines_to_skip: 1,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Leading lines (headers) to ignore
    pub fn lines_to_skip(mut self, lines: usize) -> Self {
        self.lines_to_skip = lines;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemReaderFactory<PersonRow> for CsvPersonReaderFactory {
    fn open(&self, start_position: u64) -> Result<Box<dyn ItemReader<PersonRow>>, ItemError> {
        let file = File::open(&self.path).map_err(|e| {
            ItemError::fatal(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let mut person_reader = CsvPersonReader {
            reader,
            record: StringRecord::new(),
            position: 0,
            consumed_line: 1,
            next_line: 1,
            blank_lines: 0..0,
            held: None,
            cursor: Cursor::Record(0),
        };

        for _ in 0..self.lines_to_skip {
            if let Raw::End = person_reader.read_raw()? {
                break;
            }
        }

        while person_reader.position < start_position {
            match person_reader.advance() {
                Ok(true) | Err(ItemError::Recoverable(_)) => {},
                Ok(false) => break,
                Err(fatal) => return Err(fatal),
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            start_position,
            "Opened person reader"
        );

        Ok(Box::new(person_reader))
    }
}

/// One record from the csv parser, placed on its source line
enum Raw {
    Record { line: u64, blanks: u64 },
    Malformed { line: u64, blanks: u64, cause: String },
    End,
}

/// Record waiting behind the blank lines that preceded it
enum Held {
    Record(u64),
    Malformed(u64, String),
}

/// What the last consumed data line was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Record(u64),
    Blank(u64),
}

/// Reads `first,last` lines into [`PersonRow`]s
///
/// The csv parser drops empty lines. They are recovered from the parser's
/// line count and returned as rows without names, so every data line takes
/// one position.
pub struct CsvPersonReader {
    reader: csv::Reader<BufReader<File>>,
    record: StringRecord,
    position: u64,
    /// Parser line number after the last read
    consumed_line: u64,
    /// Source line of the next data line
    next_line: u64,
    blank_lines: Range<u64>,
    held: Option<Held>,
    cursor: Cursor,
}

impl CsvPersonReader {
    fn read_raw(&mut self) -> Result<Raw, ItemError> {
        let result = self.reader.read_record(&mut self.record);
        let consumed = self.reader.position().line();
        let spanned = consumed.saturating_sub(self.consumed_line);
        self.consumed_line = consumed;

        let (embedded, malformed) = match result {
            Ok(false) => return Ok(Raw::End),
            Ok(true) => {
                let newlines: usize = self.record.iter().map(|field| field.matches('\n').count()).sum();
                (newlines as u64, None)
            },
            Err(err) => match err.kind() {
                ErrorKind::Io(_) => {
                    return Err(ItemError::fatal(format!("input read failed: {}", err)))
                },
                _ => (0, Some(err.to_string())),
            },
        };

        // A record consumes its own line terminator plus any empty lines before it
        let blanks = spanned.saturating_sub(1 + embedded);
        let line = self.next_line + blanks;
        self.next_line = line + 1 + embedded;

        Ok(match malformed {
            None => Raw::Record { line, blanks },
            Some(err) => Raw::Malformed {
                line,
                blanks,
                cause: format!("line {}: {}", line, err),
            },
        })
    }

    /// Consume one data line, counting it even when malformed
    fn advance(&mut self) -> Result<bool, ItemError> {
        if let Some(line) = self.blank_lines.next() {
            self.position += 1;
            self.cursor = Cursor::Blank(line);
            return Ok(true);
        }

        if let Some(held) = self.held.take() {
            self.position += 1;
            return match held {
                Held::Record(line) => {
                    self.cursor = Cursor::Record(line);
                    Ok(true)
                },
                Held::Malformed(line, cause) => {
                    self.cursor = Cursor::Record(line);
                    Err(ItemError::recoverable(cause))
                },
            };
        }

        let (line, blanks, held) = match self.read_raw()? {
            Raw::End => return Ok(false),
            Raw::Record { line, blanks } => (line, blanks, Held::Record(line)),
            Raw::Malformed { line, blanks, cause } => (line, blanks, Held::Malformed(line, cause)),
        };
        self.blank_lines = (line - blanks)..line;
        self.held = Some(held);
        self.advance()
    }

    fn current_row(&self) -> Result<PersonRow, ItemError> {
        let line = match self.cursor {
            Cursor::Blank(line) => return Ok(PersonRow::blank(line)),
            Cursor::Record(line) => line,
        };

        if self.record.iter().all(str::is_empty) {
            return Ok(PersonRow::blank(line));
        }

        if self.record.len() != EXPECTED_FIELDS {
            return Err(ItemError::recoverable(format!(
                "line {}: expected {} fields, found {}",
                line,
                EXPECTED_FIELDS,
                self.record.len()
            )));
        }

        let field = |i: usize| {
            self.record
                .get(i)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Ok(PersonRow {
            line,
            first_name: field(0),
            last_name: field(1),
        })
    }
}

impl ItemReader<PersonRow> for CsvPersonReader {
    fn read(&mut self) -> Result<Option<PersonRow>, ItemError> {
        if !self.advance()? {
            return Ok(None);
        }
        self.current_row().map(Some)
    }

    fn position(&self) -> u64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn read_all(reader: &mut dyn ItemReader<PersonRow>) -> Vec<Result<PersonRow, ItemError>> {
        let mut out = Vec::new();
        loop {
            match reader.read() {
                Ok(Some(row)) => out.push(Ok(row)),
                Ok(None) => break,
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    #[test]
    fn test_reads_rows_after_header() {
        let file = input("firstName,lastName\nJohn,Doe\n,Smith\nJane,Roe\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(0).unwrap();
        let rows: Vec<PersonRow> = read_all(reader.as_mut()).into_iter().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].first_name.as_deref(), Some("John"));
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].first_name, None);
        assert_eq!(rows[1].last_name.as_deref(), Some("Smith"));
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_wrong_field_count_is_recoverable_and_counted() {
        let file = input("first,last\nJohn\nJane,Roe,Extra\nAnn,Lee\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(0).unwrap();
        let results = read_all(reader.as_mut());

        assert_eq!(results.len(), 3);
        assert!(matches!(&results[0], Err(ItemError::Recoverable(msg)) if msg.contains("found 1")));
        assert!(matches!(&results[1], Err(ItemError::Recoverable(msg)) if msg.contains("found 3")));
        assert!(results[2].is_ok());
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_fields_are_trimmed_and_delimiter_configurable() {
        let file = input("John ; Doe \n");
        let factory = CsvPersonReaderFactory::new(file.path())
            .delimiter(b';')
            .lines_to_skip(0);
        let mut reader = factory.open(0).unwrap();
        let row = reader.read().unwrap().unwrap();

        assert_eq!(row.first_name.as_deref(), Some("John"));
        assert_eq!(row.last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_open_resumes_after_start_position() {
        let file = input("h1,h2\na,b\nbad\nc,d\ne,f\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(2).unwrap();

        assert_eq!(reader.position(), 2);
        let row = reader.read().unwrap().unwrap();
        assert_eq!(row.first_name.as_deref(), Some("c"));
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_blank_lines_are_rows_without_names() {
        let file = input("firstName,lastName\nJohn,Doe\n\n   \nJane,Roe\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(0).unwrap();
        let rows: Vec<PersonRow> = read_all(reader.as_mut()).into_iter().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], PersonRow::blank(3));
        assert_eq!(rows[2], PersonRow::blank(4));
        assert_eq!(rows[3].first_name.as_deref(), Some("Jane"));
        assert_eq!(rows[3].line, 5);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_resume_counts_blank_lines() {
        let file = input("h1,h2\na,b\n\nc,d\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(2).unwrap();

        let row = reader.read().unwrap().unwrap();
        assert_eq!(row.first_name.as_deref(), Some("c"));
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = CsvPersonReaderFactory::new("/nonexistent/persons.csv")
            .open(0)
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = input("firstName,lastName\n");
        let mut reader = CsvPersonReaderFactory::new(file.path()).open(0).unwrap();
        assert_eq!(reader.read().unwrap(), None);
        assert_eq!(reader.position(), 0);
    }
}
