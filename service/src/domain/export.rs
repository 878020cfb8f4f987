use chrono::SecondsFormat;
use registry_common::domain::schema::*;
use registry_common::{AuthorKind, ColumnDef, FieldValue, ResourceKind};

use crate::domain::publication::Publication;

const LIST_SEPARATOR: &str = "; ";

/// Source of one exported column
#[derive(Debug)]
pub enum CsvField {
    Column(&'static ColumnDef),
    Authors(AuthorKind),
}

#[derive(Debug)]
pub struct CsvColumn {
    pub header: &'static str,
    pub field: CsvField,
}

const fn column(header: &'static str, column: &'static ColumnDef) -> CsvColumn {
    CsvColumn {
        header,
        field: CsvField::Column(column),
    }
}

const fn authors(header: &'static str, kind: AuthorKind) -> CsvColumn {
    CsvColumn {
        header,
        field: CsvField::Authors(kind),
    }
}

static JOURNAL_COLUMNS: &[CsvColumn] = &[
    column("ID", &ID),
    column("Serial No", &SERIAL_NO),
    column("Journal Title", &JOURNAL_NAME),
    column("Paper Title", &TITLE),
    column("Journal Type", &SCOPE),
    column("Abstract", &ABSTRACT),
    column("Status", &STATUS),
    column("Impact Factor", &IMPACT_FACTOR),
    column("Impact Factor Date", &IMPACT_FACTOR_DATE),
    column("Publisher", &PUBLISHER),
    column("Paper Link", &PAPER_LINK),
    column("DOI", &DOI),
    column("Publication Date", &PUBLICATION_DATE),
    column("Registration Fees", &FEES),
    column("Reimbursement", &REIMBURSEMENT),
    column("Public", &IS_PUBLIC),
    column("Keywords", &KEYWORDS),
    authors("Student Authors", AuthorKind::Student),
    authors("Faculty Authors", AuthorKind::Faculty),
    column("Created At", &CREATED_AT),
    column("Updated At", &UPDATED_AT),
    column("Document URL", &DOCUMENT_URL),
    column("Image URL", &IMAGE_URL),
];

static BOOK_CHAPTER_COLUMNS: &[CsvColumn] = &[
    column("ID", &ID),
    column("Chapter Title", &TITLE),
    column("Book Title", &BOOK_TITLE),
    column("Abstract", &ABSTRACT),
    column("Status", &STATUS),
    column("Teacher Status", &TEACHER_STATUS),
    column("ISBN/ISSN", &ISBN_ISSN),
    column("Publisher", &PUBLISHER),
    column("DOI", &DOI),
    column("Publication Date", &PUBLICATION_DATE),
    column("Registration Fees", &FEES),
    column("Reimbursement", &REIMBURSEMENT),
    column("Public", &IS_PUBLIC),
    column("Keywords", &KEYWORDS),
    authors("Student Authors", AuthorKind::Student),
    authors("Faculty Authors", AuthorKind::Faculty),
    column("Created At", &CREATED_AT),
    column("Updated At", &UPDATED_AT),
    column("Document URL", &DOCUMENT_URL),
    column("Image URL", &IMAGE_URL),
];

static COPYRIGHT_COLUMNS: &[CsvColumn] = &[
    column("ID", &ID),
    column("Title", &TITLE),
    column("Registration No", &REG_NO),
    column("Abstract", &ABSTRACT),
    column("Status", &STATUS),
    column("Teacher Status", &TEACHER_STATUS),
    column("Filing Date", &FILING_DATE),
    column("Submission Date", &SUBMISSION_DATE),
    column("Publication Date", &PUBLICATION_DATE),
    column("Grant Date", &GRANT_DATE),
    column("Registration Fees", &FEES),
    column("Reimbursement", &REIMBURSEMENT),
    column("Public", &IS_PUBLIC),
    authors("Student Authors", AuthorKind::Student),
    authors("Faculty Authors", AuthorKind::Faculty),
    column("Created At", &CREATED_AT),
    column("Updated At", &UPDATED_AT),
    column("Document URL", &DOCUMENT_URL),
    column("Image URL", &IMAGE_URL),
];

pub fn export_columns(kind: ResourceKind) -> &'static [CsvColumn] {
    match kind {
        ResourceKind::Journal => JOURNAL_COLUMNS,
        ResourceKind::BookChapter => BOOK_CHAPTER_COLUMNS,
        ResourceKind::Copyright => COPYRIGHT_COLUMNS,
    }
}

/// Header row followed by one line per record, no trailing newline.
/// Text is always quoted; numbers, booleans, dates and NULL are bare.
pub fn to_csv(rows: &[Publication], columns: &[CsvColumn]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| c.header)
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let cells: Vec<String> = columns.iter().map(|c| cell(row, &c.field)).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn cell(row: &Publication, field: &CsvField) -> String {
    match field {
        CsvField::Authors(kind) => quote(
            &row.authors(*kind)
                .iter()
                .map(|author| author.display())
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
        ),
        CsvField::Column(column) => match &*row.value(column) {
            FieldValue::Null => String::new(),
            FieldValue::Text(text) => quote(text),
            FieldValue::TextList(items) => quote(&items.join(LIST_SEPARATOR)),
            FieldValue::Float(number) => number.to_string(),
            FieldValue::Boolean(flag) => flag.to_string(),
            FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            FieldValue::Timestamp(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    }
}

/// Wraps in double quotes, doubling the embedded ones
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use registry_common::Role;
    use registry_common::test_utils::make_user;

    use super::*;
    use crate::domain::publication::tests::publication;

    fn journal() -> Publication {
        let mut record = publication(ResourceKind::Journal, "j1");
        record.set(&SERIAL_NO, "J-001");
        record.set(&TITLE, "Rice, \"Wheat\"\nand Maize");
        record.set(&JOURNAL_NAME, "Agronomy");
        record.set(&SCOPE, "NATIONAL");
        record.set(&IMPACT_FACTOR, 2.5);
        record.set(&PUBLICATION_DATE, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        record.set(&KEYWORDS, FieldValue::TextList(vec!["rice".into(), "yield".into()]));
        record.faculty_authors = vec![
            make_user("f1", "Frank Faculty", Role::Faculty),
            make_user("f2", "Fiona Faculty", Role::Faculty),
        ];
        record.student_authors = vec![make_user("s1", "Sam Student", Role::Student)];
        record
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn header_row_first_and_no_trailing_newline() {
        let csv = to_csv(&[], export_columns(ResourceKind::Copyright));
        assert!(csv.starts_with("ID,Title,Registration No,"));
        assert!(!csv.contains('\n'));

        let csv = to_csv(&[journal()], export_columns(ResourceKind::Journal));
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn scalar_fields_are_bare_and_text_is_quoted() {
        let csv = to_csv(&[journal()], export_columns(ResourceKind::Journal));
        let row = csv.split_once('\n').unwrap().1;
        assert!(row.starts_with("\"j1\",\"J-001\",\"Agronomy\","));
        assert!(row.contains(",2.5,,"));
        assert!(row.contains(",2024-02-29,"));
        assert!(row.contains(",false,\"rice; yield\","));
        assert!(row.contains(",2024-01-15T10:00:00.000Z,"));
        assert!(row.contains("\"Frank Faculty (f1@university.edu); Fiona Faculty (f2@university.edu)\""));
    }

    #[test]
    fn standard_parser_reads_back_every_field() {
        let csv = to_csv(&[journal()], export_columns(ResourceKind::Journal));
        let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), JOURNAL_COLUMNS.len());

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.len(), JOURNAL_COLUMNS.len());
        assert_eq!(&record[3], "Rice, \"Wheat\"\nand Maize");
        assert_eq!(&record[4], "NATIONAL");
        assert_eq!(&record[10], "");
        assert_eq!(&record[17], "Sam Student (s1@university.edu)");
    }
}
