//! Batch import and export of the whole catalog as sectional CSV.
//!
//! Import is forgiving: a bad row is logged and recorded in the
//! [`ImportReport`] while the remaining rows still load. Records are matched
//! against existing data so re-importing a file creates nothing new.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::csv::{read_sections, write_section, CsvError, Section};
use crate::error::StoreError;
use crate::models::*;
use crate::repository::Catalog;

const BOOK_DATE: &[FormatItem<'static>] = format_description!("[year]/[month]/[day]");
const REVIEW_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Sections in dependency order.
const IMPORT_ORDER: [&str; 5] = [
    "Publisher",
    "Book",
    "Contributor",
    "BookContributor",
    "Review",
];

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("file \"{}\" could not be read: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file \"{}\" could not be written: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] CsvError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("date formatting failed: {0}")]
    Format(#[from] time::error::Format),
}

/// Outcome of an import, per section name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub created: BTreeMap<&'static str, usize>,
    pub existing: BTreeMap<&'static str, usize>,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn created(&self, model: &str) -> usize {
        self.created.get(model).copied().unwrap_or_default()
    }

    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }

    fn record(&mut self, model: &'static str, created: bool) {
        let counter = if created {
            &mut self.created
        } else {
            &mut self.existing
        };
        *counter.entry(model).or_default() += 1;
    }

    fn fail(&mut self, model: &'static str, message: String) {
        tracing::warn!(model, error = %message, "import row skipped");
        self.errors.push(format!("{}: {}", model, message));
    }
}

type Row = BTreeMap<String, String>;

fn column<'a>(row: &'a Row, name: &str) -> Result<&'a str, String> {
    row.get(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing column '{}'", name))
}

fn rows_for<'a>(sections: &'a [Section], model: &str) -> impl Iterator<Item = &'a Row> {
    let model = model.to_string();
    sections
        .iter()
        .filter(move |s| s.model.eq_ignore_ascii_case(&model))
        .flat_map(|s| s.rows.iter())
}

/// Read and import a sectional CSV file. A missing or unreadable file is an
/// error; bad rows are not.
pub async fn import_file<S: Catalog>(store: &S, path: &Path) -> Result<ImportReport, TransferError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TransferError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    import_str(store, &text).await
}

pub async fn import_str<S: Catalog>(store: &S, text: &str) -> Result<ImportReport, TransferError> {
    let sections = read_sections(text)?;
    for section in &sections {
        if !IMPORT_ORDER
            .iter()
            .any(|known| known.eq_ignore_ascii_case(&section.model))
        {
            tracing::warn!(model = %section.model, "ignoring unknown section");
        }
    }
    Ok(import_sections(store, &sections).await)
}

pub async fn import_sections<S: Catalog>(store: &S, sections: &[Section]) -> ImportReport {
    let mut report = ImportReport::default();

    for row in rows_for(sections, "Publisher") {
        match import_publisher(store, row).await {
            Ok(created) => report.record("Publisher", created),
            Err(message) => report.fail("Publisher", message),
        }
    }
    for row in rows_for(sections, "Book") {
        match import_book(store, row).await {
            Ok(created) => report.record("Book", created),
            Err(message) => report.fail("Book", message),
        }
    }
    for row in rows_for(sections, "Contributor") {
        match import_contributor(store, row).await {
            Ok(created) => report.record("Contributor", created),
            Err(message) => report.fail("Contributor", message),
        }
    }
    for row in rows_for(sections, "BookContributor") {
        match import_book_contributor(store, row).await {
            Ok(created) => report.record("BookContributor", created),
            Err(message) => report.fail("BookContributor", message),
        }
    }
    for row in rows_for(sections, "Review") {
        match import_review(store, row).await {
            Ok(created) => report.record("Review", created),
            Err(message) => report.fail("Review", message),
        }
    }

    tracing::info!(
        created = report.total_created(),
        errors = report.errors.len(),
        "import complete"
    );
    report
}

async fn import_publisher<S: Catalog>(store: &S, row: &Row) -> Result<bool, String> {
    let name = column(row, "publisher_name")?;
    if store
        .find_publisher_by_name(name)
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Ok(false);
    }
    store
        .create_publisher(NewPublisher {
            name: name.to_string(),
            website: column(row, "publisher_website")?.to_string(),
            email: column(row, "publisher_email")?.to_string(),
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(true)
}

async fn import_book<S: Catalog>(store: &S, row: &Row) -> Result<bool, String> {
    let publisher_name = column(row, "book_publisher_name")?;
    let publisher = store
        .find_publisher_by_name(publisher_name)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("publisher not found: {}", publisher_name))?;

    let raw_date = column(row, "book_publication_date")?;
    let publication_date = Date::parse(raw_date.trim(), BOOK_DATE)
        .map_err(|e| format!("bad publication date '{}': {}", raw_date, e))?;

    let title = column(row, "book_title")?;
    if store
        .find_book_by_title(title)
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Ok(false);
    }
    store
        .create_book(NewBook {
            title: title.to_string(),
            publication_date,
            isbn: column(row, "book_isbn")?.to_string(),
            publisher_id: publisher.id,
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(true)
}

async fn import_contributor<S: Catalog>(store: &S, row: &Row) -> Result<bool, String> {
    let new = NewContributor {
        first_names: column(row, "contributor_first_names")?.to_string(),
        last_names: column(row, "contributor_last_names")?.to_string(),
        email: column(row, "contributor_email")?.to_string(),
    };
    if store
        .find_contributor(&new)
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Ok(false);
    }
    store
        .create_contributor(new)
        .await
        .map_err(|e| e.to_string())?;
    Ok(true)
}

async fn import_book_contributor<S: Catalog>(store: &S, row: &Row) -> Result<bool, String> {
    let title = column(row, "book_contributor_book")?;
    let email = column(row, "book_contributor_contributor")?;
    let role: ContributionRole = column(row, "book_contributor_role")?
        .parse()
        .map_err(|e: UnknownRole| e.to_string())?;

    let book = store
        .find_book_by_title(title)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("book not found: {}", title))?;
    let contributor = store
        .find_contributor_by_email(email)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("contributor not found: {}", email))?;

    match store.link_contributor(book.id, contributor.id, role).await {
        Ok(_) => Ok(true),
        Err(StoreError::UniqueViolation { .. }) => Ok(false),
        Err(e) => Err(e.to_string()),
    }
}

async fn import_review<S: Catalog>(store: &S, row: &Row) -> Result<bool, String> {
    let creator_email = column(row, "review_creator")?;
    let title = column(row, "review_book")?;

    let book = store
        .find_book_by_title(title)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("book not found for review: {}", title))?;
    let (creator, _) = store
        .get_or_create_user(NewUser {
            username: creator_email.to_string(),
            email: creator_email.to_string(),
        })
        .await
        .map_err(|e| e.to_string())?;

    if store
        .find_review(book.id, creator.id)
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Ok(false);
    }

    let raw_rating = column(row, "review_rating")?;
    let rating: u8 = raw_rating
        .trim()
        .parse()
        .map_err(|_| format!("bad rating '{}'", raw_rating))?;

    store
        .create_review(NewReview {
            book_id: book.id,
            creator_id: creator.id,
            content: column(row, "review_content")?.to_string(),
            rating,
            date_created: Some(parse_review_date(column(row, "review_date_created")?)?),
            date_edited: Some(parse_review_date(column(row, "review_date_edited")?)?),
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(true)
}

fn parse_review_date(raw: &str) -> Result<time::OffsetDateTime, String> {
    Date::parse(raw.trim(), REVIEW_DATE)
        .map(|date| date.midnight().assume_utc())
        .map_err(|e| format!("bad review date '{}': {}", raw, e))
}

/// What [`export_file`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Data rows across all sections, headers excluded.
    pub records: usize,
    pub bytes: usize,
}

/// Render the whole catalog in the format [`import_str`] reads.
pub async fn export_string<S: Catalog>(store: &S) -> Result<String, TransferError> {
    render(store).await.map(|(text, _)| text)
}

async fn render<S: Catalog>(store: &S) -> Result<(String, usize), TransferError> {
    let mut out = String::new();
    let mut records = 0;

    let publishers = store.list_publishers().await?;
    let publisher_names: HashMap<PublisherId, String> = publishers
        .iter()
        .map(|p| (p.id, p.name.clone()))
        .collect();
    let rows: Vec<Vec<String>> = publishers
        .iter()
        .map(|p| vec![p.name.clone(), p.website.clone(), p.email.clone()])
        .collect();
    records += rows.len();
    write_section(
        &mut out,
        "Publisher",
        &["publisher_name", "publisher_website", "publisher_email"],
        &rows,
    );

    let books = store.list_books().await?;
    let book_titles: HashMap<BookId, String> =
        books.iter().map(|b| (b.id, b.title.clone())).collect();
    let mut rows = Vec::with_capacity(books.len());
    for book in &books {
        rows.push(vec![
            book.title.clone(),
            book.publication_date.format(BOOK_DATE)?,
            book.isbn.clone(),
            publisher_names
                .get(&book.publisher_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("publisher", book.publisher_id))?,
        ]);
    }
    records += rows.len();
    write_section(
        &mut out,
        "Book",
        &[
            "book_title",
            "book_publication_date",
            "book_isbn",
            "book_publisher_name",
        ],
        &rows,
    );

    let contributors = store.list_contributors().await?;
    let contributor_emails: HashMap<ContributorId, String> = contributors
        .iter()
        .map(|c| (c.id, c.email.clone()))
        .collect();
    let rows: Vec<Vec<String>> = contributors
        .iter()
        .map(|c| {
            vec![
                c.first_names.clone(),
                c.last_names.clone(),
                c.email.clone(),
            ]
        })
        .collect();
    records += rows.len();
    write_section(
        &mut out,
        "Contributor",
        &[
            "contributor_first_names",
            "contributor_last_names",
            "contributor_email",
        ],
        &rows,
    );

    let mut rows = Vec::new();
    for link in store.list_book_contributors().await? {
        let title = book_titles
            .get(&link.book_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("book", link.book_id))?;
        let email = contributor_emails
            .get(&link.contributor_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("contributor", link.contributor_id))?;
        rows.push(vec![title, email, link.role.label().to_string()]);
    }
    records += rows.len();
    write_section(
        &mut out,
        "BookContributor",
        &[
            "book_contributor_book",
            "book_contributor_contributor",
            "book_contributor_role",
        ],
        &rows,
    );

    let mut rows = Vec::new();
    for review in store.list_reviews().await? {
        let creator = store.get_user(review.creator_id).await?;
        let title = book_titles
            .get(&review.book_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("book", review.book_id))?;
        rows.push(vec![
            review.content.clone(),
            review.rating.to_string(),
            review.date_created.date().format(REVIEW_DATE)?,
            review.date_edited.date().format(REVIEW_DATE)?,
            creator.email,
            title,
        ]);
    }
    records += rows.len();
    write_section(
        &mut out,
        "Review",
        &[
            "review_content",
            "review_rating",
            "review_date_created",
            "review_date_edited",
            "review_creator",
            "review_book",
        ],
        &rows,
    );

    Ok((out, records))
}

pub async fn export_file<S: Catalog>(
    store: &S,
    path: &Path,
) -> Result<ExportSummary, TransferError> {
    let (text, records) = render(store).await?;
    tokio::fs::write(path, text.as_bytes())
        .await
        .map_err(|source| TransferError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ExportSummary {
        records,
        bytes: text.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repository::*;

    const SAMPLE: &str = "content:Publisher\n\
publisher_name,publisher_website,publisher_email\n\
Packt Publishing,https://www.packtpub.com,info@packtpub.com\n\
\n\
content:Book\n\
book_title,book_publication_date,book_isbn,book_publisher_name\n\
Web Development with Django,2021/02/25,9781839212505,Packt Publishing\n\
Lost Book,2021/02/25,000,Nobody Press\n\
Bad Date,25-02-2021,111,Packt Publishing\n\
\n\
content:Contributor\n\
contributor_first_names,contributor_last_names,contributor_email\n\
Ben,Shaw,ben@example.com\n\
Saurabh,Badhwar,saurabh@example.com\n\
\n\
content:BookContributor\n\
book_contributor_book,book_contributor_contributor,book_contributor_role\n\
Web Development with Django,ben@example.com,AUTHOR\n\
Web Development with Django,saurabh@example.com,Co-Author\n\
\n\
content:Review\n\
review_content,review_rating,review_date_created,review_date_edited,review_creator,review_book\n\
\"Great, practical book\",5,2021-03-01,2021-03-02,reader@example.com,Web Development with Django\n";

    #[tokio::test]
    async fn import_creates_records_and_reports_bad_rows() {
        let store = MemoryStore::new();
        let report = import_str(&store, SAMPLE).await.unwrap();

        assert_eq!(report.created("Publisher"), 1);
        assert_eq!(report.created("Book"), 1);
        assert_eq!(report.created("Contributor"), 2);
        assert_eq!(report.created("BookContributor"), 2);
        assert_eq!(report.created("Review"), 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("publisher not found: Nobody Press"));
        assert!(report.errors[1].contains("bad publication date"));

        let book = store
            .find_book_by_title("Web Development with Django")
            .await
            .unwrap()
            .unwrap();
        let reviews = store.reviews_for_book(book.id).await.unwrap();
        assert_eq!(reviews[0].content, "Great, practical book");
        assert_eq!(reviews[0].date_created.date().to_string(), "2021-03-01");
    }

    #[tokio::test]
    async fn reimport_creates_nothing() {
        let store = MemoryStore::new();
        import_str(&store, SAMPLE).await.unwrap();
        let second = import_str(&store, SAMPLE).await.unwrap();

        assert_eq!(second.total_created(), 0);
        assert_eq!(second.existing["Publisher"], 1);
        assert_eq!(second.existing["BookContributor"], 2);
    }

    #[tokio::test]
    async fn export_can_be_reimported() {
        let source = MemoryStore::new();
        import_str(&source, SAMPLE).await.unwrap();
        let exported = export_string(&source).await.unwrap();

        let target = MemoryStore::new();
        let report = import_str(&target, &exported).await.unwrap();

        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(source.counts().await, target.counts().await);
    }

    #[tokio::test]
    async fn export_counts_rows_written_not_rows_created() {
        let store = MemoryStore::new();
        import_str(&store, SAMPLE).await.unwrap();
        let second = import_str(&store, SAMPLE).await.unwrap();
        assert_eq!(second.total_created(), 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let summary = export_file(&store, &path).await.unwrap();

        assert_eq!(summary.records, 7);
        assert_eq!(
            summary.bytes,
            std::fs::read_to_string(&path).unwrap().len()
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let err = import_file(&store, &dir.path().join("absent.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Read { .. }));
    }

    #[tokio::test]
    async fn export_file_writes_sections() {
        let store = MemoryStore::new();
        import_str(&store, SAMPLE).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        let summary = export_file(&store, &path).await.unwrap();
        assert_eq!(summary.records, 7);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("content:BookContributor"));
        assert!(written.contains("Web Development with Django,ben@example.com,Author"));
    }
}
