//! Books API.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{Body, ShelfmarkClient};
use crate::error::{Error, Result};
use crate::types::{Book, BookDraft, BookQuery, PagedResult, ParseTextRequest};

/// An image to upload as a book cover or for recognition.
#[derive(Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::Validation(format!("Cannot read image '{}': {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    fn into_part(self) -> Result<Part> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| Error::Validation(format!("Invalid image content type: {}", e)))
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The add-book form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Optional cover image, sent as `imageFile`.
    #[serde(skip)]
    pub image: Option<ImageFile>,
}

impl NewBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Reject the form before it reaches the network.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        Ok(())
    }

    /// Copy every field the draft recognized into the form.
    ///
    /// Fields the draft left empty keep their current value.
    pub fn apply_draft(&mut self, draft: &BookDraft) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                *slot = Some(v.clone());
            }
        }

        if let Some(title) = draft.title.as_ref().filter(|t| !t.is_empty()) {
            self.title = title.clone();
        }
        fill(&mut self.authors, &draft.authors);
        fill(&mut self.isbn, &draft.isbn);
        fill(&mut self.description, &draft.description);
        fill(&mut self.publisher, &draft.publisher);
        fill(&mut self.publication_date, &draft.publication_date);
        fill(&mut self.annotation, &draft.annotation);
        if let Some(pages) = draft.pages.filter(|p| *p > 0) {
            self.pages = Some(pages);
        }
    }

    /// Encode as multipart, leaving out empty fields.
    pub fn into_form(self) -> Result<Form> {
        let pages = self.pages.map(|p| p.to_string());
        let fields = [
            ("title", Some(self.title)),
            ("authors", self.authors),
            ("isbn", self.isbn),
            ("description", self.description),
            ("publisher", self.publisher),
            ("pages", pages),
            ("publicationDate", self.publication_date),
            ("annotation", self.annotation),
        ];

        let mut form = Form::new();
        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form = form.text(name, value);
            }
        }
        if let Some(image) = self.image {
            form = form.part("imageFile", image.into_part()?);
        }
        Ok(form)
    }
}

/// Books API client.
pub struct BooksApi {
    client: ShelfmarkClient,
}

impl BooksApi {
    pub(crate) fn new(client: ShelfmarkClient) -> Self {
        Self { client }
    }

    /// List one page of books.
    pub async fn list(&self, query: &BookQuery) -> Result<PagedResult<Book>> {
        self.client.get_with_query("books", query).await
    }

    /// List every book without pagination.
    pub async fn all(&self) -> Result<Vec<Book>> {
        self.client.get("books/all").await
    }

    /// Add a book. A blank title fails validation without a request.
    pub async fn create(&self, book: NewBook) -> Result<Book> {
        book.validate()?;
        let form = book.into_form()?;
        self.client.post("books", Body::Multipart(form)).await
    }

    /// Delete a book.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&book_path(id)?).await
    }

    /// Recognize book fields in free text.
    pub async fn parse_text(&self, text: &str) -> Result<BookDraft> {
        let request = ParseTextRequest {
            text: text.to_string(),
        };
        self.client
            .post("books/parse-text", Body::json(&request)?)
            .await
    }

    /// Recognize book fields in a photo of a cover or title page.
    pub async fn parse_image(&self, image: ImageFile) -> Result<BookDraft> {
        let form = Form::new().part("file", image.into_part()?);
        self.client
            .post("books/parse-image", Body::Multipart(form))
            .await
    }
}

/// API path of one book, with the id encoded as a single path segment.
fn book_path(id: &str) -> Result<String> {
    // Dot segments are dropped by URL normalization, not encoded.
    if matches!(id.trim(), "" | "." | "..") {
        return Err(Error::Validation(format!("Invalid book id '{}'", id)));
    }
    let mut url = Url::parse("http://localhost/books")?;
    url.path_segments_mut()
        .map_err(|()| Error::Validation(format!("Invalid book id '{}'", id)))?
        .push(id);
    Ok(url.path().trim_start_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookOrderBy;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn book_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "createdDate": "2024-03-01T10:00:00Z",
            "userId": "u1"
        })
    }

    async fn client(server: &MockServer) -> ShelfmarkClient {
        ShelfmarkClient::builder()
            .base_url(server.uri())
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        assert!(matches!(
            NewBook::new("   ").validate(),
            Err(Error::Validation(_))
        ));
        assert!(NewBook::new("Dune").validate().is_ok());
    }

    #[test]
    fn test_apply_draft_only_fills_recognized_fields() {
        let mut form = NewBook {
            title: "Working title".to_string(),
            annotation: Some("my notes".to_string()),
            ..Default::default()
        };
        form.apply_draft(&BookDraft {
            title: Some("Dune".to_string()),
            authors: Some("Frank Herbert".to_string()),
            publisher: Some(String::new()),
            pages: Some(0),
            ..Default::default()
        });

        assert_eq!(form.title, "Dune");
        assert_eq!(form.authors.as_deref(), Some("Frank Herbert"));
        assert_eq!(form.annotation.as_deref(), Some("my notes"));
        assert!(form.publisher.is_none());
        assert!(form.pages.is_none());
    }

    #[tokio::test]
    async fn test_list_sends_exactly_the_query_parameters() {
        let server = MockServer::start().await;
        let page = serde_json::json!({
            "items": [book_json("b11", "Emma")],
            "totalCount": 11,
            "page": 2,
            "pageSize": 10,
            "totalPages": 2
        });
        Mock::given(method("GET"))
            .and(path("/books"))
            .and(query_param("page", "2"))
            .and(query_param("pageSize", "10"))
            .and(query_param("orderBy", "Title"))
            .and(query_param("ascending", "false"))
            .respond_with(move |req: &Request| {
                if req.url.query_pairs().count() == 4 {
                    ResponseTemplate::new(200).set_body_json(page.clone())
                } else {
                    ResponseTemplate::new(400)
                }
            })
            .expect(1)
            .mount(&server)
            .await;

        let query = BookQuery {
            page: Some(2),
            page_size: Some(10),
            order_by: Some(BookOrderBy::Title),
            ascending: Some(false),
        };
        let result = client(&server).await.books().list(&query).await.unwrap();
        assert_eq!(result.page, 2);
        assert_eq!(result.items[0].title, "Emma");
        assert!(result.is_consistent());
    }

    #[tokio::test]
    async fn test_list_omits_unset_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(|req: &Request| {
                if req.url.query().is_none() {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "items": [],
                        "totalCount": 0,
                        "page": 1,
                        "pageSize": 10,
                        "totalPages": 0
                    }))
                } else {
                    ResponseTemplate::new(400)
                }
            })
            .mount(&server)
            .await;

        let result = client(&server)
            .await
            .books()
            .list(&BookQuery::default())
            .await
            .unwrap();
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn test_create_sends_multipart_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/books"))
            .and(body_string_contains("name=\"title\""))
            .and(body_string_contains("name=\"publicationDate\""))
            .and(body_string_contains("name=\"imageFile\"; filename=\"cover.png\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(book_json("b1", "Dune")))
            .expect(1)
            .mount(&server)
            .await;

        let book = NewBook {
            title: "Dune".to_string(),
            publication_date: Some("1965-08-01".to_string()),
            isbn: Some(String::new()),
            image: Some(ImageFile::new("cover.png", "image/png", b"png-bytes".to_vec())),
            ..Default::default()
        };
        let created = client(&server).await.books().create(book).await.unwrap();
        assert_eq!(created.id, "b1");
    }

    #[tokio::test]
    async fn test_create_with_blank_title_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .books()
            .create(NewBook::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_parse_image_uploads_file_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/books/parse-image"))
            .and(body_string_contains("name=\"file\"; filename=\"page.jpg\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "title": "Dune", "pages": 412 })),
            )
            .mount(&server)
            .await;

        let draft = client(&server)
            .await
            .books()
            .parse_image(ImageFile::new("page.jpg", "image/jpeg", b"jpeg-bytes".to_vec()))
            .await
            .unwrap();
        assert_eq!(draft.title.as_deref(), Some("Dune"));
        assert_eq!(draft.pages, Some(412));
    }

    #[tokio::test]
    async fn test_image_from_path_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        std::fs::write(&path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

        let image = ImageFile::from_path(&path).await.unwrap();
        assert_eq!(image.file_name, "cover.png");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes.len(), 4);

        let missing = ImageFile::from_path(&dir.path().join("nope.png")).await;
        assert!(matches!(missing, Err(Error::Validation(_))));
    }

    #[test]
    fn test_book_path_encodes_id_as_one_segment() {
        assert_eq!(book_path("b1").unwrap(), "books/b1");
        assert_eq!(book_path("a/b").unwrap(), "books/a%2Fb");
        assert_eq!(book_path("x?y#z").unwrap(), "books/x%3Fy%23z");
        assert!(matches!(book_path(".."), Err(Error::Validation(_))));
        assert!(matches!(book_path(" "), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_escapes_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/books/a%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.books().delete("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_dot_segment_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).await.books().delete("..").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
