//! Books command - list, add, delete and recognize books.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::{Style, style};

use shelfmark_client::{
    Book, BookDraft, BookOrderBy, BookQuery, Bookshelf, FetchOutcome, ImageFile, NewBook,
    ShelfState,
};

use super::{Context, print_json};
use crate::session::Session;

/// Arguments for the books command.
#[derive(Args, Debug)]
pub struct BooksArgs {
    #[command(subcommand)]
    pub command: BooksCommand,
}

#[derive(Subcommand, Debug)]
pub enum BooksCommand {
    /// List one page of books
    List {
        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Books per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort key: title, author, published, added
        #[arg(long)]
        order_by: Option<BookOrderBy>,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// List every book
    All,

    /// Add a book
    Add(AddArgs),

    /// Delete a book
    Delete {
        /// Book ID
        id: String,
    },

    /// Recognize book fields in free text
    ParseText {
        /// Text to parse (e.g. a copied catalog entry)
        text: String,
    },

    /// Recognize book fields in a photo of a cover or title page
    ParseImage {
        /// Image file
        path: PathBuf,
    },
}

/// Fields for a new book. Explicit flags win over recognized text.
#[derive(Args, Debug, Default)]
pub struct AddArgs {
    /// Title
    #[arg(long)]
    pub title: Option<String>,

    /// Authors, as one display string
    #[arg(long)]
    pub authors: Option<String>,

    #[arg(long)]
    pub isbn: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub publisher: Option<String>,

    /// Page count
    #[arg(long)]
    pub pages: Option<u32>,

    /// Publication date (e.g. 1965-08-01)
    #[arg(long)]
    pub published: Option<String>,

    /// Personal note
    #[arg(long)]
    pub annotation: Option<String>,

    /// Cover image to upload
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Prefill fields by recognizing this text first
    #[arg(long)]
    pub from_text: Option<String>,
}

impl AddArgs {
    /// Draft-of-flags: the values given on the command line.
    fn as_draft(&self) -> BookDraft {
        BookDraft {
            title: self.title.clone(),
            authors: self.authors.clone(),
            publication_date: self.published.clone(),
            isbn: self.isbn.clone(),
            description: self.description.clone(),
            publisher: self.publisher.clone(),
            pages: self.pages,
            annotation: self.annotation.clone(),
        }
    }
}

/// Run the books command.
pub async fn run(args: BooksArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let shelf = session.shelf();
    let result = dispatch(args.command, &shelf, ctx).await;
    drop(shelf);
    session.close().await;
    result
}

async fn dispatch(command: BooksCommand, shelf: &Bookshelf, ctx: &Context) -> Result<()> {
    match command {
        BooksCommand::List {
            page,
            page_size,
            order_by,
            desc,
        } => {
            let query = BookQuery {
                page,
                page_size,
                order_by,
                ascending: (order_by.is_some() || desc).then_some(!desc),
            };
            cmd_list(shelf, query, ctx).await
        }
        BooksCommand::All => cmd_all(shelf, ctx).await,
        BooksCommand::Add(args) => cmd_add(shelf, args, ctx).await,
        BooksCommand::Delete { id } => cmd_delete(shelf, &id, ctx).await,
        BooksCommand::ParseText { text } => cmd_parse_text(shelf, &text, ctx).await,
        BooksCommand::ParseImage { path } => cmd_parse_image(shelf, &path, ctx).await,
    }
}

async fn cmd_list(shelf: &Bookshelf, query: BookQuery, ctx: &Context) -> Result<()> {
    if shelf.fetch_books(query).await? == FetchOutcome::Superseded {
        return Ok(());
    }
    let state = shelf.snapshot();

    if ctx.json_output {
        return print_json(&serde_json::json!({
            "items": state.books,
            "totalCount": state.total_count,
            "page": state.current_page,
            "totalPages": state.total_pages,
        }));
    }

    print_books(&state.books);
    println!();
    println!("{}", style(page_footer(&state)).dim());
    Ok(())
}

async fn cmd_all(shelf: &Bookshelf, ctx: &Context) -> Result<()> {
    shelf.fetch_all_books().await?;
    let state = shelf.snapshot();

    if ctx.json_output {
        return print_json(&state.books);
    }
    print_books(&state.books);
    Ok(())
}

async fn cmd_add(shelf: &Bookshelf, args: AddArgs, ctx: &Context) -> Result<()> {
    let mut book = NewBook::default();

    if let Some(text) = &args.from_text
        && let Some(draft) = shelf.parse_book_text(text).await?
    {
        book.apply_draft(&draft);
    }
    book.apply_draft(&args.as_draft());

    if let Some(path) = &args.image {
        book.image = Some(ImageFile::from_path(path).await?);
    }

    let created = shelf.add_book(book).await?;

    if ctx.json_output {
        print_json(&created)?;
    } else {
        let green = Style::new().green();
        println!(
            "{} Added {} {}",
            green.apply_to("✓"),
            style(&created.title).bold(),
            style(format!("[{}]", created.id)).dim()
        );
    }
    Ok(())
}

async fn cmd_delete(shelf: &Bookshelf, id: &str, ctx: &Context) -> Result<()> {
    shelf
        .delete_book(id)
        .await
        .with_context(|| format!("Could not delete book {}", id))?;

    if ctx.json_output {
        print_json(&serde_json::json!({ "deleted": id }))?;
    } else {
        let green = Style::new().green();
        println!("{} Deleted {}", green.apply_to("✓"), style(id).dim());
    }
    Ok(())
}

async fn cmd_parse_text(shelf: &Bookshelf, text: &str, ctx: &Context) -> Result<()> {
    match shelf.parse_book_text(text).await? {
        Some(draft) => print_draft(&draft, ctx),
        None => {
            println!("{}", style("Nothing to parse").dim());
            Ok(())
        }
    }
}

async fn cmd_parse_image(shelf: &Bookshelf, path: &std::path::Path, ctx: &Context) -> Result<()> {
    let image = ImageFile::from_path(path).await?;
    let draft = shelf.parse_book_image(image).await?;
    print_draft(&draft, ctx)
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_books(books: &[Book]) {
    let dim = Style::new().dim();

    println!("{}", style("Books").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if books.is_empty() {
        println!("{}", dim.apply_to("No books yet"));
        return;
    }
    for book in books {
        let authors = book.authors.as_deref().unwrap_or("Unknown author");
        println!(
            "{}  {}",
            style(&book.title).bold(),
            dim.apply_to(format!("{} [{}]", authors, book.id))
        );
    }
}

fn page_footer(state: &ShelfState) -> String {
    let noun = if state.total_count == 1 { "book" } else { "books" };
    format!(
        "Page {} of {} ({} {})",
        state.current_page,
        state.total_pages.max(1),
        state.total_count,
        noun
    )
}

fn print_draft(draft: &BookDraft, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(draft);
    }

    let dim = Style::new().dim();
    let pages = draft.pages.map(|p| p.to_string());
    let fields = [
        ("Title", draft.title.as_deref()),
        ("Authors", draft.authors.as_deref()),
        ("Published", draft.publication_date.as_deref()),
        ("ISBN", draft.isbn.as_deref()),
        ("Publisher", draft.publisher.as_deref()),
        ("Pages", pages.as_deref()),
        ("Description", draft.description.as_deref()),
        ("Annotation", draft.annotation.as_deref()),
    ];

    let mut any = false;
    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            println!("{:<12} {}", dim.apply_to(label), value);
            any = true;
        }
    }
    if !any {
        println!("{}", dim.apply_to("No book details recognized"));
    }
    Ok(())
}
