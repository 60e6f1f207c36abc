//! Server-rendered HTML pages
//!
//! Every dynamic value goes through `escape_html`.

use bookman_core::{Book, BookForm, Page};

const STYLE: &str = r#"
body{font-family:system-ui,sans-serif;background:#f4f5f7;color:#222;margin:0}
.container{max-width:960px;margin:0 auto;padding:24px}
header{display:flex;justify-content:space-between;align-items:center;margin-bottom:16px}
.card{max-width:380px;margin:80px auto;background:#fff;padding:28px;border-radius:8px;box-shadow:0 1px 4px rgba(0,0,0,.1)}
.btn{display:inline-block;padding:6px 12px;border:0;border-radius:4px;background:#2d6cdf;color:#fff;text-decoration:none;cursor:pointer}
.btn.danger{background:#c0392b}
.alert{padding:10px 14px;border-radius:4px;margin-bottom:14px}
.alert.success{background:#e3f6e8}
.alert.error{background:#fbe4e4}
.alert.info{background:#e6eefb}
table{width:100%;border-collapse:collapse;background:#fff}
th,td{padding:8px;border-bottom:1px solid #ddd;text-align:left}
form.inline{display:inline}
.form-group{margin-bottom:12px}
.form-group label{display:block;margin-bottom:4px}
.form-group input{width:100%;padding:6px;box-sizing:border-box}
.pagination a,.pagination span{margin-right:6px}
"#;

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title} - Bookman</title>
<style>{STYLE}</style>
</head><body>
{body}
</body></html>"#,
        title = escape_html(title),
    )
}

fn alert(kind: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="alert {kind}">{}</div>"#, escape_html(m)))
        .unwrap_or_default()
}

fn csrf_field(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="csrf_token" value="{}">"#,
        escape_html(token)
    )
}

fn header_bar(username: &str) -> String {
    format!(
        r#"<header>
  <h1><a href="/books">Bookman</a></h1>
  <div>
    <span>Signed in as {}</span>
    <a href="/books/add" class="btn">Add book</a>
    <a href="/logout" class="btn danger">Sign out</a>
  </div>
</header>"#,
        escape_html(username)
    )
}

pub struct LoginView<'a> {
    pub csrf_token: &'a str,
    pub username: &'a str,
    pub notice: Option<&'a str>,
    pub error: Option<&'a str>,
    pub locked: bool,
}

pub fn login_page(view: &LoginView<'_>) -> String {
    let disabled = if view.locked { " disabled" } else { "" };
    let body = format!(
        r#"<div class="card">
  <h1>Bookman</h1>
  {notice}{error}
  <form method="post" action="/login">
    {csrf}
    <div class="form-group">
      <label for="username">Username</label>
      <input id="username" type="text" name="username" value="{username}" required autocomplete="username" maxlength="50">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input id="password" type="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn"{disabled}>Sign in</button>
  </form>
</div>"#,
        notice = alert("info", view.notice),
        error = alert("error", view.error),
        csrf = csrf_field(view.csrf_token),
        username = escape_html(view.username),
    );
    document("Sign in", &body)
}

pub fn logout_page(username: &str, csrf_token: &str) -> String {
    let body = format!(
        r#"<div class="card">
  <h1>Sign out</h1>
  <p>End the session for {user}?</p>
  <form method="post" action="/logout">
    {csrf}
    <button type="submit" class="btn danger">Sign out</button>
    <a href="/books">Cancel</a>
  </form>
</div>"#,
        user = escape_html(username),
        csrf = csrf_field(csrf_token),
    );
    document("Sign out", &body)
}

fn book_row(book: &Book, csrf_token: &str) -> String {
    format!(
        r#"<tr>
  <td>{title}</td><td>{author}</td><td>{year}</td><td>{genre}</td>
  <td>
    <a href="/books/{id}/edit">Edit</a>
    <form class="inline" method="post" action="/books/delete" onsubmit="return confirm('Delete this book? This cannot be undone.');">
      {csrf}
      <input type="hidden" name="id" value="{id}">
      <button type="submit" class="btn danger">Delete</button>
    </form>
  </td>
</tr>"#,
        id = book.id,
        title = escape_html(&book.title),
        author = escape_html(&book.author),
        year = book.year.map(|y| y.to_string()).unwrap_or_default(),
        genre = escape_html(book.genre.as_deref().unwrap_or("")),
        csrf = csrf_field(csrf_token),
    )
}

fn pagination(page: &Page<Book>) -> String {
    if page.total_pages <= 1 {
        return String::new();
    }

    let mut links = String::from(r#"<nav class="pagination">"#);
    if page.has_previous() {
        links.push_str(&format!(r#"<a href="/books?page={}">&laquo; Previous</a>"#, page.number - 1));
    }
    for n in 1..=page.total_pages {
        if n == page.number {
            links.push_str(&format!("<span>{n}</span>"));
        } else {
            links.push_str(&format!(r#"<a href="/books?page={n}">{n}</a>"#));
        }
    }
    if page.has_next() {
        links.push_str(&format!(r#"<a href="/books?page={}">Next &raquo;</a>"#, page.number + 1));
    }
    links.push_str("</nav>");
    links
}

pub fn book_list(page: &Page<Book>, username: &str, csrf_token: &str, flash: Option<&str>) -> String {
    let content = if page.items.is_empty() {
        r#"<p>No books yet. <a href="/books/add">Add the first one</a></p>"#.to_string()
    } else {
        let rows: String = page.items.iter().map(|b| book_row(b, csrf_token)).collect();
        format!(
            r#"<table>
<thead><tr><th>Title</th><th>Author</th><th>Year</th><th>Genre</th><th></th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
<p>{total} books, page {number} of {pages}</p>
{nav}"#,
            total = page.total_items,
            number = page.number,
            pages = page.total_pages.max(1),
            nav = pagination(page),
        )
    };

    let body = format!(
        r#"<div class="container">
{header}
{flash}
{content}
</div>"#,
        header = header_bar(username),
        flash = alert("success", flash),
    );
    document("Books", &body)
}

pub struct BookFormView<'a> {
    pub heading: &'a str,
    pub action: &'a str,
    pub form: &'a BookForm,
    pub errors: &'a [String],
    pub username: &'a str,
    pub csrf_token: &'a str,
}

pub fn book_form(view: &BookFormView<'_>) -> String {
    let errors = if view.errors.is_empty() {
        String::new()
    } else {
        let items: String = view
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape_html(e)))
            .collect();
        format!(r#"<div class="alert error"><ul>{items}</ul></div>"#)
    };

    let body = format!(
        r#"<div class="container">
{header}
<h2>{heading}</h2>
{errors}
<form method="post" action="{action}">
  {csrf}
  <div class="form-group">
    <label for="title">Title *</label>
    <input id="title" type="text" name="title" value="{title}" required maxlength="255">
  </div>
  <div class="form-group">
    <label for="author">Author *</label>
    <input id="author" type="text" name="author" value="{author}" required maxlength="255">
  </div>
  <div class="form-group">
    <label for="year">Year</label>
    <input id="year" type="text" name="year" value="{year}" inputmode="numeric">
  </div>
  <div class="form-group">
    <label for="genre">Genre</label>
    <input id="genre" type="text" name="genre" value="{genre}" maxlength="100">
  </div>
  <button type="submit" class="btn">Save</button>
  <a href="/books">Cancel</a>
</form>
</div>"#,
        header = header_bar(view.username),
        heading = escape_html(view.heading),
        action = escape_html(view.action),
        csrf = csrf_field(view.csrf_token),
        title = escape_html(&view.form.title),
        author = escape_html(&view.form.author),
        year = escape_html(&view.form.year),
        genre = escape_html(&view.form.genre),
    );
    document(view.heading, &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<div class="card">
  <h1>Bookman</h1>
  {alert}
  <p><a href="/books">Back to the catalog</a></p>
</div>"#,
        alert = alert("error", Some(message)),
    );
    document("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
        assert_eq!(escape_html("Cien años"), "Cien años");
    }

    #[test]
    fn test_list_escapes_book_fields() {
        let page = Page {
            items: vec![Book {
                id: 7,
                title: "<b>Bold</b>".to_string(),
                author: "O'Brien".to_string(),
                year: Some(1999),
                genre: None,
                created_at: Utc::now(),
            }],
            number: 1,
            page_size: 6,
            total_items: 1,
            total_pages: 1,
        };

        let html = book_list(&page, "admin", "tok", Some("Saved"));
        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
        assert!(html.contains("O&#39;Brien"));
        assert!(html.contains(r#"href="/books/7/edit""#));
        assert!(html.contains(r#"name="csrf_token" value="tok""#));
        assert!(!html.contains("class=\"pagination\""));
    }

    #[test]
    fn test_pagination_links() {
        let page: Page<Book> = Page {
            items: Vec::new(),
            number: 2,
            page_size: 6,
            total_items: 20,
            total_pages: 4,
        };
        let nav = pagination(&page);
        assert!(nav.contains(r#"href="/books?page=1">&laquo; Previous"#));
        assert!(nav.contains("<span>2</span>"));
        assert!(nav.contains(r#"href="/books?page=3">Next &raquo;"#));
    }

    #[test]
    fn test_locked_login_disables_submit() {
        let html = login_page(&LoginView {
            csrf_token: "tok",
            username: "admin",
            notice: None,
            error: Some("Too many failed attempts."),
            locked: true,
        });
        assert!(html.contains("disabled"));
        assert!(html.contains("Too many failed attempts."));
    }
}
