//! Minimal server-rendered HTML for every page the site serves.

use axum::{http::StatusCode, response::Html};

use agora_types::models::Article;

use crate::flash::Flash;

/// Escape text for use in element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn layout(title: &str, flash: Option<&Flash>, content: &str) -> Html<String> {
    let flash = flash
        .map(|f| {
            format!(
                r#"<p class="flash {}">{}</p>"#,
                escape(&f.category),
                escape(&f.message)
            )
        })
        .unwrap_or_default();

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav>
<a href="/">Home</a> <a href="/news">News</a> <a href="/shop">Shop</a> <a href="/game">Games</a>
<a href="/blogs">Blogs</a> <a href="/data_analyzer">Data Analyzer</a>
<a href="/recreational_activities">Recreational Activities</a> <a href="/settings">Settings</a>
</nav>
{flash}
<main>
<h1>{title}</h1>
{content}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

pub fn index(username: Option<&str>, flash: Option<&Flash>) -> Html<String> {
    let greeting = format!("<p>Welcome, {}!</p>", escape(username.unwrap_or("Guest")));
    let actions = if username.is_some() {
        r#"<form method="post" action="/logout"><button type="submit">Log out</button></form>"#
    } else {
        r#"<p><a href="/login">Log in</a> or <a href="/register">register</a>.</p>"#
    };
    layout("Home", flash, &format!("{greeting}\n{actions}"))
}

pub fn login(flash: Option<&Flash>) -> Html<String> {
    layout(
        "Log in",
        flash,
        r#"<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Log in</button>
</form>
<p><a href="/forgot_password">Forgot your password?</a></p>"#,
    )
}

pub fn register(flash: Option<&Flash>) -> Html<String> {
    layout(
        "Register",
        flash,
        r#"<form method="post" action="/register">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<label>Confirm password <input name="confirm_password" type="password" required></label>
<label>Email <input name="email" type="email" required></label>
<label>Security question <input name="security_question" required></label>
<label>Security answer <input name="security_answer" required></label>
<button type="submit">Register</button>
</form>"#,
    )
}

/// `question` is `(username, security_question)` once step one succeeded.
pub fn forgot_password(question: Option<(&str, &str)>, flash: Option<&Flash>) -> Html<String> {
    let content = match question {
        None => r#"<form method="post" action="/forgot_password">
<label>Username <input name="username" required></label>
<button type="submit" name="retrieve_question" value="1">Get security question</button>
</form>"#
            .to_string(),
        Some((username, question)) => format!(
            r#"<form method="post" action="/forgot_password">
<input type="hidden" name="username" value="{username}">
<p>{question}</p>
<label>Answer <input name="security_answer" required></label>
<label>New password <input name="new_password" type="password" required></label>
<button type="submit" name="reset_password" value="1">Reset password</button>
</form>"#,
            username = escape(username),
            question = escape(question),
        ),
    };
    layout("Forgot password", flash, &content)
}

pub fn add_news(flash: Option<&Flash>) -> Html<String> {
    layout(
        "Add news",
        flash,
        r#"<form method="post" action="/add_news" enctype="multipart/form-data">
<label>Title <input name="title" required></label>
<label>Description <input name="description" required></label>
<label>Body <textarea name="body" required></textarea></label>
<label>Image <input name="image" type="file" accept="image/*"></label>
<button type="submit">Publish</button>
</form>"#,
    )
}

pub fn news_list(articles: &[Article], flash: Option<&Flash>) -> Html<String> {
    let mut content = String::from(r#"<p><a href="/add_news">Write an article</a></p>"#);
    if articles.is_empty() {
        content.push_str("<p>No news yet.</p>");
    }
    for article in articles {
        let image = article
            .image_reference
            .as_deref()
            .map(|src| format!(r#"<img src="{}" alt="">"#, escape(src)))
            .unwrap_or_default();
        content.push_str(&format!(
            "<article>\n<h2>{}</h2>\n<p><em>{}</em></p>\n{}\n<p>{}</p>\n<footer>by {} on {}</footer>\n</article>\n",
            escape(&article.title),
            escape(&article.description),
            image,
            escape(&article.body),
            escape(&article.author),
            article.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    layout("News", flash, &content)
}

pub fn settings(username: &str, flash: Option<&Flash>) -> Html<String> {
    let content = format!(
        r#"<p>Signed in as {}</p>
<ul>
<li><a href="/change_password">Change password</a></li>
<li><a href="/change_username">Change username</a></li>
<li><a href="/change_email">Change email</a></li>
<li><a href="/change_cellphone">Change cellphone</a></li>
</ul>
<form method="post" action="/delete_account"><button type="submit">Delete account</button></form>"#,
        escape(username)
    );
    layout("Settings", flash, &content)
}

pub fn change_password(flash: Option<&Flash>) -> Html<String> {
    layout(
        "Change password",
        flash,
        r#"<form method="post" action="/change_password">
<label>Current password <input name="current_password" type="password" required></label>
<label>New password <input name="new_password" type="password" required></label>
<label>Confirm new password <input name="confirm_new_password" type="password" required></label>
<button type="submit">Change password</button>
</form>"#,
    )
}

/// Single-field settings form posting `field` to `action`.
pub fn change_field(title: &str, action: &str, label: &str, field: &str, flash: Option<&Flash>) -> Html<String> {
    let content = format!(
        r#"<form method="post" action="{action}">
<label>{label} <input name="{field}"></label>
<button type="submit">Save</button>
</form>"#,
        action = escape(action),
        label = escape(label),
        field = escape(field),
    );
    layout(title, flash, &content)
}

/// Static page listing `(title, description)` entries.
pub fn placeholder(title: &str, entries: &[(&str, &str)]) -> Html<String> {
    let mut content = String::new();
    if entries.is_empty() {
        content.push_str("<p>Coming soon.</p>");
    }
    for (name, description) in entries {
        content.push_str(&format!(
            "<section><h2>{}</h2><p>{}</p></section>\n",
            escape(name),
            escape(description)
        ));
    }
    layout(title, None, &content)
}

pub fn apology(status: StatusCode, message: &str) -> (StatusCode, Html<String>) {
    let content = format!(
        r#"<p>{}</p>
<p>{}</p>
<p><a href="/">Back to the home page</a></p>"#,
        status.as_u16(),
        escape(message)
    );
    (status, layout("Sorry", None, &content))
}
