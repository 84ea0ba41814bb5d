//! User-facing message catalog in English and Japanese.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::header::ACCEPT_LANGUAGE, http::request::Parts};
use once_cell::sync::Lazy;

/// Language a response is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    /// BCP 47 primary tag.
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ja => "ja",
        }
    }

    /// Pick the supported language the client prefers most.
    ///
    /// Quality values are honoured; ties keep header order. Falls back to English.
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Locale::default();
        };

        let mut best: Option<(f32, Locale)> = None;
        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let tag = parts.next().unwrap_or_default().trim();
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let primary = tag.split('-').next().unwrap_or_default();
            let locale = if primary.eq_ignore_ascii_case("ja") {
                Locale::Ja
            } else if primary.eq_ignore_ascii_case("en") {
                Locale::En
            } else {
                continue;
            };

            if quality > 0.0 && best.map_or(true, |(q, _)| quality > q) {
                best = Some((quality, locale));
            }
        }

        best.map(|(_, locale)| locale).unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        Ok(Locale::from_accept_language(header))
    }
}

static CATALOG: Lazy<HashMap<(Locale, &'static str), &'static str>> = Lazy::new(|| {
    HashMap::from([
        ((Locale::En, "error.booknotfound"), "The requested book does not exist."),
        (
            (Locale::En, "error.optlockfailure"),
            "The book was changed by another user. Reload it and try again.",
        ),
        ((Locale::En, "error.validation"), "Please correct the input errors."),
        ((Locale::En, "validation.not-blank"), "must not be blank"),
        ((Locale::En, "validation.max-size"), "must be at most {max} characters"),
        ((Locale::En, "field.title"), "Title"),
        ((Locale::En, "field.author"), "Author"),
        ((Locale::En, "login.failure"), "Incorrect username or password."),
        ((Locale::En, "login.logout"), "You have been logged out."),
        (
            (Locale::En, "login.session-invalid"),
            "Your session has expired. Please sign in again.",
        ),
        ((Locale::Ja, "error.booknotfound"), "指定された書籍は存在しません。"),
        (
            (Locale::Ja, "error.optlockfailure"),
            "他のユーザーが書籍を更新しました。再読み込みしてからやり直してください。",
        ),
        ((Locale::Ja, "error.validation"), "入力内容に誤りがあります。"),
        ((Locale::Ja, "validation.not-blank"), "空白は許可されていません"),
        ((Locale::Ja, "validation.max-size"), "{max}文字以内で入力してください"),
        ((Locale::Ja, "field.title"), "タイトル"),
        ((Locale::Ja, "field.author"), "著者"),
        ((Locale::Ja, "login.failure"), "ユーザー名またはパスワードが正しくありません。"),
        ((Locale::Ja, "login.logout"), "ログアウトしました。"),
        (
            (Locale::Ja, "login.session-invalid"),
            "セッションが無効になりました。再度ログインしてください。",
        ),
    ])
});

/// Look up `key`, falling back to English and then to the key itself.
pub fn message(locale: Locale, key: &str) -> String {
    CATALOG
        .get(&(locale, key))
        .or_else(|| CATALOG.get(&(Locale::En, key)))
        .map(|text| text.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Look up `key` and substitute `{name}` placeholders.
pub fn message_with(locale: Locale, key: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(message(locale, key), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}
