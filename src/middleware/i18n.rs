// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Primary language subtag from Accept-Language ("pt-BR" -> "pt"), "en" when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| {
                accept_language::parse(raw).first().map(|tag| {
                    tag.split('-').next().unwrap_or(tag.as_str()).to_ascii_lowercase()
                })
            })
            .unwrap_or_else(|| "en".to_string());

        Ok(Locale(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn locale_for(header_value: Option<&str>) -> String {
        let mut builder = Request::builder();
        if let Some(v) = header_value {
            builder = builder.header(header::ACCEPT_LANGUAGE, v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Locale::from_request_parts(&mut parts, &()).await.unwrap().0
    }

    #[tokio::test]
    async fn picks_the_preferred_primary_subtag() {
        assert_eq!(locale_for(Some("pt-BR,pt;q=0.9,en;q=0.8")).await, "pt");
        assert_eq!(locale_for(Some("en-US")).await, "en");
    }

    #[tokio::test]
    async fn defaults_to_english() {
        assert_eq!(locale_for(None).await, "en");
    }
}
