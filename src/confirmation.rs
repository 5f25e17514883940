//! Interpretation of the write endpoint's confirmation document.
//!
//! A reply submission answers with a free-form HTML page whose only
//! machine-readable part is a "system message" container holding either a
//! success marker or an error marker with optional detail text. This is
//! the one place the write path can silently mis-observe the forum's
//! state, so the classifier is deliberately three-state: success,
//! structured error, or "unrecognized, keep the body".

use scraper::{ElementRef, Html, Selector};

use crate::error::ClientError;

/// Classify a reply confirmation document.
///
/// # Errors
///
/// - [`ClientError::ReplyRejected`] when the system message carries an
///   error marker; the marker text is the server's message and an empty
///   detail normalizes to `None`.
/// - [`ClientError::UnknownResponse`] when the system-message container
///   is missing, or carries neither a success nor an error marker.
pub fn interpret_reply_response(body: &str) -> Result<(), ClientError> {
    let document = Html::parse_document(body);
    let container_selector = Selector::parse("div.system-message").expect("Invalid selector");
    let success_selector = Selector::parse("p.success").expect("Invalid selector");
    let error_selector = Selector::parse("p.error").expect("Invalid selector");
    let detail_selector = Selector::parse("p.detail").expect("Invalid selector");

    let Some(container) = document.select(&container_selector).next() else {
        return Err(ClientError::UnknownResponse {
            body: body.to_string(),
        });
    };

    if container.select(&success_selector).next().is_some() {
        return Ok(());
    }

    if let Some(error_element) = container.select(&error_selector).next() {
        let message = element_text(error_element);
        let detail = container
            .select(&detail_selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty());
        return Err(ClientError::ReplyRejected { message, detail });
    }

    Err(ClientError::UnknownResponse {
        body: body.to_string(),
    })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
