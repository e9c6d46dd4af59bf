//! HTML snippets for map popups and tooltips.
//!
//! Values are substituted as-is; callers escape anything untrusted.

use crate::types::PlaceRecord;

pub fn popup_html(name: &str, address: &str, url: &str) -> String {
    format!(
        "<div>\n    \
         <h4 style=\"margin-bottom:0;\"><a href=\"{url}\" target=\"_blank\">{name}</a></h4>\n    \
         <p style=\"margin-top:0;\"><strong>Address:</strong> {address}</p>\n\
         </div>"
    )
}

pub fn tooltip_html(name: &str) -> String {
    format!("<div style='font-size: 12px; font-weight: bold;'>{name}</div>")
}

/// Street and postcode joined with `, `, skipping whichever is missing.
pub fn address(place: &PlaceRecord) -> String {
    [place.street_name.as_deref(), place.postcode.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
