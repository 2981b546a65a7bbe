//! HTML bodies for the feature and cluster popups.

use std::fmt::Write as _;

use crate::cluster::ClusterSummary;
use crate::projection::{ProjectedData, field_text};

/// Escapes text for element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Header, location block and attribute table of a feature popup.
///
/// The `(onp)` suffix is emitted only for a truthy identifier; the location
/// block is always emitted, with empty text for missing fields.
pub fn render_feature_popup(data: &ProjectedData) -> String {
    let mut html = String::new();

    html.push_str("<h2 class=\"popup-header\">");
    html.push_str(&escape_html(&data.title));
    if let Some(onp) = data.onp.as_ref().filter(|v| v.is_truthy()) {
        let _ = write!(
            html,
            "<span class=\"popup-onp\"> ({})</span>",
            escape_html(&onp.to_string())
        );
    }
    html.push_str("</h2>");

    let _ = write!(
        html,
        "<div class=\"popup-location\">\
         <div>{}</div>\
         <div class=\"popup-location-district\">{}</div>\
         <div class=\"popup-population\">{} жителей</div>\
         </div>",
        escape_html(&field_text(data.region.as_ref())),
        escape_html(&field_text(data.district.as_ref())),
        escape_html(&field_text(data.population.as_ref())),
    );

    html.push_str("<table class=\"properties-table\"><tbody>");
    for attr in &data.attributes {
        let row_class = if attr.highlight { " class=\"prop-highlight\"" } else { "" };
        let _ = write!(
            html,
            "<tr{row_class}><td class=\"prop-key\">{}</td><td class=\"prop-value\">{}</td></tr>",
            escape_html(&attr.key),
            escape_html(&attr.value.to_string()),
        );
    }
    html.push_str("</tbody></table>");

    html
}

pub fn render_cluster_popup(summary: &ClusterSummary) -> String {
    format!(
        "<div class=\"cluster-popup-count\">{}</div>",
        summary.point_count
    )
}
