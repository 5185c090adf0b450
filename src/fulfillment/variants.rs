// src/fulfillment/variants.rs

//! Maps a (catalog product, size, color) request to the single concrete
//! variant id to submit. Matching runs against the live product definition
//! fetched at submission time; variant titles look like
//! "Bella Canvas / Black / S".

use thiserror::Error;

use crate::services::printify::ProviderProduct;

#[derive(Debug, Clone, Error)]
#[error(
  "no unique variant on product '{product_id}' for size '{size}' / color '{color}' \
   ({match_count} matched); available: {}",
  available_titles.join("; ")
)]
pub struct VariantResolutionError {
  pub product_id: String,
  pub size: String,
  pub color: String,
  pub match_count: usize,
  /// Full list of variant titles, for operator diagnosis.
  pub available_titles: Vec<String>,
}

/// Returns the one enabled variant whose title carries the requested color
/// (case-insensitive substring) and the requested size as a whole
/// "/"-delimited token. Token matching is what keeps "S" from matching
/// inside "XS" or "2XS". Zero or multiple matches are a configuration
/// problem for the caller to surface, never something to guess around.
pub fn resolve_variant(product: &ProviderProduct, size: &str, color: &str) -> Result<i64, VariantResolutionError> {
  let matches: Vec<i64> = product
    .variants
    .iter()
    .filter(|v| v.is_enabled && title_matches(&v.title, size, color))
    .map(|v| v.id)
    .collect();

  if matches.len() == 1 {
    tracing::debug!(
      product_id = %product.id,
      variant_id = matches[0],
      size,
      color,
      "Resolved variant from live catalog"
    );
    return Ok(matches[0]);
  }

  Err(VariantResolutionError {
    product_id: product.id.clone(),
    size: size.to_string(),
    color: color.to_string(),
    match_count: matches.len(),
    available_titles: product.variants.iter().map(|v| v.title.clone()).collect(),
  })
}

fn title_matches(title: &str, size: &str, color: &str) -> bool {
  if !title.to_lowercase().contains(&color.to_lowercase()) {
    return false;
  }
  title
    .split('/')
    .map(str::trim)
    .any(|segment| segment.eq_ignore_ascii_case(size.trim()))
}

/// Legacy size table for the original Bella Canvas 3001 catalog product,
/// kept strictly as a degraded fallback for when the live catalog lookup is
/// unreachable. Gated behind `PRINTWORKS_ALLOW_STATIC_VARIANT_FALLBACK`
/// because a stale id can ship the wrong garment.
const STATIC_SIZE_VARIANTS: &[(&str, i64)] = &[
  ("S", 12100),
  ("M", 12101),
  ("L", 12102),
  ("XL", 12103),
  ("2XL", 12104),
];

pub fn static_fallback_variant(size: &str) -> Option<i64> {
  STATIC_SIZE_VARIANTS
    .iter()
    .find(|(s, _)| s.eq_ignore_ascii_case(size.trim()))
    .map(|(_, id)| *id)
}
