// src/models/line_item.rs

//! Typed descriptor for one purchasable checkout line item, plus the pure
//! helpers the payment-event processor uses to reconstruct descriptors from
//! session data: description parsing and discounted-total division.

use serde::Serialize;

/// One non-shipping line item, fully resolved: what was bought, in which
/// size/color, how many, and this item's share of the discounted total.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemDescriptor {
  pub design_id: String,
  pub product_type: String,
  pub color: String,
  pub size: String,
  pub quantity: i64,
  pub total_cents: i64,
}

/// Fallback parse of a human-readable line-item description of the form
/// `"<product type> - <color> - <size>"`. Used only when the session's
/// structured metadata arrays do not cover the item.
pub fn parse_description(description: &str) -> Option<(String, String, String)> {
  // Split from the right: size and color are single tokens, while the product
  // type is free text that may itself contain " - ".
  let mut parts = description.rsplitn(3, " - ").map(str::trim);
  let size = parts.next()?.to_string();
  let color = parts.next()?.to_string();
  let product_type = parts.next()?.to_string();
  if product_type.is_empty() || color.is_empty() || size.is_empty() {
    return None;
  }
  Some((product_type, color, size))
}

/// Splits a session's paid-after-discount total across line items by unit
/// count, so promotional discounts land proportionally in every order rather
/// than only on the item Stripe happened to discount. Remainder cents go to
/// the earliest units so the shares always sum exactly to `total_cents`.
pub fn split_total_cents(total_cents: i64, quantities: &[i64]) -> Vec<i64> {
  let unit_count: i64 = quantities.iter().sum();
  if unit_count <= 0 {
    return quantities.iter().map(|_| 0).collect();
  }
  let per_unit = total_cents / unit_count;
  let mut remainder = total_cents % unit_count;

  quantities
    .iter()
    .map(|&qty| {
      let extra = remainder.min(qty).max(0);
      remainder -= extra;
      per_unit * qty + extra
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_three_part_description() {
    let (product, color, size) = parse_description("Premium T-Shirt - Heather Navy - XL").unwrap();
    assert_eq!(product, "Premium T-Shirt");
    assert_eq!(color, "Heather Navy");
    assert_eq!(size, "XL");
  }

  #[test]
  fn rejects_descriptions_missing_fields() {
    assert!(parse_description("T-Shirt - Black").is_none());
    assert!(parse_description("just words").is_none());
    assert!(parse_description("").is_none());
  }

  #[test]
  fn product_type_may_itself_contain_a_dash() {
    let (product, color, size) = parse_description("Tee - V2 Edition - Black - S").unwrap();
    assert_eq!(product, "Tee - V2 Edition");
    assert_eq!(color, "Black");
    assert_eq!(size, "S");
  }

  #[test]
  fn discount_splits_evenly_across_two_single_quantity_items() {
    // $59.98 nominal discounted to $54.98 paid -> $27.49 per order.
    assert_eq!(split_total_cents(5498, &[1, 1]), vec![2749, 2749]);
  }

  #[test]
  fn split_is_weighted_by_quantity() {
    assert_eq!(split_total_cents(9000, &[1, 2]), vec![3000, 6000]);
  }

  #[test]
  fn remainder_cents_go_to_the_earliest_units_and_sum_is_exact() {
    let shares = split_total_cents(1000, &[1, 1, 1]);
    assert_eq!(shares.iter().sum::<i64>(), 1000);
    assert_eq!(shares, vec![334, 333, 333]);
  }

  #[test]
  fn zero_units_yields_zero_shares() {
    assert_eq!(split_total_cents(5000, &[]), Vec::<i64>::new());
  }
}
