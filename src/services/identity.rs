// src/services/identity.rs
//
// Product identity: which style keys a product may carry, how its title is derived,
// and whether another product already occupies the same identity tuple.

use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::{
    error::AppError,
    models::product::{ProductGender, ProductType, Style, StyleKey},
};

/// Style keys that contribute to the derived title, in order.
pub const TITLE_KEYS: [StyleKey; 2] = [StyleKey::Fit, StyleKey::Pattern];

/// The tuple that must be unique across all products.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub product_type: ProductType,
    pub category_id: &'a str,
    pub gender: ProductGender,
    pub style: &'a Style,
}

fn allowed_key(product_type: ProductType, raw: &str) -> Option<StyleKey> {
    product_type
        .style_keys()
        .iter()
        .copied()
        .find(|key| key.as_str() == raw)
}

/// Keeps only the keys allowed for `product_type` whose values are non-empty strings.
pub fn sanitize_style(product_type: ProductType, raw: &Map<String, Value>) -> Style {
    raw.iter()
        .filter_map(|(name, value)| {
            let key = allowed_key(product_type, name)?;
            let value = value.as_str()?.trim();
            (!value.is_empty()).then(|| (key, value.to_string()))
        })
        .collect()
}

/// Applies a partial style object on top of `current`.
///
/// Allowed keys with a non-empty string overwrite; allowed keys with `null` or an empty
/// string clear the attribute. Returns the merged style and whether any allowed key was present.
pub fn merge_style(
    product_type: ProductType,
    current: &Style,
    patch: &Map<String, Value>,
) -> (Style, bool) {
    let mut merged = current.clone();
    let mut touched = false;

    for (name, value) in patch {
        let Some(key) = allowed_key(product_type, name) else {
            continue;
        };

        match value {
            Value::String(s) if !s.trim().is_empty() => {
                merged.insert(key, s.trim().to_string());
                touched = true;
            }
            Value::String(_) | Value::Null => {
                merged.remove(&key);
                touched = true;
            }
            _ => {}
        }
    }

    (merged, touched)
}

/// `"SLIM STRIPED SHIRTS"` from fit, pattern and category; `"TOP - SHIRTS"` when neither
/// fit nor pattern is set.
pub fn derive_title(product_type: ProductType, style: &Style, category_name: &str) -> String {
    let parts: Vec<&str> = TITLE_KEYS
        .iter()
        .filter_map(|key| style.get(key))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    let category = category_name.trim();

    if parts.is_empty() {
        format!("{} - {}", product_type.short_label(), category).to_uppercase()
    } else {
        format!("{} {}", parts.join(" "), category).to_uppercase()
    }
}

/// Looks for another product with the same type, category, gender and populated style
/// values (case-insensitive). Active and inactive products are both considered.
pub async fn find_duplicate<'e, E>(
    executor: E,
    candidate: &Candidate<'_>,
    exclude_id: Option<&str>,
) -> Result<Option<String>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM products WHERE product_type = ");
    qb.push_bind(candidate.product_type);
    qb.push(" AND category_id = ");
    qb.push_bind(candidate.category_id.to_string());
    qb.push(" AND gender = ");
    qb.push_bind(candidate.gender);

    for key in candidate.product_type.style_keys() {
        if let Some(value) = candidate.style.get(key).filter(|v| !v.is_empty()) {
            qb.push(format!(
                " AND lower(json_extract(style, '$.{}')) = lower(",
                key.as_str()
            ));
            qb.push_bind(value.clone());
            qb.push(")");
        }
    }

    if let Some(exclude) = exclude_id {
        qb.push(" AND id <> ");
        qb.push_bind(exclude.to_string());
    }

    qb.push(" LIMIT 1");

    let existing = qb
        .build_query_scalar::<String>()
        .fetch_optional(executor)
        .await?;
    Ok(existing)
}
