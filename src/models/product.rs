// src/models/product.rs

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, types::Json};
use url::Url;
use validator::{Validate, ValidationError};

use crate::models::category::CategorySummary;

/// Discriminator selecting the concrete product shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ProductType {
    #[serde(rename = "top-wear")]
    #[sqlx(rename = "top-wear")]
    TopWear,
    #[serde(rename = "bottom-wear")]
    #[sqlx(rename = "bottom-wear")]
    BottomWear,
}

impl ProductType {
    /// Style attributes a product of this type may carry.
    pub fn style_keys(self) -> &'static [StyleKey] {
        match self {
            ProductType::TopWear => &[
                StyleKey::Fit,
                StyleKey::Material,
                StyleKey::Sleeve,
                StyleKey::Neckline,
                StyleKey::Closure,
                StyleKey::Pattern,
            ],
            ProductType::BottomWear => &[
                StyleKey::Fit,
                StyleKey::Material,
                StyleKey::Length,
                StyleKey::Rise,
                StyleKey::Closure,
                StyleKey::Pattern,
            ],
        }
    }

    /// Upper-case type name without the "-wear" suffix, used in fallback titles.
    pub fn short_label(self) -> &'static str {
        match self {
            ProductType::TopWear => "TOP",
            ProductType::BottomWear => "BOTTOM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProductGender {
    Men,
    Women,
    Unisex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKey {
    Fit,
    Material,
    Sleeve,
    Neckline,
    Length,
    Rise,
    Closure,
    Pattern,
}

impl StyleKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleKey::Fit => "fit",
            StyleKey::Material => "material",
            StyleKey::Sleeve => "sleeve",
            StyleKey::Neckline => "neckline",
            StyleKey::Length => "length",
            StyleKey::Rise => "rise",
            StyleKey::Closure => "closure",
            StyleKey::Pattern => "pattern",
        }
    }
}

/// Style sub-document. Only keys allowed by the product's type are ever stored.
pub type Style = BTreeMap<StyleKey, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageKind {
    FullView,
    CloseView,
    NormalView,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Image {
    #[serde(rename = "type")]
    pub kind: ImageKind,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub url: String,
}

/// A size is either a label ("M", "XL") or a number (32).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeLabel {
    Number(u64),
    Text(String),
}

impl SizeLabel {
    /// Case-insensitive comparison against a label taken from a URL segment.
    pub fn matches(&self, other: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(other.trim())
    }

    pub fn normalized(self) -> Self {
        match self {
            SizeLabel::Text(text) => SizeLabel::Text(text.trim().to_uppercase()),
            number => number,
        }
    }
}

impl fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeLabel::Number(n) => write!(f, "{}", n),
            SizeLabel::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Size {
    #[validate(custom(function = validate_size_label))]
    pub size: SizeLabel,
    pub stock: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Stored trimmed and lower-cased; unique within a product.
    pub color: String,
    pub sizes: Vec<Size>,
}

/// DTO for a variant in create-product and add-variant bodies.
/// Missing fields default to empty so they are reported as field errors.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VariantInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 30, message = "Variant color is required."))]
    pub color: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one size is required."), nested)]
    pub sizes: Vec<Size>,
}

impl VariantInput {
    pub fn into_variant(self) -> Variant {
        Variant {
            color: normalize_color(&self.color),
            sizes: self
                .sizes
                .into_iter()
                .map(|s| Size {
                    size: s.size.normalized(),
                    stock: s.stock,
                })
                .collect(),
        }
    }
}

/// DTO for adding a size to an existing variant.
#[derive(Debug, Deserialize, Validate)]
pub struct AddSizeRequest {
    #[validate(custom(function = validate_size_label))]
    pub size: SizeLabel,
    pub stock: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub stock: u32,
}

pub fn normalize_color(color: &str) -> String {
    color.trim().to_lowercase()
}

/// Row shape of `products` joined with its category.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: String,
    pub product_type: ProductType,
    pub title: String,
    pub price: f64,
    pub discount: f64,
    pub description: String,
    pub gender: ProductGender,
    pub category_id: String,
    pub is_active: bool,
    pub images: Json<Vec<Image>>,
    pub style: Json<Style>,
    pub variants: Json<Vec<Variant>>,
    pub rating_average: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_name: String,
    pub category_slug: String,
}

/// SELECT list matching [`ProductRow`]; append `WHERE ...` to it.
pub const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.product_type, p.title, p.price, p.discount, p.description, p.gender,
        p.category_id, p.is_active, p.images, p.style, p.variants,
        p.rating_average, p.rating_count, p.created_at, p.updated_at,
        c.name AS category_name, c.slug AS category_slug
    FROM products p
    JOIN categories c ON c.id = p.category_id
"#;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ratings {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub product_type: ProductType,
    pub title: String,
    pub price: f64,
    pub discount: f64,
    pub selling_price: f64,
    pub description: String,
    pub gender: ProductGender,
    pub category: CategorySummary,
    pub is_active: bool,
    pub images: Vec<Image>,
    pub style: Style,
    pub variants: Vec<Variant>,
    pub ratings: Ratings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        Self {
            selling_price: selling_price(row.price, row.discount),
            id: row.id,
            product_type: row.product_type,
            title: row.title,
            price: row.price,
            discount: row.discount,
            description: row.description,
            gender: row.gender,
            category: CategorySummary {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
            is_active: row.is_active,
            images: row.images.0,
            style: row.style.0,
            variants: row.variants.0,
            ratings: Ratings {
                average: row.rating_average,
                count: row.rating_count,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Price after discount, rounded to a whole amount.
pub fn selling_price(price: f64, discount: f64) -> f64 {
    if discount > 0.0 {
        (price - price * discount / 100.0).round()
    } else {
        price
    }
}

/// DTO for creating a product. `style` is a raw object; keys outside the
/// product type's allowed list are dropped before anything is stored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub product_type: ProductType,

    pub category: String,

    pub gender: ProductGender,

    #[serde(default)]
    pub style: Map<String, Value>,

    #[validate(range(min = 0.0, message = "Price must be a positive number."))]
    pub price: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "Discount must be between 0 and 100."))]
    pub discount: Option<f64>,

    #[validate(length(min = 1, max = 2000, message = "Description is required."))]
    pub description: String,

    pub is_active: Option<bool>,

    #[serde(default)]
    #[validate(nested)]
    pub images: Vec<Image>,

    #[validate(length(min = 1, message = "At least one product variant is required."), nested)]
    pub variants: Vec<VariantInput>,
}

/// DTO for updating a product. Every field is optional; `productType` is accepted
/// but ignored because a product's shape never changes.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(range(min = 0.0, message = "Price must be a positive number."))]
    pub price: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Discount must be between 0 and 100."))]
    pub discount: Option<f64>,

    #[validate(length(min = 1, max = 2000, message = "Description cannot be empty."))]
    pub description: Option<String>,

    pub gender: Option<ProductGender>,

    pub category: Option<String>,

    pub is_active: Option<bool>,

    pub images: Option<Vec<Image>>,

    pub style: Option<Map<String, Value>>,

    #[allow(dead_code)]
    pub product_type: Option<Value>,
}

/// Query parameters for listing products.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    /// Case-insensitive substring match on title or description.
    pub search: Option<String>,

    pub gender: Option<ProductGender>,

    /// Category slug.
    pub category: Option<String>,

    #[serde(rename = "price[gte]")]
    pub price_gte: Option<f64>,

    #[serde(rename = "price[lte]")]
    pub price_lte: Option<f64>,

    #[serde(rename = "discount[gte]")]
    pub discount_gte: Option<f64>,

    /// Comma-separated sort fields, `-` prefix for descending. Default `-createdAt`.
    pub sort: Option<String>,

    /// 1-based page number (default 1).
    pub page: Option<i64>,

    /// Items per page (default 10, max 100).
    pub limit: Option<i64>,
}

fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    if Url::parse(url).is_err() {
        return Err(ValidationError::new("invalid_url").with_message("Image URL is invalid.".into()));
    }
    Ok(())
}

fn validate_size_label(size: &SizeLabel) -> Result<(), ValidationError> {
    match size {
        SizeLabel::Text(text) if text.trim().is_empty() => {
            Err(ValidationError::new("size_required").with_message("Size is required.".into()))
        }
        _ => Ok(()),
    }
}
