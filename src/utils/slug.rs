/// Derives the URL-safe lookup key for a category name.
///
/// Lower-cases, keeps ASCII alphanumerics, collapses every other run of characters into a
/// single `-` and trims dashes from both ends: `"Men's T-Shirts"` -> `"men-s-t-shirts"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Shirts"), "shirts");
        assert_eq!(slugify("T-Shirt"), "t-shirt");
        assert_eq!(slugify("  Men's   Casual Wear!! "), "men-s-casual-wear");
        assert_eq!(slugify("---"), "");
    }
}
