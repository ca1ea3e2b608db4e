/// Shown wherever an article has no usable image.
pub const DEFAULT_ARTICLE_IMAGE: &str = "/placeholder.svg";

/// Schemes that only live as long as the page that minted them.
const TRANSIENT_SCHEMES: [&str; 2] = ["blob:", "filesystem:"];

pub fn is_valid_image_url(url: Option<&str>) -> bool {
    let Some(url) = url.map(str::trim) else {
        return false;
    };
    if url.is_empty() {
        return false;
    }
    !TRANSIENT_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

pub fn resolve_image_url<'a>(url: Option<&'a str>, fallback: &'a str) -> &'a str {
    match url {
        Some(value) if is_valid_image_url(Some(value)) => value,
        _ => fallback,
    }
}
