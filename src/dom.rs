use scraper::{ElementRef, Selector};

/// Parse a selector known at compile time. Invalid CSS here is a programming
/// error, so this panics instead of threading a lifetime-bound parse error
/// through every caller.
pub fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid selector: {css}"))
}

/// Collapsed, trimmed text content of an element.
pub fn text_of(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Try an ordered list of selectors against `scope`, returning the first
/// element any of them yields. The page layout is not guaranteed uniform, so
/// extraction points are expressed as fallback chains rather than a single
/// selector.
pub fn select_first<'a>(scope: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|css| scope.select(&sel(css)).next())
}

/// Like [`select_first`], but returns every element the first productive
/// selector yields.
pub fn select_all<'a>(scope: &ElementRef<'a>, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for css in selectors {
        let found: Vec<ElementRef<'a>> = scope.select(&sel(css)).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}
