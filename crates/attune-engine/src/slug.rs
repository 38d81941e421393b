//! Deterministic slug generation for product and course tags.

/// Generate a URL-safe tag slug from a title.
///
/// Lowercase, strip everything outside `[a-z0-9 -]`, whitespace runs to a
/// single hyphen, collapse hyphen runs, truncate to 50 chars, trim edge
/// hyphens. The same title always yields the same slug, so the same
/// product always maps to the same tag name.
pub fn tag_slug(title: &str) -> String {
  let lower = title.to_lowercase();
  let stripped: String = lower
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
    .collect();

  let mut slug = String::with_capacity(stripped.len());
  let mut prev_hyphen = false;
  for c in stripped.chars() {
    let c = if c.is_whitespace() { '-' } else { c };
    if c == '-' {
      if !prev_hyphen {
        slug.push('-');
      }
      prev_hyphen = true;
    } else {
      slug.push(c);
      prev_hyphen = false;
    }
  }

  slug.truncate(50);
  slug.trim_matches('-').to_owned()
}

/// Slugify a course category for `category:*` tags: lowercase, whitespace
/// runs to a single hyphen. No character stripping — categories are
/// creator-entered short labels.
pub fn category_slug(category: &str) -> String {
  let lower = category.to_lowercase();
  let mut out = String::with_capacity(lower.len());
  let mut prev_space = false;
  for c in lower.chars() {
    if c.is_whitespace() {
      if !prev_space {
        out.push('-');
      }
      prev_space = true;
    } else {
      out.push(c);
      prev_space = false;
    }
  }
  out
}
