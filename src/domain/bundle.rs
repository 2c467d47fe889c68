//! Standalone HTML document assembly for the bundle export.

pub const BUNDLE_TITLE: &str = "Email Template";

/// Wrap markup and stylesheet into a self-contained HTML document.
///
/// Both inputs are embedded verbatim; the result is trimmed.
pub fn standalone_document(markup: &str, stylesheet: &str) -> String {
    let document = format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <style>{stylesheet}</style>
  <title>{BUNDLE_TITLE}</title>
</head>
<body>
  {markup}
</body>
</html>
"#
    );
    document.trim().to_string()
}
