//! Starter project loaded into a fresh editor.

pub const STARTER_PAGE_NAME: &str = "Email Template";

pub const STARTER_MARKUP: &str = r#"<table class="email-body" style="width: 100%; padding: 20px;">
  <tr>
    <td><h1>Hello from mailwright</h1></td>
  </tr>
  <tr>
    <td><img src="https://via.placeholder.com/300x100.png?text=mailwright" /></td>
  </tr>
</table>"#;

pub const STARTER_STYLESHEET: &str = "";
