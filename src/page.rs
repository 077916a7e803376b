use crate::models::{FormView, Outcome, WORD_LIMIT_MAX, WORD_LIMIT_MIN};

/// Renders the full upload page. `notice` is shown above the form, for
/// validation messages that never reached the network.
pub fn render(view: &FormView, notice: Option<&str>) -> String {
    let mut html = String::with_capacity(2048);

    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Image Alt-Text Generator</title>\n",
    );
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n<div class=\"container\">\n<h1>Image Alt-Text Generator</h1>\n");

    if let Some(notice) = notice {
        html.push_str(&format!(
            "<p class=\"notice\" role=\"alert\">{}</p>\n",
            escape_html(notice)
        ));
    }

    let (disabled, label) = if view.loading {
        (" disabled", "Generating...")
    } else {
        ("", "Generate Alt Text")
    };

    html.push_str(&format!(
        "<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\"image/*\" required>\n\
         <label for=\"word_limit\">Word Limit: </label>\n\
         <input type=\"number\" id=\"word_limit\" name=\"word_limit\" value=\"{}\" min=\"{}\" max=\"{}\">\n\
         <button type=\"submit\"{}>{}</button>\n\
         </form>\n",
        view.word_limit_display, WORD_LIMIT_MIN, WORD_LIMIT_MAX, disabled, label
    ));

    if let Some(file_name) = &view.file_name {
        html.push_str(&format!(
            "<p class=\"selected\">Selected: {}</p>\n",
            escape_html(file_name)
        ));
    }

    if !view.alt_text.is_empty() {
        html.push_str(&format!(
            "<div class=\"alt-text-card\">\n<h3>Generated Alt Text:</h3>\n<p>{}</p>\n</div>\n",
            escape_html(&view.alt_text)
        ));
    }

    if view.last_outcome == Some(Outcome::Failure) && view.file_name.is_some() && !view.loading {
        html.push_str(
            "<form method=\"post\" action=\"/retry\">\n\
             <button type=\"submit\">Try Again</button>\n\
             </form>\n",
        );
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "<style>\n\
body { font-family: sans-serif; background: #f4f6f8; }\n\
.container { max-width: 560px; margin: 40px auto; padding: 24px; background: #fff; border-radius: 8px; }\n\
form { display: flex; flex-direction: column; gap: 12px; }\n\
.notice { color: #b00020; }\n\
.alt-text-card { margin-top: 20px; padding: 16px; border: 1px solid #dde; border-radius: 6px; }\n\
</style>\n";
