//! Writing generated artifacts to disk.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::SpecError;
use crate::markdown::escape_html;

const STYLESHEET: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem;line-height:1.6;color:#1f2937}\
h2{font-size:1.25rem;margin:1.5rem 0 .5rem}\
h3{font-size:1.1rem;margin:1rem 0 .25rem}\
ul{padding-left:1.5rem}\
code{background:#e5e7eb;border-radius:.25rem;padding:.1rem .25rem;font-size:.9em}";

/// Write `contents` to `path` via a temp file and rename, creating parent
/// directories first.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), SpecError> {
    let fail = |e: std::io::Error| SpecError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(contents.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp_path, path)
    })()
    .map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        fail(e)
    })?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

/// Wrap a rendered fragment in a standalone HTML page.
pub fn html_document(title: &str, fragment: &str) -> String {
    html_document_at(title, fragment, Utc::now())
}

fn html_document_at(title: &str, fragment: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"generated-at\" content=\"{}\">\n\
         <title>{}</title>\n\
         <style>{STYLESHEET}</style>\n\
         </head>\n\
         <body>\n\
         <article>\n{fragment}\n</article>\n\
         </body>\n\
         </html>\n",
        generated_at.to_rfc3339(),
        escape_html(title),
    )
}
