//! JSON line records written to stdout.

use std::io::Write;

use serde::Serialize;

use crate::errors::AppError;

/// Outcome of a credential check.
#[derive(Debug, Serialize)]
pub(crate) struct VerificationLine<'a> {
    pub(crate) service: &'a str,
    pub(crate) accepted: bool,
    pub(crate) message: &'a str,
}

/// One remote gallery.
#[derive(Debug, Serialize)]
pub(crate) struct GalleryLine<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
}

/// Final state of one uploaded file.
#[derive(Debug, Serialize)]
pub(crate) struct FileLine<'a> {
    pub(crate) file: &'a str,
    pub(crate) status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) thumb: Option<&'a str>,
}

/// Serialises `record` as a single line.
pub(crate) fn write_line<W, T>(out: &mut W, record: &T) -> Result<(), AppError>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_lines_omit_missing_urls() {
        let mut out = Vec::new();
        write_line(
            &mut out,
            &FileLine {
                file: "/a.jpg",
                status: "Failed",
                url: None,
                thumb: None,
            },
        )
        .expect("line written");
        assert_eq!(
            String::from_utf8(out).expect("utf-8"),
            "{\"file\":\"/a.jpg\",\"status\":\"Failed\"}\n"
        );
    }
}
