//! Result record rendering
//!
//! Records are rendered one per line as they are produced.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::models::DownloadRecord;

/// How result records are shown while a download runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultRenderer {
    /// Nothing is printed
    Disabled,
    /// `download(ok): <path> (<url>)`
    #[default]
    Default,
    /// One JSON object per line
    Json,
}

impl ResultRenderer {
    /// Write one record
    pub fn render(&self, record: &DownloadRecord, out: &mut dyn Write) -> io::Result<()> {
        match self {
            ResultRenderer::Disabled => Ok(()),
            ResultRenderer::Default => {
                write!(
                    out,
                    "{}({}): {} ({})",
                    record.action,
                    record.status,
                    record.path.display(),
                    record.url
                )?;
                if let Some(message) = &record.message {
                    write!(out, " [{}]", message)?;
                }
                writeln!(out)
            }
            ResultRenderer::Json => {
                serde_json::to_writer(&mut *out, record)?;
                writeln!(out)
            }
        }
    }
}

impl fmt::Display for ResultRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultRenderer::Disabled => "disabled",
            ResultRenderer::Default => "default",
            ResultRenderer::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for ResultRenderer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(ResultRenderer::Disabled),
            "default" => Ok(ResultRenderer::Default),
            "json" => Ok(ResultRenderer::Json),
            other => Err(format!(
                "unknown result renderer '{}', expected disabled, default or json",
                other
            )),
        }
    }
}
