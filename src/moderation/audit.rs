use std::path::Path;
use chrono::Utc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Collapses a value onto a single line so the log stays one record per
/// line.
pub fn sanitize_one_line(text: &str) -> String {
    text.replace('\n', " ").replace('\r', " ").trim().to_string()
}

/// One processed request in the decline log.
#[derive(Debug)]
pub struct AuditRecord<'a> {
    pub outcome: &'a str,
    pub request_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: &'a str,
    pub first_name: &'a str,
    pub message: &'a str,
}

impl AuditRecord<'_> {
    /// Tab-separated, timestamped at formatting time.
    pub fn format_line(&self) -> String {
        format!(
            "{}\t{}\trequest_id={}\tchat_id={}\tuser_id={}\tusername={}\tfirst_name={}\tmessage={}",
            Utc::now().to_rfc3339(),
            self.outcome,
            self.request_id,
            self.chat_id,
            self.user_id,
            sanitize_one_line(self.username),
            sanitize_one_line(self.first_name),
            sanitize_one_line(self.message),
        )
    }
}

/// Append-only decline log. Opened once per cleanup pass and flushed after
/// every line: durability over throughput, batches are small.
pub struct AuditLog {
    file: File,
}

impl AuditLog {
    /// Opens the log in append mode, creating missing parent directories.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(AuditLog { file })
    }

    pub async fn append_line(&mut self, line: &str) -> std::io::Result<()> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_line_breaks_and_trims() {
        assert_eq!(sanitize_one_line("one\ntwo"), "one two");
        assert_eq!(sanitize_one_line("one\r\ntwo"), "one  two");
        assert_eq!(sanitize_one_line("  padded \n"), "padded");
        assert_eq!(sanitize_one_line(""), "");
    }

    #[test]
    fn record_line_has_fixed_field_layout() {
        let record = AuditRecord {
            outcome: "declined",
            request_id: 17,
            chat_id: -100123,
            user_id: 7_100_000_000,
            username: "spam\nbot",
            first_name: "Eve",
            message: "",
        };
        let line = record.format_line();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 8);
        assert!(!fields[0].is_empty());
        assert_eq!(fields[1], "declined");
        assert_eq!(fields[2], "request_id=17");
        assert_eq!(fields[3], "chat_id=-100123");
        assert_eq!(fields[4], "user_id=7100000000");
        assert_eq!(fields[5], "username=spam bot");
        assert_eq!(fields[6], "first_name=Eve");
        assert_eq!(fields[7], "message=");
        assert!(!line.contains('\n'));
    }
}
