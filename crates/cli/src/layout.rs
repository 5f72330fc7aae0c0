//! Statement directory layout.
//!
//! ```text
//! <root>/
//!   books.toml                                  (optional config override)
//!   books/chart_of_accounts.csv
//!   scrapes/holdings/2025/MMW-2025-05-HLD.csv
//!   scrapes/income/2025/MMW-2025-05-INC.csv
//!   scrapes/activity/2025/MMW-2025-05-ACT.csv
//!   scrapes/summary/2025/MMW-2025-05-SUM.csv
//!   entries/dividends/2025/MMW-2025-05-DIV.csv  (one dir per entry block)
//!   entries/MMW-2025-05-ENT.csv                 (combined)
//! ```

use std::path::{Path, PathBuf};

use stmtbook_recon::{EntryBlock, InputKind, StatementPeriod};

pub const CONFIG_FILE: &str = "books.toml";

#[derive(Debug, Clone)]
pub struct StatementLayout {
    root: PathBuf,
    file_prefix: String,
}

impl StatementLayout {
    pub fn new(root: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    pub fn chart_of_accounts(&self) -> PathBuf {
        self.root.join("books").join("chart_of_accounts.csv")
    }

    /// Scrape for one record set. Prior holdings are the previous month's
    /// holdings file.
    pub fn input(&self, kind: InputKind, period: StatementPeriod) -> Option<PathBuf> {
        let (dir, code) = match kind {
            InputKind::Holdings | InputKind::PriorHoldings => ("holdings", "HLD"),
            InputKind::Income => ("income", "INC"),
            InputKind::Activity => ("activity", "ACT"),
            InputKind::Summary => ("summary", "SUM"),
            InputKind::ChartOfAccounts => return None,
        };
        let period = match kind {
            InputKind::PriorHoldings => period.prior().ok()?,
            _ => period,
        };
        Some(self.dated("scrapes", dir, period, code))
    }

    pub fn block_output(&self, block: EntryBlock, period: StatementPeriod) -> PathBuf {
        self.dated("entries", &block.to_string(), period, block.code())
    }

    pub fn combined_output(&self, period: StatementPeriod) -> PathBuf {
        self.root.join("entries").join(self.file_name(period, "ENT"))
    }

    fn dated(&self, top: &str, dir: &str, period: StatementPeriod, code: &str) -> PathBuf {
        self.root
            .join(top)
            .join(dir)
            .join(period.year().to_string())
            .join(self.file_name(period, code))
    }

    fn file_name(&self, period: StatementPeriod, code: &str) -> String {
        format!("{}-{period}-{code}.csv", self.file_prefix)
    }
}
