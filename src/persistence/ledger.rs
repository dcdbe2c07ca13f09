use crate::error::MonitorError;
use crate::models::{TradeAction, TradeRecord};
use crate::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Append-only record of trade decisions
///
/// The ledger is the source of truth for the current position: on startup
/// the last record is replayed to rebuild the signal engine state.
pub trait TradeLedger {
    /// Durably persist one record
    ///
    /// When this returns `Ok`, the record survives a process crash.
    fn append(&mut self, record: TradeRecord) -> Result<()>;

    /// Most recent record, if any
    fn load_last(&self) -> Option<TradeRecord>;

    /// Full history, oldest first
    fn all(&self) -> &[TradeRecord];
}

/// CSV-file backed ledger
///
/// One row per trade with columns `timestamp,action,price,shares,balance`.
/// Every append is flushed and fsync'd before returning.
#[derive(Debug)]
pub struct CsvTradeLedger {
    path: PathBuf,
    records: Vec<TradeRecord>,
    quarantined: Option<PathBuf>,
}

impl CsvTradeLedger {
    /// Open the ledger at `path`, loading any existing history
    ///
    /// A file that exists but cannot be parsed is moved aside to
    /// `<path>.corrupt-<timestamp>` and the ledger starts empty. This resets
    /// position tracking, so it is logged at error level and reported
    /// through [`CsvTradeLedger::quarantined`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        match Self::load(&path) {
            Ok(records) => {
                tracing::info!(
                    "Loaded {} previous trades from {}",
                    records.len(),
                    path.display()
                );
                Ok(Self {
                    path,
                    records,
                    quarantined: None,
                })
            }
            Err(err @ MonitorError::LedgerCorrupt { .. }) => {
                let quarantine = quarantine_path(&path);
                fs::rename(&path, &quarantine)?;

                tracing::error!(
                    error = %err,
                    moved_to = %quarantine.display(),
                    "Trade ledger could not be parsed; starting with EMPTY history. \
                     Position tracking has been reset to the initial balance."
                );

                Ok(Self {
                    path,
                    records: Vec::new(),
                    quarantined: Some(quarantine),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Read every record from a ledger file
    ///
    /// A missing file is an empty history. Unparseable content, or a row
    /// describing a position that cannot exist, is reported as
    /// [`MonitorError::LedgerCorrupt`].
    pub fn load(path: &Path) -> Result<Vec<TradeRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path).map_err(|e| read_error(path, e, None))?;
        let mut records = Vec::new();

        for (i, row) in reader.deserialize::<TradeRecord>().enumerate() {
            let record = row.map_err(|e| read_error(path, e, Some(i + 1)))?;
            check_record(&record).map_err(|reason| MonitorError::LedgerCorrupt {
                path: path.to_path_buf(),
                reason: format!("row {}: {}", i + 1, reason),
            })?;
            records.push(record);
        }

        Ok(records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt ledger was moved to when this ledger was opened
    pub fn quarantined(&self) -> Option<&Path> {
        self.quarantined.as_deref()
    }

    fn write_record(&self, record: &TradeRecord) -> std::result::Result<(), String> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| e.to_string())?;
        let needs_header = file.metadata().map_err(|e| e.to_string())?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record).map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())?;

        let file = writer.into_inner().map_err(|e| e.to_string())?;
        file.sync_all().map_err(|e| e.to_string())
    }
}

impl TradeLedger for CsvTradeLedger {
    fn append(&mut self, record: TradeRecord) -> Result<()> {
        let len_before = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        if let Err(reason) = self.write_record(&record) {
            // Drop any partial row so the file stays loadable
            if let Ok(file) = OpenOptions::new().write(true).open(&self.path) {
                let _ = file.set_len(len_before);
            }
            return Err(MonitorError::LedgerWrite {
                path: self.path.clone(),
                reason,
            });
        }

        tracing::debug!(action = %record.action, price = record.price, "Appended trade to ledger");
        self.records.push(record);
        Ok(())
    }

    fn load_last(&self) -> Option<TradeRecord> {
        self.records.last().cloned()
    }

    fn all(&self) -> &[TradeRecord] {
        &self.records
    }
}

/// In-memory ledger with no durability
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    records: Vec<TradeRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TradeRecord>) -> Self {
        Self { records }
    }
}

impl TradeLedger for MemoryLedger {
    fn append(&mut self, record: TradeRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn load_last(&self) -> Option<TradeRecord> {
        self.records.last().cloned()
    }

    fn all(&self) -> &[TradeRecord] {
        &self.records
    }
}

// I/O failures are not corruption: the file may be fine, we just could not read it
fn read_error(path: &Path, err: csv::Error, row: Option<usize>) -> MonitorError {
    if err.is_io_error() {
        return MonitorError::Csv(err);
    }
    let reason = match row {
        Some(row) => format!("row {}: {}", row, err),
        None => err.to_string(),
    };
    MonitorError::LedgerCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}

// A BUY leaves shares and no cash, a SELL leaves cash and no shares
fn check_record(record: &TradeRecord) -> std::result::Result<(), String> {
    let positive = |v: f64| v.is_finite() && v > 0.0;

    if !positive(record.price) {
        return Err(format!("invalid price {}", record.price));
    }
    let valid = match record.action {
        TradeAction::Buy => positive(record.shares) && record.balance == 0.0,
        TradeAction::Sell => record.shares == 0.0 && positive(record.balance),
    };
    if valid {
        Ok(())
    } else {
        Err(format!(
            "{} with shares {} and balance {} is not a valid position",
            record.action, record.shares, record.balance
        ))
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}
