//! Analytic disk cost model.
//!
//! Disk work is accounted as postings transferred plus seeks performed, kept
//! separately for reads and writes. [`DiskModel::cost_in_minutes`] is the one
//! conversion to wall-clock time used by every policy and by the report, so
//! costs stay comparable across directions and across policies.

use std::fmt;
use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Marker for read traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Read;

/// Marker for write traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Write;

/// Direction of an [`IoCost`].
pub trait Direction: Copy + Default + fmt::Debug {
    /// Short label used in `Display`.
    const LABEL: &'static str;
}

impl Direction for Read {
    const LABEL: &'static str = "r";
}

impl Direction for Write {
    const LABEL: &'static str = "w";
}

/// Postings moved and seeks performed in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCost<D: Direction> {
    /// Postings transferred.
    pub postings: u64,

    /// Seeks performed.
    pub seeks: u64,

    _direction: PhantomData<D>,
}

/// Read-side disk work.
pub type ReadIo = IoCost<Read>;

/// Write-side disk work.
pub type WriteIo = IoCost<Write>;

impl<D: Direction> IoCost<D> {
    /// Create a new cost.
    pub fn new(postings: u64, seeks: u64) -> Self {
        IoCost {
            postings,
            seeks,
            _direction: PhantomData,
        }
    }

    /// Cost of no work at all.
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Whether this cost accounts for no work.
    pub fn is_zero(&self) -> bool {
        self.postings == 0 && self.seeks == 0
    }
}

impl<D: Direction> AddAssign for IoCost<D> {
    fn add_assign(&mut self, rhs: Self) {
        self.postings += rhs.postings;
        self.seeks += rhs.seeks;
    }
}

impl<D: Direction> Add for IoCost<D> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<D: Direction> Sum for IoCost<D> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<D: Direction> fmt::Display for IoCost<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{l}-posts: {} {l}-seeks: {}",
            self.postings,
            self.seeks,
            l = D::LABEL
        )
    }
}

/// Disk constants needed to turn [`IoCost`] into minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskModel {
    /// Sequential throughput in MB/s.
    pub throughput_mbs: f64,

    /// Average seek latency in milliseconds.
    pub seek_ms: f64,

    /// Fixed size of one posting in bytes.
    pub posting_bytes: u64,
}

impl DiskModel {
    /// Create a new disk model.
    pub fn new(throughput_mbs: f64, seek_ms: f64, posting_bytes: u64) -> Self {
        DiskModel {
            throughput_mbs,
            seek_ms,
            posting_bytes,
        }
    }

    /// Minutes spent transferring `postings` sequentially.
    pub fn transfer_minutes(&self, postings: u64) -> f64 {
        let bytes = postings as f64 * self.posting_bytes as f64;
        bytes / (self.throughput_mbs * 1e6) / 60.0
    }

    /// Minutes spent on `seeks` random accesses.
    pub fn seek_minutes(&self, seeks: u64) -> f64 {
        seeks as f64 * self.seek_ms / 60_000.0
    }

    /// Convert disk work to minutes.
    pub fn cost_in_minutes<D: Direction>(&self, io: IoCost<D>) -> f64 {
        self.transfer_minutes(io.postings) + self.seek_minutes(io.seeks)
    }
}

/// Read and write work incurred while consolidating segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsolidationStats {
    /// Segments read back from disk.
    pub read: ReadIo,

    /// Merged (or flushed) segments written.
    pub write: WriteIo,
}

impl ConsolidationStats {
    /// Flush of a resident segment without merging anything.
    pub fn write_back(postings: u64) -> Self {
        ConsolidationStats {
            read: ReadIo::zero(),
            write: WriteIo::new(postings, 1),
        }
    }

    /// Merge of a resident segment of `resident` postings with on-disk
    /// segments `on_disk`: one seek plus a sequential read per on-disk
    /// segment, then one sequential write of the combined size.
    pub fn merge(resident: u64, on_disk: &[u64]) -> Self {
        let read_postings: u64 = on_disk.iter().sum();
        ConsolidationStats {
            read: ReadIo::new(read_postings, on_disk.len() as u64),
            write: WriteIo::new(resident + read_postings, 1),
        }
    }

    /// Minutes spent on this consolidation.
    pub fn minutes(&self, disk: &DiskModel) -> f64 {
        disk.cost_in_minutes(self.read) + disk.cost_in_minutes(self.write)
    }
}

impl AddAssign for ConsolidationStats {
    fn add_assign(&mut self, rhs: Self) {
        self.read += rhs.read;
        self.write += rhs.write;
    }
}

impl Add for ConsolidationStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl fmt::Display for ConsolidationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdd() -> DiskModel {
        DiskModel::new(150.0, 7.0, 4)
    }

    #[test]
    fn test_cost_in_minutes() {
        let disk = hdd();

        // 150 MB at 150 MB/s is one second.
        let io = ReadIo::new(37_500_000, 0);
        assert!((disk.cost_in_minutes(io) - 1.0 / 60.0).abs() < 1e-12);

        // 60_000 ms of seeking is one minute.
        let io = WriteIo::new(0, 60_000 / 7);
        let expected = (60_000 / 7) as f64 * 7.0 / 60_000.0;
        assert!((disk.cost_in_minutes(io) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_seek_only_cost_is_positive() {
        let disk = hdd();
        assert!(disk.cost_in_minutes(ReadIo::new(0, 1)) > 0.0);
        assert_eq!(disk.cost_in_minutes(ReadIo::zero()), 0.0);
    }

    #[test]
    fn test_accumulation() {
        let mut total = ReadIo::new(10, 1);
        total += ReadIo::new(5, 2);
        assert_eq!(total, ReadIo::new(15, 3));

        let summed: WriteIo = (1..=4).map(|i| WriteIo::new(i, 1)).sum();
        assert_eq!(summed, WriteIo::new(10, 4));
        assert_eq!(summed.to_string(), "w-posts: 10 w-seeks: 4");
    }

    #[test]
    fn test_consolidation_merge() {
        let stats = ConsolidationStats::merge(100, &[400, 200]);
        assert_eq!(stats.read, ReadIo::new(600, 2));
        assert_eq!(stats.write, WriteIo::new(700, 1));

        let flush = ConsolidationStats::merge(100, &[]);
        assert_eq!(flush, ConsolidationStats::write_back(100));
        assert!(flush.read.is_zero());
    }

    #[test]
    fn test_consolidation_minutes() {
        let disk = hdd();
        let mut total = ConsolidationStats::write_back(1_000);
        total += ConsolidationStats::merge(10, &[20]);

        let expected = disk.cost_in_minutes(ReadIo::new(20, 1))
            + disk.cost_in_minutes(WriteIo::new(1_030, 2));
        assert!((total.minutes(&disk) - expected).abs() < 1e-12);
    }
}
