//! Memory management unit.
//!
//! Models one flat memory map shared by every process: a base may be
//! allocated once system-wide, and segments are never freed during a run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op::SegmentAddress;
use crate::process::Pid;

/// Reasons an allocate or access request is refused. The engine treats
/// every variant as a segmentation fault.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fault {
    #[error("request exceeds available memory")]
    OutOfMemory,

    #[error("base already allocated")]
    DuplicateBase,

    #[error("access outside any allocated segment")]
    InvalidAccess,
}

/// One allocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySegment {
    pub owner_pid: Pid,
    pub segment_number: u32,
    /// Base, in KB.
    pub base: u32,
    /// Offset within the segment.
    pub offset: u32,
}

impl MemorySegment {
    pub fn new(owner_pid: Pid, address: SegmentAddress) -> Self {
        Self {
            owner_pid,
            segment_number: address.segment,
            base: address.base,
            offset: address.offset,
        }
    }

    pub fn address(&self) -> SegmentAddress {
        SegmentAddress {
            segment: self.segment_number,
            base: self.base,
            offset: self.offset,
        }
    }
}

/// Tracks allocated segments and validates requests against them.
#[derive(Debug, Default)]
pub struct MemoryManager {
    /// Limit compared against `base * 1024 + offset`.
    available: u64,
    segments: Vec<MemorySegment>,
}

impl MemoryManager {
    pub fn new(memory_available_kb: u32) -> Self {
        Self {
            available: u64::from(memory_available_kb),
            segments: Vec::new(),
        }
    }

    /// Record a new segment.
    pub fn allocate(&mut self, request: MemorySegment) -> Result<(), Fault> {
        if request.address().extent() > self.available {
            return Err(Fault::OutOfMemory);
        }
        if self.segments.iter().any(|s| s.base == request.base) {
            return Err(Fault::DuplicateBase);
        }
        self.segments.push(request);
        Ok(())
    }

    /// Check that a request falls within a previously allocated segment.
    pub fn access(&self, request: MemorySegment) -> Result<(), Fault> {
        let permitted = self.segments.iter().any(|s| {
            s.segment_number == request.segment_number
                && s.base == request.base
                && s.offset >= request.offset
        });
        if permitted {
            Ok(())
        } else {
            Err(Fault::InvalidAccess)
        }
    }

    pub fn segments(&self) -> &[MemorySegment] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(segment: u32, base: u32, offset: u32) -> MemorySegment {
        MemorySegment {
            owner_pid: 0,
            segment_number: segment,
            base,
            offset,
        }
    }

    #[test]
    fn test_duplicate_base() {
        let mut mmu = MemoryManager::new(102_400);
        assert_eq!(mmu.allocate(seg(1, 1, 100)), Ok(()));
        assert_eq!(mmu.allocate(seg(2, 1, 10)), Err(Fault::DuplicateBase));
        assert_eq!(mmu.allocate(seg(1, 1, 100)), Err(Fault::DuplicateBase));
        assert_eq!(mmu.segments().len(), 1);
    }

    #[test]
    fn test_duplicate_base_across_processes() {
        let mut mmu = MemoryManager::new(102_400);
        mmu.allocate(seg(1, 5, 0)).unwrap();
        let other = MemorySegment {
            owner_pid: 3,
            ..seg(9, 5, 0)
        };
        assert_eq!(mmu.allocate(other), Err(Fault::DuplicateBase));
    }

    #[test]
    fn test_out_of_memory() {
        let mut mmu = MemoryManager::new(2048);
        assert_eq!(mmu.allocate(seg(1, 1, 999)), Ok(()));
        assert_eq!(mmu.allocate(seg(1, 2, 0)), Ok(()));
        assert_eq!(mmu.allocate(seg(1, 2, 1)), Err(Fault::OutOfMemory));
        assert_eq!(mmu.allocate(seg(1, 3, 0)), Err(Fault::OutOfMemory));
    }

    #[test]
    fn test_access_within_allocation() {
        let mut mmu = MemoryManager::new(102_400);
        mmu.allocate(seg(2, 34, 56)).unwrap();
        assert_eq!(mmu.access(seg(2, 34, 56)), Ok(()));
        assert_eq!(mmu.access(seg(2, 34, 0)), Ok(()));
        assert_eq!(mmu.access(seg(2, 34, 57)), Err(Fault::InvalidAccess));
        assert_eq!(mmu.access(seg(3, 34, 10)), Err(Fault::InvalidAccess));
    }

    #[test]
    fn test_access_never_allocated() {
        let mmu = MemoryManager::new(102_400);
        assert_eq!(mmu.access(seg(0, 0, 0)), Err(Fault::InvalidAccess));
    }
}
